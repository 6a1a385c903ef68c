//! In-memory club view.
//!
//! A reducer over snapshot messages. Holds the latest copy of every
//! collection and re-derives the leaderboard whenever students or
//! attendance are replaced.

use crate::db::{Announcement, AttendanceRecord, Competition, Student};
use crate::services::ranking::{build_leaderboard, RankedStudent};
use crate::services::sync::{ConfigSnapshot, SyncMessage};

#[derive(Debug, Clone, Default)]
pub struct ClubView {
    students: Vec<Student>,
    attendance: Vec<AttendanceRecord>,
    competitions: Vec<Competition>,
    announcements: Vec<Announcement>,
    leaderboard: Vec<RankedStudent>,
}

impl ClubView {
    pub fn new() -> Self {
        Self::default()
    }

    /// 스냅샷 적용. 리더보드를 다시 계산했으면 true
    pub fn apply(&mut self, message: &SyncMessage) -> bool {
        match message {
            SyncMessage::Students(students) => {
                self.students = students.clone();
            }
            SyncMessage::Attendance(attendance) => {
                self.attendance = attendance.clone();
            }
            SyncMessage::Competitions(competitions) => {
                self.competitions = competitions.clone();
                return false;
            }
            SyncMessage::Config(config) => {
                self.announcements = config.announcements.clone();
                return false;
            }
            _ => return false,
        }

        self.leaderboard = build_leaderboard(&self.students, &self.attendance);
        true
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn attendance(&self) -> &[AttendanceRecord] {
        &self.attendance
    }

    pub fn competitions(&self) -> &[Competition] {
        &self.competitions
    }

    pub fn announcements(&self) -> &[Announcement] {
        &self.announcements
    }

    pub fn leaderboard(&self) -> &[RankedStudent] {
        &self.leaderboard
    }

    /// 새 구독자에게 보낼 현재 상태 전체
    pub fn snapshot_messages(&self) -> Vec<SyncMessage> {
        vec![
            SyncMessage::Students(self.students.clone()),
            SyncMessage::Attendance(self.attendance.clone()),
            SyncMessage::Competitions(self.competitions.clone()),
            SyncMessage::Config(ConfigSnapshot {
                announcements: self.announcements.clone(),
            }),
            SyncMessage::Leaderboard(self.leaderboard.clone()),
        ]
    }
}
