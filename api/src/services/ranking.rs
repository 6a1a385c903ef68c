//! Ranking Engine
//!
//! Pure leaderboard derivation:
//!
//! ```text
//! total = raw points (missing → 0) + attendance count × 10 + badge bonus
//! ```
//!
//! Rows are sorted by total, highest first. The sort is stable, so students
//! with equal totals keep the order they were passed in (creation order).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::db::{AttendanceRecord, Student};
use crate::types::ATTENDANCE_POINTS;

/// 리더보드 한 행
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedStudent {
    #[serde(flatten)]
    pub student: Student,
    pub attendance_count: u32,
    pub total_points: i64,
}

impl RankedStudent {
    pub fn raw_points(&self) -> i64 {
        self.student.points.unwrap_or(0)
    }

    pub fn attendance_bonus(&self) -> i64 {
        i64::from(self.attendance_count) * ATTENDANCE_POINTS
    }
}

/// 학생별 출석 횟수
pub fn attendance_counts(attendance: &[AttendanceRecord]) -> HashMap<&str, u32> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for record in attendance {
        *counts.entry(record.student_id.as_str()).or_insert(0) += 1;
    }
    counts
}

/// 총점 = 원점수 + 출석 × 10 + 배지 보너스
pub fn total_points(student: &Student, attendance_count: u32) -> i64 {
    student.points.unwrap_or(0)
        + i64::from(attendance_count) * ATTENDANCE_POINTS
        + student.badge.bonus()
}

/// 리더보드 생성 (총점 내림차순, 동점은 입력 순서 유지)
pub fn build_leaderboard(students: &[Student], attendance: &[AttendanceRecord]) -> Vec<RankedStudent> {
    let counts = attendance_counts(attendance);

    let mut rows: Vec<RankedStudent> = students
        .iter()
        .map(|student| {
            let attendance_count = counts.get(student.id.as_str()).copied().unwrap_or(0);
            RankedStudent {
                total_points: total_points(student, attendance_count),
                attendance_count,
                student: student.clone(),
            }
        })
        .collect();

    rows.sort_by(|a, b| b.total_points.cmp(&a.total_points));
    rows
}

/// 1부터 시작하는 순위. 리더보드에 없으면 None
pub fn rank_of(leaderboard: &[RankedStudent], student_id: &str) -> Option<usize> {
    leaderboard
        .iter()
        .position(|row| row.student.id == student_id)
        .map(|idx| idx + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Badge;
    use chrono::{NaiveDate, Utc};

    fn student(id: &str, points: Option<i64>, badge: Badge) -> Student {
        Student {
            id: id.to_string(),
            name: id.to_uppercase(),
            class_name: "1A".to_string(),
            class_no: "1".to_string(),
            level: "初級".to_string(),
            badge,
            points,
            created_at: Utc::now(),
        }
    }

    fn checkin(student_id: &str, day: u32) -> AttendanceRecord {
        AttendanceRecord {
            id: format!("{}-{}", student_id, day),
            student_id: student_id.to_string(),
            day: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            checked_at: Utc::now(),
        }
    }

    #[test]
    fn test_reference_example() {
        let students = vec![
            student("a", Some(100), Badge::Gold),
            student("b", Some(150), Badge::None),
        ];
        let attendance = vec![checkin("a", 1), checkin("a", 2)];

        let board = build_leaderboard(&students, &attendance);

        assert_eq!(board[0].student.id, "a");
        assert_eq!(board[0].attendance_count, 2);
        assert_eq!(board[0].total_points, 320);
        assert_eq!(board[1].student.id, "b");
        assert_eq!(board[1].attendance_count, 0);
        assert_eq!(board[1].total_points, 150);
    }

    #[test]
    fn test_missing_points_count_as_zero() {
        let students = vec![student("a", None, Badge::Bronze)];
        let board = build_leaderboard(&students, &[checkin("a", 1)]);
        assert_eq!(board[0].raw_points(), 0);
        assert_eq!(board[0].total_points, 10 + 50);
    }

    #[test]
    fn test_total_formula_for_every_row() {
        let students = vec![
            student("a", Some(-30), Badge::Platinum),
            student("b", Some(0), Badge::Silver),
            student("c", None, Badge::None),
            student("d", Some(999), Badge::Bronze),
        ];
        let attendance = vec![
            checkin("b", 1),
            checkin("b", 2),
            checkin("b", 3),
            checkin("c", 1),
            checkin("ghost", 1),
        ];

        let board = build_leaderboard(&students, &attendance);
        assert_eq!(board.len(), students.len());
        for row in &board {
            let expected_count = attendance
                .iter()
                .filter(|a| a.student_id == row.student.id)
                .count() as i64;
            assert_eq!(
                row.total_points,
                row.student.points.unwrap_or(0) + 10 * expected_count + row.student.badge.bonus()
            );
        }
        for pair in board.windows(2) {
            assert!(pair[0].total_points >= pair[1].total_points);
        }
    }

    #[test]
    fn test_ties_keep_input_order() {
        let students = vec![
            student("first", Some(100), Badge::None),
            student("second", Some(50), Badge::Bronze),
            student("third", Some(200), Badge::None),
        ];
        let board = build_leaderboard(&students, &[]);
        let ids: Vec<_> = board.iter().map(|r| r.student.id.as_str()).collect();
        assert_eq!(ids, vec!["third", "first", "second"]);
    }

    #[test]
    fn test_rank_of() {
        let students = vec![
            student("a", Some(10), Badge::None),
            student("b", Some(20), Badge::None),
        ];
        let board = build_leaderboard(&students, &[]);
        assert_eq!(rank_of(&board, "b"), Some(1));
        assert_eq!(rank_of(&board, "a"), Some(2));
        assert_eq!(rank_of(&board, "zzz"), None);
    }

    #[test]
    fn test_row_serializes_flat() {
        let board = build_leaderboard(&[student("a", Some(1), Badge::None)], &[]);
        let json = serde_json::to_value(&board[0]).unwrap();
        assert_eq!(json["id"], "a");
        assert_eq!(json["attendanceCount"], 0);
        assert_eq!(json["totalPoints"], 1);
    }
}
