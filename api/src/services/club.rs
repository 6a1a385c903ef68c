//! Club Service
//!
//! Business operations over the roster. Each write commits to the
//! database first, then re-reads the affected collection and pushes the
//! whole snapshot through the in-memory view and the sync hub.
//!
//! ```text
//! write ──▶ Database ──▶ reload collection ──▶ ClubView.apply ──▶ SyncHub.publish
//!                                                   │
//!                                                   └─▶ leaderboard re-derived
//! ```

use std::sync::Arc;

use anyhow::Result;
use chrono::{FixedOffset, NaiveDate, Utc};
use tokio::sync::{Mutex, RwLock};

use crate::config::Config;
use crate::db::{
    Announcement, AttendanceChange, AttendanceRecord, Competition, Database, NewCompetition,
    NewStudent, PointsChange, Student, StudentPatch,
};
use crate::error::ApiError;
use crate::services::auth::{hash_password, AuthState};
use crate::services::csv_import::{parse_badge_updates, parse_new_students};
use crate::services::export::{export_filename, leaderboard_csv};
use crate::services::ranking::{rank_of, RankedStudent};
use crate::services::sync::{Collection, ConfigSnapshot, SyncHub, SyncMessage};
use crate::services::view::ClubView;

/// 리더보드에서 학생 본인의 위치
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Standing {
    pub rank: usize,
    pub total: usize,
    pub row: RankedStudent,
}

pub struct ClubService {
    db: Arc<Database>,
    hub: Arc<SyncHub>,
    view: RwLock<ClubView>,
    /// 스냅샷 읽기와 적용은 이 잠금 안에서 직렬화됨
    refresh_lock: Mutex<()>,
    namespace: String,
    default_password_hash: String,
    utc_offset: FixedOffset,
}

impl ClubService {
    pub fn new(db: Arc<Database>, hub: Arc<SyncHub>, config: &Config) -> Self {
        Self {
            db,
            hub,
            view: RwLock::new(ClubView::new()),
            refresh_lock: Mutex::new(()),
            namespace: config.namespace.clone(),
            default_password_hash: hash_password(&config.default_admin_password),
            utc_offset: config.utc_offset,
        }
    }

    /// 시작 시 모든 컬렉션을 읽어 뷰를 채움
    pub async fn bootstrap(&self) -> Result<()> {
        for collection in [
            Collection::Students,
            Collection::Attendance,
            Collection::Competitions,
            Collection::Config,
        ] {
            let _guard = self.refresh_lock.lock().await;
            let message = self.load(collection).await?;
            self.apply_and_publish(message).await;
        }

        let view = self.view.read().await;
        tracing::info!(
            students = view.students().len(),
            attendance = view.attendance().len(),
            competitions = view.competitions().len(),
            "club view loaded"
        );
        Ok(())
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.utc_offset).date_naive()
    }

    // ============ Snapshot plumbing ============

    async fn load(&self, collection: Collection) -> Result<SyncMessage> {
        let message = match collection {
            Collection::Students => SyncMessage::Students(self.db.list_students().await?),
            Collection::Attendance => SyncMessage::Attendance(self.db.list_attendance().await?),
            Collection::Competitions => {
                SyncMessage::Competitions(self.db.list_competitions().await?)
            }
            Collection::Config => {
                let config = self
                    .db
                    .get_or_create_config(&self.namespace, &self.default_password_hash)
                    .await?;
                SyncMessage::Config(ConfigSnapshot {
                    announcements: config.announcements.0,
                })
            }
            Collection::Leaderboard => {
                SyncMessage::Leaderboard(self.view.read().await.leaderboard().to_vec())
            }
        };
        Ok(message)
    }

    async fn apply_and_publish(&self, message: SyncMessage) {
        let leaderboard = {
            let mut view = self.view.write().await;
            if view.apply(&message) {
                Some(view.leaderboard().to_vec())
            } else {
                None
            }
        };

        self.hub.publish(message);
        if let Some(rows) = leaderboard {
            self.hub.publish(SyncMessage::Leaderboard(rows));
        }
    }

    /// 쓰기 이후 스냅샷 갱신. 실패해도 쓰기 자체는 이미 커밋됨
    async fn refresh(&self, collection: Collection) {
        let _guard = self.refresh_lock.lock().await;
        match self.load(collection).await {
            Ok(message) => self.apply_and_publish(message).await,
            Err(e) => {
                tracing::warn!(%collection, "snapshot refresh failed: {:?}", e);
            }
        }
    }

    // ============ Reads (current snapshot) ============

    pub async fn students(&self) -> Vec<Student> {
        self.view.read().await.students().to_vec()
    }

    pub async fn leaderboard(&self) -> Vec<RankedStudent> {
        self.view.read().await.leaderboard().to_vec()
    }

    pub async fn standing(&self, student_id: &str) -> Option<Standing> {
        let view = self.view.read().await;
        let board = view.leaderboard();
        let rank = rank_of(board, student_id)?;
        Some(Standing {
            rank,
            total: board.len(),
            row: board[rank - 1].clone(),
        })
    }

    pub async fn attendance_on(&self, day: NaiveDate) -> Vec<AttendanceRecord> {
        self.view
            .read()
            .await
            .attendance()
            .iter()
            .filter(|r| r.day == day)
            .cloned()
            .collect()
    }

    pub async fn competitions(&self) -> Vec<Competition> {
        self.view.read().await.competitions().to_vec()
    }

    pub async fn announcements(&self) -> Vec<Announcement> {
        self.view.read().await.announcements().to_vec()
    }

    /// 새 WebSocket 구독자용 전체 상태
    pub async fn snapshot_messages(&self) -> Vec<SyncMessage> {
        self.view.read().await.snapshot_messages()
    }

    // ============ Authentication ============

    /// 관리자 로그인. 설정 문서가 없으면 기본 비밀번호로 생성됨
    pub async fn login_admin(&self, password: &str) -> Result<AuthState, ApiError> {
        let config = self
            .db
            .get_or_create_config(&self.namespace, &self.default_password_hash)
            .await?;

        let state = AuthState::LoggedOut.login_admin(password, &config.password_hash)?;
        Ok(state)
    }

    /// 학생 로그인 (현재 학생 스냅샷 기준)
    pub async fn login_student(&self, class_name: &str, class_no: &str) -> Result<AuthState, ApiError> {
        let view = self.view.read().await;
        let state = AuthState::LoggedOut.login_student(
            class_name.trim(),
            class_no.trim(),
            view.students(),
        )?;
        Ok(state)
    }

    pub async fn change_admin_password(&self, current: &str, new_password: &str) -> Result<(), ApiError> {
        if new_password.is_empty() {
            return Err(ApiError::ValidationError("New password must not be empty".to_string()));
        }
        // 현재 비밀번호 재확인
        self.login_admin(current).await?;

        self.db
            .set_password_hash(&self.namespace, &hash_password(new_password))
            .await?;
        tracing::info!("admin password changed");
        Ok(())
    }

    // ============ Students ============

    pub async fn create_student(&self, new: NewStudent) -> Result<Student, ApiError> {
        if new.name.is_empty() {
            return Err(ApiError::ValidationError("Name is required".to_string()));
        }

        let student = self.db.insert_student(&new).await?;
        tracing::info!(id = %student.id, name = %student.name, "student created");

        self.refresh(Collection::Students).await;
        Ok(student)
    }

    pub async fn update_student(&self, id: &str, patch: StudentPatch) -> Result<Student, ApiError> {
        if matches!(patch.name.as_deref().map(str::trim), Some("")) {
            return Err(ApiError::ValidationError("Name must not be empty".to_string()));
        }

        let student = self
            .db
            .update_student(id, &patch)
            .await?
            .ok_or_else(|| ApiError::NotFound("Student".to_string()))?;

        self.refresh(Collection::Students).await;
        Ok(student)
    }

    pub async fn delete_student(&self, id: &str) -> Result<(), ApiError> {
        if !self.db.delete_student(id).await? {
            return Err(ApiError::NotFound("Student".to_string()));
        }
        tracing::info!(id, "student deleted");

        self.refresh(Collection::Students).await;
        self.refresh(Collection::Attendance).await;
        Ok(())
    }

    /// 원점수 증감. 갱신 후 원점수 반환
    pub async fn adjust_points(&self, id: &str, delta: i64) -> Result<i64, ApiError> {
        let change = self
            .db
            .adjust_points(id, delta)
            .await?
            .ok_or_else(|| ApiError::NotFound("Student".to_string()))?;
        let points = match change {
            PointsChange::Updated(points) => points,
            PointsChange::OutOfRange => {
                tracing::warn!(id, delta, "points adjustment out of range");
                return Err(ApiError::ValidationError(
                    "Points adjustment exceeds the allowed range".to_string(),
                ));
            }
        };
        tracing::info!(id, delta, points, "points adjusted");

        self.refresh(Collection::Students).await;
        Ok(points)
    }

    // ============ CSV imports ============

    /// 신규 학생 일괄 등록. 생성된 학생 수 반환
    pub async fn import_students(&self, csv: &str) -> Result<usize, ApiError> {
        let batch = parse_new_students(csv)?;
        if batch.is_empty() {
            return Ok(0);
        }

        let created = self.db.insert_students(&batch).await?;
        tracing::info!(count = created.len(), "students imported");

        self.refresh(Collection::Students).await;
        Ok(created.len())
    }

    /// 배지/점수 일괄 갱신. 실제 갱신된 학생 수 반환
    pub async fn import_badges(&self, csv: &str) -> Result<usize, ApiError> {
        let updates = parse_badge_updates(csv)?;
        if updates.is_empty() {
            return Ok(0);
        }

        let updated = self.db.apply_badge_updates(&updates).await?;
        tracing::info!(rows = updates.len(), updated, "badge/points imported");

        if updated > 0 {
            self.refresh(Collection::Students).await;
        }
        Ok(updated)
    }

    // ============ Attendance ============

    pub async fn toggle_attendance(
        &self,
        student_id: &str,
        present: bool,
        day: Option<NaiveDate>,
    ) -> Result<AttendanceChange, ApiError> {
        let day = day.unwrap_or_else(|| self.today());

        let change = self
            .db
            .toggle_attendance(student_id, day, present, Utc::now())
            .await?
            .ok_or_else(|| ApiError::NotFound("Student".to_string()))?;
        tracing::debug!(student_id, %day, ?change, "attendance toggled");

        if change != AttendanceChange::AlreadyPresent {
            self.refresh(Collection::Attendance).await;
        }
        Ok(change)
    }

    // ============ Competitions ============

    pub async fn create_competition(&self, new: NewCompetition) -> Result<Competition, ApiError> {
        if new.title.trim().is_empty() {
            return Err(ApiError::ValidationError("Title is required".to_string()));
        }

        let competition = self.db.insert_competition(&new).await?;
        self.refresh(Collection::Competitions).await;
        Ok(competition)
    }

    pub async fn delete_competition(&self, id: &str) -> Result<(), ApiError> {
        if !self.db.delete_competition(id).await? {
            return Err(ApiError::NotFound("Competition".to_string()));
        }
        self.refresh(Collection::Competitions).await;
        Ok(())
    }

    // ============ Announcements ============

    pub async fn add_announcement(&self, announcement: Announcement) -> Result<Vec<Announcement>, ApiError> {
        if announcement.title.trim().is_empty() {
            return Err(ApiError::ValidationError("Title is required".to_string()));
        }

        let config = self
            .db
            .get_or_create_config(&self.namespace, &self.default_password_hash)
            .await?;
        let mut announcements = config.announcements.0;
        announcements.push(announcement);

        self.db.set_announcements(&self.namespace, &announcements).await?;
        self.refresh(Collection::Config).await;
        Ok(announcements)
    }

    pub async fn remove_announcement(&self, index: usize) -> Result<Vec<Announcement>, ApiError> {
        let config = self
            .db
            .get_or_create_config(&self.namespace, &self.default_password_hash)
            .await?;
        let mut announcements = config.announcements.0;
        if index >= announcements.len() {
            return Err(ApiError::NotFound("Announcement".to_string()));
        }
        announcements.remove(index);

        self.db.set_announcements(&self.namespace, &announcements).await?;
        self.refresh(Collection::Config).await;
        Ok(announcements)
    }

    // ============ Export ============

    /// (파일명, CSV 바이트)
    pub async fn export_leaderboard(&self) -> Result<(String, Vec<u8>), ApiError> {
        let rows = self.leaderboard().await;
        let bytes = leaderboard_csv(&rows)?;
        Ok((export_filename(self.today()), bytes))
    }
}
