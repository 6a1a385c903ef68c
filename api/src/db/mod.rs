//! Database Module
//!
//! SQLite storage for the club collections. Every method is a single
//! statement or a single transaction; batch imports commit all rows or none.

mod models;

pub use models::*;

use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::types::Json;

/// 데이터베이스 연결 및 쿼리 담당
pub struct Database {
    pool: SqlitePool,
}

/// 원점수 증감 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointsChange {
    /// 갱신 후 원점수
    Updated(i64),
    /// i64 범위 초과로 거부됨
    OutOfRange,
}

/// 출석 토글 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceChange {
    /// 새 기록 생성
    CheckedIn,
    /// 이미 같은 날 기록이 있음
    AlreadyPresent,
    /// 기록 삭제 (삭제된 건수)
    Cleared(u64),
}

impl Database {
    /// 데이터베이스 연결
    ///
    /// # Connection Pool Settings
    ///
    /// - 파일 DB: max_connections 10, acquire_timeout 3초
    /// - `:memory:` DB: 연결마다 별도 DB가 생기므로 커넥션 1개를 계속 유지
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
                .max_connections(10)
                .min_connections(1)
        };

        let pool = options
            .acquire_timeout(std::time::Duration::from_secs(3))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// 마이그레이션 실행
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Health check
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // ============ Students ============

    /// 전체 학생 (생성 순서)
    pub async fn list_students(&self) -> Result<Vec<Student>> {
        let students = sqlx::query_as::<_, Student>(
            r#"
            SELECT id, name, class_name, class_no, level, badge, points, created_at
            FROM students
            ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(students)
    }

    pub async fn get_student(&self, id: &str) -> Result<Option<Student>> {
        let student = sqlx::query_as::<_, Student>(
            r#"
            SELECT id, name, class_name, class_no, level, badge, points, created_at
            FROM students
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(student)
    }

    /// 학생 1명 생성
    pub async fn insert_student(&self, new: &NewStudent) -> Result<Student> {
        let mut inserted = self.insert_students(std::slice::from_ref(new)).await?;
        inserted
            .pop()
            .ok_or_else(|| anyhow::anyhow!("insert returned no student"))
    }

    /// 학생 일괄 생성 (단일 트랜잭션)
    pub async fn insert_students(&self, batch: &[NewStudent]) -> Result<Vec<Student>> {
        let now = Utc::now();
        let mut created = Vec::with_capacity(batch.len());

        let mut tx = self.pool.begin().await?;
        for new in batch {
            let student = Student {
                id: uuid::Uuid::new_v4().to_string(),
                name: new.name.clone(),
                class_name: new.class_name.clone(),
                class_no: new.class_no.clone(),
                level: new.level.clone(),
                badge: new.badge,
                points: Some(new.points),
                created_at: now,
            };

            sqlx::query(
                r#"
                INSERT INTO students (id, name, class_name, class_no, level, badge, points, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&student.id)
            .bind(&student.name)
            .bind(&student.class_name)
            .bind(&student.class_no)
            .bind(&student.level)
            .bind(student.badge)
            .bind(student.points)
            .bind(student.created_at)
            .execute(&mut *tx)
            .await?;

            created.push(student);
        }
        tx.commit().await?;

        Ok(created)
    }

    /// 학생 정보 수정. 없는 id면 None
    pub async fn update_student(&self, id: &str, patch: &StudentPatch) -> Result<Option<Student>> {
        let result = sqlx::query(
            r#"
            UPDATE students SET
                name = COALESCE(?, name),
                class_name = COALESCE(?, class_name),
                class_no = COALESCE(?, class_no),
                level = COALESCE(?, level),
                badge = COALESCE(?, badge)
            WHERE id = ?
            "#,
        )
        .bind(patch.name.as_deref().map(str::trim))
        .bind(patch.class_name.as_deref().map(str::trim))
        .bind(patch.class_no.as_deref().map(str::trim))
        .bind(patch.level.as_deref().map(str::trim))
        .bind(patch.badge)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_student(id).await
    }

    /// 학생 삭제 (출석 기록 포함). 삭제되었으면 true
    pub async fn delete_student(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM attendance WHERE student_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM students WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// 원점수 증감 (단일 UPDATE, 순서 무관하게 합산됨)
    ///
    /// 없는 id면 None. 결과가 i64 범위를 벗어나면 아무것도 바꾸지 않음
    pub async fn adjust_points(&self, id: &str, delta: i64) -> Result<Option<PointsChange>> {
        // SQLite는 정수 overflow를 REAL로 저장하므로 현재 값 범위로 막음
        let (low, high) = if delta >= 0 {
            (i64::MIN, i64::MAX - delta)
        } else {
            (i64::MIN - delta, i64::MAX)
        };

        let points = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE students
            SET points = COALESCE(points, 0) + ?
            WHERE id = ? AND COALESCE(points, 0) BETWEEN ? AND ?
            RETURNING points
            "#,
        )
        .bind(delta)
        .bind(id)
        .bind(low)
        .bind(high)
        .fetch_optional(&self.pool)
        .await?;

        match points {
            Some(points) => Ok(Some(PointsChange::Updated(points))),
            None if self.get_student(id).await?.is_some() => Ok(Some(PointsChange::OutOfRange)),
            None => Ok(None),
        }
    }

    /// 배지/점수 일괄 갱신 (단일 트랜잭션)
    ///
    /// 이름/반/반번호가 정확히 일치하는 첫 학생만 갱신.
    /// 일치하는 학생이 없는 행은 건너뛰고, 실제 갱신된 학생 수를 반환
    pub async fn apply_badge_updates(&self, updates: &[BadgeUpdate]) -> Result<usize> {
        let mut touched: HashSet<String> = HashSet::new();

        let mut tx = self.pool.begin().await?;
        for update in updates {
            let matched = sqlx::query_scalar::<_, String>(
                r#"
                SELECT id FROM students
                WHERE name = ? AND class_name = ? AND class_no = ?
                ORDER BY rowid
                LIMIT 1
                "#,
            )
            .bind(&update.name)
            .bind(&update.class_name)
            .bind(&update.class_no)
            .fetch_optional(&mut *tx)
            .await?;

            let Some(id) = matched else {
                continue;
            };

            sqlx::query(
                r#"
                UPDATE students SET
                    badge = COALESCE(?, badge),
                    points = COALESCE(?, points)
                WHERE id = ?
                "#,
            )
            .bind(update.badge)
            .bind(update.points)
            .bind(&id)
            .execute(&mut *tx)
            .await?;

            touched.insert(id);
        }
        tx.commit().await?;

        Ok(touched.len())
    }

    // ============ Attendance ============

    pub async fn list_attendance(&self) -> Result<Vec<AttendanceRecord>> {
        let records = sqlx::query_as::<_, AttendanceRecord>(
            "SELECT id, student_id, day, checked_at FROM attendance ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn list_attendance_for_day(&self, day: NaiveDate) -> Result<Vec<AttendanceRecord>> {
        let records = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT id, student_id, day, checked_at
            FROM attendance
            WHERE day = ?
            ORDER BY rowid
            "#,
        )
        .bind(day)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// 출석 토글
    ///
    /// - present: 같은 날 기록이 없을 때만 추가
    /// - absent: 그날 기록 삭제
    ///
    /// 학생이 없으면 None
    pub async fn toggle_attendance(
        &self,
        student_id: &str,
        day: NaiveDate,
        present: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceChange>> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM students WHERE id = ?")
            .bind(student_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let change = if present {
            let existing: Option<String> = sqlx::query_scalar(
                "SELECT id FROM attendance WHERE student_id = ? AND day = ? LIMIT 1",
            )
            .bind(student_id)
            .bind(day)
            .fetch_optional(&mut *tx)
            .await?;

            if existing.is_some() {
                AttendanceChange::AlreadyPresent
            } else {
                sqlx::query(
                    r#"
                    INSERT INTO attendance (id, student_id, day, checked_at)
                    VALUES (?, ?, ?, ?)
                    "#,
                )
                .bind(uuid::Uuid::new_v4().to_string())
                .bind(student_id)
                .bind(day)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                AttendanceChange::CheckedIn
            }
        } else {
            let result = sqlx::query("DELETE FROM attendance WHERE student_id = ? AND day = ?")
                .bind(student_id)
                .bind(day)
                .execute(&mut *tx)
                .await?;
            AttendanceChange::Cleared(result.rows_affected())
        };

        tx.commit().await?;
        Ok(Some(change))
    }

    // ============ Competitions ============

    /// 최신순
    pub async fn list_competitions(&self) -> Result<Vec<Competition>> {
        let competitions = sqlx::query_as::<_, Competition>(
            r#"
            SELECT id, title, date, info, created_at
            FROM competitions
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(competitions)
    }

    pub async fn insert_competition(&self, new: &NewCompetition) -> Result<Competition> {
        let competition = Competition {
            id: uuid::Uuid::new_v4().to_string(),
            title: new.title.trim().to_string(),
            date: new.date.trim().to_string(),
            info: new.info.clone(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO competitions (id, title, date, info, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&competition.id)
        .bind(&competition.title)
        .bind(&competition.date)
        .bind(&competition.info)
        .bind(competition.created_at)
        .execute(&self.pool)
        .await?;

        Ok(competition)
    }

    pub async fn delete_competition(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM competitions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ============ System Config ============

    /// 설정 조회. 없으면 기본 비밀번호로 생성 후 반환
    pub async fn get_or_create_config(
        &self,
        namespace: &str,
        default_password_hash: &str,
    ) -> Result<SystemConfig> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO system_config (namespace, password_hash, announcements)
            VALUES (?, ?, '[]')
            "#,
        )
        .bind(namespace)
        .bind(default_password_hash)
        .execute(&self.pool)
        .await?;

        let config = sqlx::query_as::<_, SystemConfig>(
            "SELECT namespace, password_hash, announcements FROM system_config WHERE namespace = ?",
        )
        .bind(namespace)
        .fetch_one(&self.pool)
        .await?;

        Ok(config)
    }

    pub async fn set_password_hash(&self, namespace: &str, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE system_config SET password_hash = ? WHERE namespace = ?")
            .bind(password_hash)
            .bind(namespace)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn set_announcements(
        &self,
        namespace: &str,
        announcements: &[Announcement],
    ) -> Result<()> {
        sqlx::query("UPDATE system_config SET announcements = ? WHERE namespace = ?")
            .bind(Json(announcements))
            .bind(namespace)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Database;

    /// 마이그레이션이 적용된 in-memory DB
    pub async fn memory_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.run_migrations().await.unwrap();
        db
    }
}
