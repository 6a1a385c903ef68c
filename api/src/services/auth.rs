//! Authentication Gate
//!
//! ```text
//! LoggedOut ──admin password──▶ Admin
//!     │                           │
//!     └──class + classNo──▶ Student(id)
//!                                 │
//! Admin | Student ──logout──▶ LoggedOut
//! ```
//!
//! Login succeeds or leaves the previous state untouched. The stored admin
//! credential is a SHA-256 digest; no endpoint ever returns it.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::db::Student;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum AuthState {
    LoggedOut,
    Student {
        #[serde(rename = "studentId")]
        student_id: String,
    },
    Admin,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("wrong admin password")]
    WrongPassword,

    #[error("no student with class {class_name} number {class_no}")]
    StudentNotFound { class_name: String, class_no: String },
}

impl AuthState {
    /// 관리자 로그인
    pub fn login_admin(&self, supplied: &str, stored_hash: &str) -> Result<AuthState, AuthError> {
        if hash_password(supplied) == stored_hash {
            Ok(AuthState::Admin)
        } else {
            Err(AuthError::WrongPassword)
        }
    }

    /// 학생 로그인: 현재 학생 스냅샷에서 반/반번호 정확히 일치하는 첫 학생
    pub fn login_student<'a, I>(
        &self,
        class_name: &str,
        class_no: &str,
        students: I,
    ) -> Result<AuthState, AuthError>
    where
        I: IntoIterator<Item = &'a Student>,
    {
        students
            .into_iter()
            .find(|s| s.class_name == class_name && s.class_no == class_no)
            .map(|s| AuthState::Student {
                student_id: s.id.clone(),
            })
            .ok_or_else(|| AuthError::StudentNotFound {
                class_name: class_name.to_string(),
                class_no: class_no.to_string(),
            })
    }

    pub fn logout(&self) -> AuthState {
        AuthState::LoggedOut
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, AuthState::Admin)
    }

    pub fn student_id(&self) -> Option<&str> {
        match self {
            AuthState::Student { student_id } => Some(student_id),
            _ => None,
        }
    }
}

/// 비밀번호 SHA-256 hex digest
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// 세션 기본 유효 시간
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 12 * 60;

struct SessionEntry {
    state: AuthState,
    issued_at: DateTime<Utc>,
}

/// 토큰 → 세션 상태
///
/// 프로세스 메모리에만 보관. 재시작하면 모두 로그아웃됨.
/// 발급 후 `ttl`이 지난 세션은 LoggedOut으로 취급되고 다음 로그인 때 정리됨
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    fn is_expired(&self, entry: &SessionEntry, now: DateTime<Utc>) -> bool {
        now - entry.issued_at >= self.ttl
    }

    /// 로그인된 상태를 저장하고 새 토큰 발급
    pub async fn open(&self, state: AuthState) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !self.is_expired(entry, now));
        let pruned = before - sessions.len();
        if pruned > 0 {
            tracing::debug!(pruned, "expired sessions removed");
        }

        if state != AuthState::LoggedOut {
            sessions.insert(token.clone(), SessionEntry { state, issued_at: now });
        }
        token
    }

    /// 토큰이 없거나, 모르는 토큰이거나, 만료되었으면 LoggedOut
    pub async fn get(&self, token: &str) -> AuthState {
        let now = Utc::now();
        self.sessions
            .read()
            .await
            .get(token)
            .filter(|entry| !self.is_expired(entry, now))
            .map(|entry| entry.state.clone())
            .unwrap_or(AuthState::LoggedOut)
    }

    /// 로그아웃 (항상 성공)
    pub async fn close(&self, token: &str) -> AuthState {
        let previous = self.sessions.write().await.remove(token);
        previous
            .map(|entry| entry.state)
            .unwrap_or(AuthState::LoggedOut)
            .logout()
    }

    /// 삭제된 학생에 묶인 세션 정리
    pub async fn close_student(&self, student_id: &str) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.state.student_id() != Some(student_id));
        before - sessions.len()
    }

    /// 보관 중인 세션 수 (만료되었지만 아직 정리되지 않은 것 포함)
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_SESSION_TTL_MINUTES))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Badge;
    use chrono::Utc;

    fn student(id: &str, class_name: &str, class_no: &str) -> Student {
        Student {
            id: id.to_string(),
            name: id.to_string(),
            class_name: class_name.to_string(),
            class_no: class_no.to_string(),
            level: "初級".to_string(),
            badge: Badge::None,
            points: Some(100),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_admin_login() {
        let stored = hash_password("s3cret");
        let state = AuthState::LoggedOut;

        assert_eq!(state.login_admin("s3cret", &stored), Ok(AuthState::Admin));
        assert_eq!(state.login_admin("S3cret", &stored), Err(AuthError::WrongPassword));
        assert_eq!(state.login_admin("", &stored), Err(AuthError::WrongPassword));
    }

    #[test]
    fn test_student_login_exact_match() {
        let students = vec![student("a", "1A", "1"), student("b", "2B", "12")];
        let state = AuthState::LoggedOut;

        assert_eq!(
            state.login_student("2B", "12", &students),
            Ok(AuthState::Student {
                student_id: "b".to_string()
            })
        );
        assert!(matches!(
            state.login_student("2b", "12", &students),
            Err(AuthError::StudentNotFound { .. })
        ));
        assert!(state.login_student("1A", "01", &students).is_err());
    }

    #[test]
    fn test_logout_always_logged_out() {
        assert_eq!(AuthState::Admin.logout(), AuthState::LoggedOut);
        assert_eq!(
            AuthState::Student {
                student_id: "a".to_string()
            }
            .logout(),
            AuthState::LoggedOut
        );
        assert_eq!(AuthState::LoggedOut.logout(), AuthState::LoggedOut);
    }

    #[test]
    fn test_hash_is_stable_hex() {
        let digest = hash_password("admin");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, hash_password("admin"));
        assert_ne!(digest, hash_password("admin "));
    }

    #[tokio::test]
    async fn test_session_store_lifecycle() {
        let store = SessionStore::default();
        let token = store.open(AuthState::Admin).await;
        assert!(store.get(&token).await.is_admin());

        assert_eq!(store.close(&token).await, AuthState::LoggedOut);
        assert_eq!(store.get(&token).await, AuthState::LoggedOut);
        // 모르는 토큰 로그아웃도 성공
        assert_eq!(store.close("nope").await, AuthState::LoggedOut);
    }

    #[tokio::test]
    async fn test_close_student_sessions() {
        let store = SessionStore::default();
        let token = store
            .open(AuthState::Student {
                student_id: "a".to_string(),
            })
            .await;
        let admin = store.open(AuthState::Admin).await;

        assert_eq!(store.close_student("a").await, 1);
        assert_eq!(store.get(&token).await, AuthState::LoggedOut);
        assert!(store.get(&admin).await.is_admin());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_logged_out_and_pruned() {
        let store = SessionStore::new(Duration::zero());
        let first = store.open(AuthState::Admin).await;
        assert_eq!(store.get(&first).await, AuthState::LoggedOut);

        // 새 로그인 시 만료된 세션은 정리되고 새 세션만 남음
        for _ in 0..5 {
            store.open(AuthState::Admin).await;
        }
        assert_eq!(store.len().await, 1);

        let store = SessionStore::new(Duration::minutes(5));
        for _ in 0..5 {
            store.open(AuthState::Admin).await;
        }
        assert_eq!(store.len().await, 5);
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_value(AuthState::Student {
            student_id: "a".to_string(),
        })
        .unwrap();
        assert_eq!(json["role"], "student");
        assert_eq!(json["studentId"], "a");

        let json = serde_json::to_value(AuthState::LoggedOut).unwrap();
        assert_eq!(json["role"], "loggedout");
    }
}
