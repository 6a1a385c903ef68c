//! Session extractors.
//!
//! Requests name their session with `Authorization: Bearer <token>`.
//! A missing or unknown token is simply the logged-out state.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::{error::ApiError, services::AuthState, AppState};

/// 현재 세션 (로그아웃 상태 포함)
#[derive(Debug, Clone)]
pub struct Session {
    pub token: Option<String>,
    pub state: AuthState,
}

/// 관리자 세션 필수
#[derive(Debug, Clone)]
pub struct AdminSession;

/// 학생 세션 필수
#[derive(Debug, Clone)]
pub struct StudentSession {
    pub student_id: String,
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts);
        let auth = match &token {
            Some(token) => state.sessions.get(token).await,
            None => AuthState::LoggedOut,
        };

        Ok(Session { token, state: auth })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        match session.state {
            AuthState::Admin => Ok(AdminSession),
            AuthState::LoggedOut => Err(ApiError::Unauthorized),
            AuthState::Student { .. } => Err(ApiError::Forbidden),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for StudentSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        match session.state {
            AuthState::Student { student_id } => Ok(StudentSession { student_id }),
            _ => Err(ApiError::Unauthorized),
        }
    }
}
