//! Login / Logout Endpoints
//!
//! Admin logs in with the club password, students with class + class
//! number. Both return a bearer token for later requests.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    routes::session::{AdminSession, Session},
    services::AuthState,
    AppState,
};

// ============ Request/Response Types ============

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentLoginRequest {
    #[serde(rename = "class")]
    pub class_name: String,
    pub class_no: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub session: AuthState,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: AuthState,
}

// ============ Handlers ============

/// POST /api/auth/admin
///
/// 비밀번호가 틀리면 401, 세션은 생성되지 않음
pub async fn login_admin(
    State(state): State<AppState>,
    Json(req): Json<AdminLoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let session = state.club.login_admin(&req.password).await.map_err(|e| {
        tracing::warn!("Admin login failed");
        e
    })?;

    let token = state.sessions.open(session.clone()).await;
    tracing::info!("Admin logged in");

    Ok(Json(LoginResponse { token, session }))
}

/// POST /api/auth/student
///
/// 현재 학생 목록에서 반/반번호가 정확히 일치해야 함 (없으면 404)
pub async fn login_student(
    State(state): State<AppState>,
    Json(req): Json<StudentLoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let session = state
        .club
        .login_student(&req.class_name, &req.class_no)
        .await?;

    let token = state.sessions.open(session.clone()).await;
    tracing::info!(student_id = ?session.student_id(), "Student logged in");

    Ok(Json(LoginResponse { token, session }))
}

/// POST /api/auth/logout
///
/// 항상 성공
pub async fn logout(State(state): State<AppState>, session: Session) -> Json<SessionResponse> {
    let next = match session.token {
        Some(token) => state.sessions.close(&token).await,
        None => session.state.logout(),
    };

    Json(SessionResponse { session: next })
}

/// GET /api/auth/session
pub async fn current_session(session: Session) -> Json<SessionResponse> {
    Json(SessionResponse {
        session: session.state,
    })
}

/// PUT /api/auth/password
pub async fn change_password(
    State(state): State<AppState>,
    _admin: AdminSession,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    state
        .club
        .change_admin_password(&req.current_password, &req.new_password)
        .await?;

    Ok(Json(SessionResponse {
        session: AuthState::Admin,
    }))
}
