//! Leaderboard Endpoints
//!
//! # Endpoints
//! - `GET /api/leaderboard` - 전체 순위
//! - `GET /api/leaderboard/me` - 로그인한 학생 본인 순위
//! - `GET /api/export/leaderboard.csv` - 관리자 CSV 내보내기

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};

use crate::{
    error::ApiError,
    routes::session::{AdminSession, StudentSession},
    services::{RankedStudent, Standing},
    AppState,
};

/// GET /api/leaderboard
pub async fn get_leaderboard(State(state): State<AppState>) -> Json<Vec<RankedStudent>> {
    Json(state.club.leaderboard().await)
}

/// GET /api/leaderboard/me
pub async fn get_my_standing(
    State(state): State<AppState>,
    session: StudentSession,
) -> Result<Json<Standing>, ApiError> {
    state
        .club
        .standing(&session.student_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Student".to_string()))
}

/// GET /api/export/leaderboard.csv
pub async fn export_leaderboard(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<impl IntoResponse, ApiError> {
    let (filename, bytes) = state.club.export_leaderboard().await?;
    tracing::info!(%filename, "leaderboard exported");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    ))
}
