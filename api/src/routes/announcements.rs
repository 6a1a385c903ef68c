//! Announcement Endpoints
//!
//! 공지는 설정 문서의 배열로 저장되며 인덱스로 삭제함

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    db::Announcement,
    error::ApiError,
    routes::session::AdminSession,
    AppState,
};

/// GET /api/announcements
pub async fn list_announcements(State(state): State<AppState>) -> Json<Vec<Announcement>> {
    Json(state.club.announcements().await)
}

/// POST /api/announcements
pub async fn add_announcement(
    State(state): State<AppState>,
    _admin: AdminSession,
    Json(req): Json<Announcement>,
) -> Result<Json<Vec<Announcement>>, ApiError> {
    Ok(Json(state.club.add_announcement(req).await?))
}

/// DELETE /api/announcements/:index
pub async fn remove_announcement(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(index): Path<usize>,
) -> Result<Json<Vec<Announcement>>, ApiError> {
    Ok(Json(state.club.remove_announcement(index).await?))
}
