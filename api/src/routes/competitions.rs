//! Competition Endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    db::{Competition, NewCompetition},
    error::ApiError,
    routes::session::AdminSession,
    AppState,
};

/// GET /api/competitions
///
/// 최신 등록 순
pub async fn list_competitions(State(state): State<AppState>) -> Json<Vec<Competition>> {
    Json(state.club.competitions().await)
}

/// POST /api/competitions
pub async fn create_competition(
    State(state): State<AppState>,
    _admin: AdminSession,
    Json(req): Json<NewCompetition>,
) -> Result<(StatusCode, Json<Competition>), ApiError> {
    let competition = state.club.create_competition(req).await?;
    Ok((StatusCode::CREATED, Json(competition)))
}

/// DELETE /api/competitions/:id
pub async fn delete_competition(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.club.delete_competition(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
