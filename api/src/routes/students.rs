//! Roster Endpoints
//!
//! 목록 조회는 누구나, 쓰기는 관리자만.
//!
//! # Endpoints
//! - `GET    /api/students`
//! - `POST   /api/students`
//! - `PUT    /api/students/:id`
//! - `DELETE /api/students/:id`
//! - `POST   /api/students/:id/points`
//! - `POST   /api/import/students` (text/csv)
//! - `POST   /api/import/badges` (text/csv)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    db::{NewStudent, Student, StudentPatch},
    error::ApiError,
    routes::session::AdminSession,
    AppState,
};

// ============ Request/Response Types ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    pub name: String,
    #[serde(default, rename = "class")]
    pub class_name: String,
    #[serde(default)]
    pub class_no: String,
    #[serde(default)]
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct PointsRequest {
    pub delta: i64,
}

#[derive(Debug, Serialize)]
pub struct PointsResponse {
    pub id: String,
    pub points: i64,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    /// 생성되거나 갱신된 학생 수
    pub count: usize,
}

// ============ Handlers ============

/// GET /api/students
pub async fn list_students(State(state): State<AppState>) -> Json<Vec<Student>> {
    Json(state.club.students().await)
}

/// POST /api/students
///
/// 빈 반/반번호/등급은 기본값, 배지 none, 원점수 100으로 생성
pub async fn create_student(
    State(state): State<AppState>,
    _admin: AdminSession,
    Json(req): Json<CreateStudentRequest>,
) -> Result<(StatusCode, Json<Student>), ApiError> {
    let new = NewStudent::with_defaults(&req.name, &req.class_name, &req.class_no, &req.level);
    let student = state.club.create_student(new).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

/// PUT /api/students/:id
pub async fn update_student(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
    Json(patch): Json<StudentPatch>,
) -> Result<Json<Student>, ApiError> {
    Ok(Json(state.club.update_student(&id, patch).await?))
}

/// DELETE /api/students/:id
///
/// 출석 기록과 해당 학생의 세션도 함께 정리
pub async fn delete_student(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.club.delete_student(&id).await?;

    let closed = state.sessions.close_student(&id).await;
    if closed > 0 {
        tracing::info!(id, closed, "closed sessions of deleted student");
    }

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/students/:id/points
pub async fn adjust_points(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
    Json(req): Json<PointsRequest>,
) -> Result<Json<PointsResponse>, ApiError> {
    let points = state.club.adjust_points(&id, req.delta).await?;
    Ok(Json(PointsResponse { id, points }))
}

/// POST /api/import/students
///
/// 헤더 1줄 + `name,class,classNo,level`. 모든 행이 한 번에 반영됨
pub async fn import_students(
    State(state): State<AppState>,
    _admin: AdminSession,
    body: String,
) -> Result<Json<ImportResponse>, ApiError> {
    let count = state.club.import_students(&body).await?;
    Ok(Json(ImportResponse { count }))
}

/// POST /api/import/badges
///
/// 헤더 1줄 + `name,class,classNo,badge,points`
pub async fn import_badges(
    State(state): State<AppState>,
    _admin: AdminSession,
    body: String,
) -> Result<Json<ImportResponse>, ApiError> {
    let count = state.club.import_badges(&body).await?;
    Ok(Json(ImportResponse { count }))
}
