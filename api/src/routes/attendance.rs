//! Attendance Endpoints
//!
//! # Endpoints
//! - `GET  /api/attendance?date=YYYY-MM-DD` - 날짜별 출석 (기본값: 오늘)
//! - `POST /api/attendance/toggle` - 출석 체크/해제 (관리자)

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    db::{AttendanceChange, AttendanceRecord},
    error::ApiError,
    routes::session::AdminSession,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct AttendanceQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct AttendanceDay {
    pub date: NaiveDate,
    pub records: Vec<AttendanceRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    pub student_id: String,
    pub present: bool,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub student_id: String,
    pub present: bool,
    /// 실제로 기록이 바뀌었는지
    pub changed: bool,
}

/// GET /api/attendance
pub async fn get_attendance(
    State(state): State<AppState>,
    Query(query): Query<AttendanceQuery>,
) -> Json<AttendanceDay> {
    let date = query.date.unwrap_or_else(|| state.club.today());
    let records = state.club.attendance_on(date).await;
    Json(AttendanceDay { date, records })
}

/// POST /api/attendance/toggle
///
/// 이미 출석한 날 다시 체크해도 기록은 1건
pub async fn toggle_attendance(
    State(state): State<AppState>,
    _admin: AdminSession,
    Json(req): Json<ToggleRequest>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let change = state
        .club
        .toggle_attendance(&req.student_id, req.present, req.date)
        .await?;

    let changed = match change {
        AttendanceChange::CheckedIn => true,
        AttendanceChange::AlreadyPresent => false,
        AttendanceChange::Cleared(count) => count > 0,
    };

    Ok(Json(ToggleResponse {
        student_id: req.student_id,
        present: req.present,
        changed,
    }))
}
