//! Finance Calculator Endpoint
//!
//! 저장하지 않는 계산기. 관리자 전용

use axum::Json;

use crate::{
    error::ApiError,
    routes::session::AdminSession,
    services::finance::{FinanceSummary, Ledger},
};

/// POST /api/finance/summary
pub async fn summarize(
    _admin: AdminSession,
    Json(ledger): Json<Ledger>,
) -> Result<Json<FinanceSummary>, ApiError> {
    Ok(Json(ledger.summarize()?))
}
