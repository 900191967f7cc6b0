use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::rest::identity::CourierId;
use crate::api::rest::PageParams;
use crate::engine::earnings::EarningsSummary;
use crate::engine::query::DEFAULT_EARNINGS_HISTORY_LIMIT;
use crate::error::AppError;
use crate::models::earnings::{EarningsHistoryItem, Period};
use crate::models::page::Page;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/earnings", get(earnings_summary))
        .route("/earnings/history", get(earnings_history))
}

#[derive(Deserialize)]
pub struct SummaryParams {
    pub period: Option<String>,
}

#[derive(Serialize)]
pub struct EarningsSummaryResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: EarningsSummary,
}

#[derive(Serialize)]
pub struct EarningsHistoryResponse {
    pub success: bool,
    #[serde(flatten)]
    pub page: Page<EarningsHistoryItem>,
}

async fn earnings_summary(
    State(state): State<Arc<AppState>>,
    CourierId(courier_id): CourierId,
    Query(params): Query<SummaryParams>,
) -> Result<Json<EarningsSummaryResponse>, AppError> {
    let period = match params.period.as_deref().map(str::trim) {
        None | Some("") => Period::default(),
        Some(raw) => raw.parse::<Period>().map_err(AppError::BadRequest)?,
    };

    let summary = state.ledger.summary(&courier_id, period, Utc::now()).await?;

    Ok(Json(EarningsSummaryResponse {
        success: true,
        summary,
    }))
}

async fn earnings_history(
    State(state): State<Arc<AppState>>,
    CourierId(courier_id): CourierId,
    Query(params): Query<PageParams>,
) -> Result<Json<EarningsHistoryResponse>, AppError> {
    let page = params.to_request(DEFAULT_EARNINGS_HISTORY_LIMIT)?;
    let page = state.queries.earnings_history(&courier_id, page).await?;

    Ok(Json(EarningsHistoryResponse {
        success: true,
        page,
    }))
}
