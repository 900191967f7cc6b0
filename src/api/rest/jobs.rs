use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::rest::identity::CourierId;
use crate::api::rest::{Ack, PageParams};
use crate::engine::query::DEFAULT_HISTORY_LIMIT;
use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::job::{Job, JobStatus, JobSummary, NewJob};
use crate::models::page::Page;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        // Operator and order-system endpoints; no courier identity.
        .route("/jobs", post(create_job))
        .route("/jobs/:id/dispatch", post(dispatch_job))
        // Courier endpoints; identity comes from `CourierId`.
        .route("/orders/active", get(active_orders))
        .route("/orders/history", get(order_history))
        .route("/orders/pending", get(pending_orders))
        .route("/orders/:id", get(order_details))
        .route("/orders/:id/accept", post(accept_order))
        .route("/orders/:id/status", post(update_order_status))
        .route("/orders/:id/complete", post(complete_delivery))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    pub courier_id: String,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: JobStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Deserialize)]
pub struct CompleteDeliveryRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct ActiveOrdersResponse {
    pub success: bool,
    pub orders: Vec<JobSummary>,
    pub count: usize,
}

#[derive(Serialize)]
pub struct OrderHistoryResponse {
    pub success: bool,
    #[serde(flatten)]
    pub page: Page<JobSummary>,
}

#[derive(Serialize)]
pub struct OrderDetailsResponse {
    pub success: bool,
    pub order: Job,
}

/// Called by the upstream order system, not by couriers.
async fn create_job(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewJob>,
) -> Result<Json<Job>, AppError> {
    let job = state.lifecycle.create_job(payload).await?;
    Ok(Json(job))
}

/// Operator pre-assignment, not exposed to couriers.
async fn dispatch_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DispatchRequest>,
) -> Result<Json<Ack>, AppError> {
    if payload.courier_id.trim().is_empty() {
        return Err(AppError::BadRequest("courierId cannot be empty".to_string()));
    }

    state.lifecycle.dispatch(id, payload.courier_id.trim()).await?;
    Ok(Ack::ok("Order dispatched successfully"))
}

async fn active_orders(
    State(state): State<Arc<AppState>>,
    CourierId(courier_id): CourierId,
) -> Result<Json<ActiveOrdersResponse>, AppError> {
    let orders = state.queries.active_orders(&courier_id).await?;

    Ok(Json(ActiveOrdersResponse {
        success: true,
        count: orders.len(),
        orders,
    }))
}

async fn order_history(
    State(state): State<Arc<AppState>>,
    CourierId(courier_id): CourierId,
    Query(params): Query<PageParams>,
) -> Result<Json<OrderHistoryResponse>, AppError> {
    let page = params.to_request(DEFAULT_HISTORY_LIMIT)?;
    let page = state.queries.history(&courier_id, page).await?;

    Ok(Json(OrderHistoryResponse {
        success: true,
        page,
    }))
}

async fn pending_orders(
    State(state): State<Arc<AppState>>,
    CourierId(_courier_id): CourierId,
) -> Result<Json<ActiveOrdersResponse>, AppError> {
    let orders = state.queries.pending_jobs().await?;

    Ok(Json(ActiveOrdersResponse {
        success: true,
        count: orders.len(),
        orders,
    }))
}

async fn order_details(
    State(state): State<Arc<AppState>>,
    CourierId(_courier_id): CourierId,
    Path(id): Path<String>,
) -> Result<Json<OrderDetailsResponse>, AppError> {
    let order = state.queries.order_details(&id).await?;

    Ok(Json(OrderDetailsResponse {
        success: true,
        order,
    }))
}

async fn accept_order(
    State(state): State<Arc<AppState>>,
    CourierId(courier_id): CourierId,
    Path(id): Path<Uuid>,
) -> Result<Json<Ack>, AppError> {
    state.lifecycle.assign(id, &courier_id).await?;
    Ok(Ack::ok("Order accepted successfully"))
}

async fn update_order_status(
    State(state): State<Arc<AppState>>,
    CourierId(courier_id): CourierId,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Ack>, AppError> {
    let location = GeoPoint::from_optional(payload.latitude, payload.longitude)?;

    state
        .lifecycle
        .advance_status(id, &courier_id, payload.status, location)
        .await?;
    Ok(Ack::ok("Status updated successfully"))
}

async fn complete_delivery(
    State(state): State<Arc<AppState>>,
    CourierId(courier_id): CourierId,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteDeliveryRequest>,
) -> Result<Json<Ack>, AppError> {
    let location = GeoPoint::from_optional(payload.latitude, payload.longitude)?;
    state
        .lifecycle
        .complete(id, &courier_id, payload.notes, location)
        .await?;
    Ok(Ack::ok("Delivery completed successfully"))
}
