use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::rest::identity::CourierId;
use crate::api::rest::Ack;
use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::courier::{Courier, ProfilePatch};
use crate::state::AppState;
use crate::store::{bounded, StoreError};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers", post(register_courier))
        .route("/profile", get(get_profile).put(update_profile))
        .route("/location", post(update_location))
        .route("/availability", post(toggle_availability))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCourierRequest {
    pub id: Option<String>,
    pub phone_number: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleAvailabilityRequest {
    pub is_available: bool,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub profile: Courier,
}

fn courier_missing(id: &str) -> AppError {
    AppError::NotFound(format!("courier {id} not found"))
}

async fn register_courier(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterCourierRequest>,
) -> Result<Json<Courier>, AppError> {
    let phone_number = payload.phone_number.trim().to_string();
    if phone_number.len() < 10 || !phone_number.chars().all(|c| c.is_ascii_digit() || c == '+') {
        return Err(AppError::BadRequest("phoneNumber must have at least 10 digits".to_string()));
    }
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    let id = payload
        .id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let courier = Courier::register(id, phone_number, payload.name.trim().to_string(), Utc::now());

    match bounded(
        state.store_timeout,
        "couriers.insert",
        state.couriers.insert(courier.clone()),
    )
    .await
    {
        Ok(()) => Ok(Json(courier)),
        Err(StoreError::Duplicate(key)) => Err(AppError::BadRequest(format!("{key} already exists"))),
        Err(err) => Err(err.into()),
    }
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    CourierId(courier_id): CourierId,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = bounded(state.store_timeout, "couriers.get", state.couriers.get(&courier_id))
        .await?
        .ok_or_else(|| courier_missing(&courier_id))?;

    Ok(Json(ProfileResponse {
        success: true,
        profile,
    }))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    CourierId(courier_id): CourierId,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<Ack>, AppError> {
    if patch.is_empty() {
        return Err(AppError::BadRequest("no profile fields supplied".to_string()));
    }

    let found = bounded(
        state.store_timeout,
        "couriers.apply_patch",
        state.couriers.apply_patch(&courier_id, &patch, Utc::now()),
    )
    .await?;
    if !found {
        return Err(courier_missing(&courier_id));
    }

    Ok(Ack::ok("Profile updated successfully"))
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    CourierId(courier_id): CourierId,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Ack>, AppError> {
    let location = GeoPoint::new(payload.latitude, payload.longitude)?;

    let found = bounded(
        state.store_timeout,
        "couriers.stamp_location",
        state.couriers.stamp_location(&courier_id, location, Utc::now()),
    )
    .await?;
    if !found {
        return Err(courier_missing(&courier_id));
    }

    Ok(Ack::ok("Location updated successfully"))
}

async fn toggle_availability(
    State(state): State<Arc<AppState>>,
    CourierId(courier_id): CourierId,
    Json(payload): Json<ToggleAvailabilityRequest>,
) -> Result<Json<Ack>, AppError> {
    let found = bounded(
        state.store_timeout,
        "couriers.set_availability",
        state
            .couriers
            .set_availability(&courier_id, payload.is_available, Utc::now()),
    )
    .await?;
    if !found {
        return Err(courier_missing(&courier_id));
    }

    let status = if payload.is_available { "online" } else { "offline" };
    tracing::info!(courier_id = %courier_id, status, "courier availability changed");
    Ok(Ack::ok(format!("You are now {status}")))
}
