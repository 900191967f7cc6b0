use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Result<Self, AppError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(AppError::BadRequest(format!("latitude out of range: {lat}")));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(AppError::BadRequest(format!("longitude out of range: {lng}")));
        }

        Ok(Self { lat, lng })
    }

    /// Builds a point from an optional coordinate pair. A pair is only
    /// considered present when both halves are supplied and not the
    /// `(0, 0)` placeholder mobile clients send when GPS is unavailable.
    pub fn from_optional(lat: Option<f64>, lng: Option<f64>) -> Result<Option<Self>, AppError> {
        match (lat, lng) {
            (Some(lat), Some(lng)) if lat != 0.0 || lng != 0.0 => Self::new(lat, lng).map(Some),
            _ => Ok(None),
        }
    }
}
