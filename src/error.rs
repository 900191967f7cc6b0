use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::models::job::JobStatus;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("job not available")]
    NotAvailable,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("missing courier identity")]
    Unauthenticated,

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Expected rejections from the state machine. These are answered with a
    /// non-success payload and are not logged as errors.
    pub fn is_business_outcome(&self) -> bool {
        matches!(
            self,
            AppError::NotAvailable
                | AppError::Unauthorized(_)
                | AppError::InvalidTransition { .. }
                | AppError::InvalidState(_)
        )
    }

    pub fn outcome_label(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::NotAvailable => "not_available",
            AppError::Unauthorized(_) | AppError::Unauthenticated => "unauthorized",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::InvalidState(_) => "invalid_state",
            AppError::BadRequest(_) => "bad_request",
            AppError::Store(_) => "store_failure",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NotAvailable => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidState(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            AppError::Store(err) => {
                tracing::error!(error = %err, "request failed at the store boundary");
                json!({
                    "success": false,
                    "message": self.to_string(),
                    "retryable": err.is_retryable(),
                })
            }
            AppError::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                json!({ "success": false, "message": self.to_string() })
            }
            _ => json!({ "success": false, "message": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
