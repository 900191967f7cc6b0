use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;

/// Header the upstream auth gateway sets after verifying the courier's token.
pub const COURIER_ID_HEADER: &str = "x-courier-id";

/// Authenticated courier id. Trusted as-is; identity is verified upstream.
#[derive(Debug, Clone)]
pub struct CourierId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for CourierId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(COURIER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| CourierId(value.to_string()))
            .ok_or(AppError::Unauthenticated)
    }
}
