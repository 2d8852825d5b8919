//! # API Handlers
//!
//! HTTP endpoint handlers for the internal Salt Edge proxy. Every handler
//! validates its parameters before the upstream adapter is touched.

use crate::error::ApiError;
use crate::models::ServiceInfo;
use axum::response::Json;
use serde::Serialize;
use utoipa::ToSchema;

pub mod accounts;
pub mod connect;
pub mod connections;
pub mod customers;
pub mod passthrough;
pub mod status;
pub mod transactions;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Liveness check payload
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Liveness check; never calls the upstream
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse)
    ),
    tag = "root"
)]
pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Trimmed, non-empty value of an optional parameter, or a 400 carrying `message`.
pub(crate) fn require(value: Option<&str>, message: &str) -> Result<String, ApiError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::validation(message))
}

#[cfg(test)]
mod tests;
