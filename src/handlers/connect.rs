//! # Connect Session Handler
//!
//! Starts the bank-linking flow for a customer.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use super::require;
use crate::error::ApiError;
use crate::models::ConnectSessionEnvelope;
use crate::server::AppState;

/// Body for creating a connect session
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConnectRequest {
    pub customer_id: Option<String>,
    /// Where the upstream widget redirects when done (default: http://localhost:3000)
    pub return_to: Option<String>,
}

/// Creates a connect session and returns its redirect URL
#[utoipa::path(
    post,
    path = "/api/saltedge/connect",
    request_body = ConnectRequest,
    responses(
        (status = 200, description = "Connect session", body = ConnectSessionEnvelope),
        (status = 400, description = "customer_id is missing", body = ApiError),
        (status = 500, description = "Upstream or configuration failure", body = ApiError)
    ),
    tag = "connect"
)]
pub async fn create_connect_session(
    State(state): State<AppState>,
    payload: Result<Json<ConnectRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    let customer_id = require(request.customer_id.as_deref(), "customer_id is required")?;

    let session = state
        .upstream
        .create_connect_session(&customer_id, request.return_to.as_deref())
        .await?;
    Ok(Json(session))
}
