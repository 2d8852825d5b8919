//! # Customers API Handlers

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use utoipa::ToSchema;

use super::require;
use crate::error::ApiError;
use crate::models::{CustomerEnvelope, CustomerList};
use crate::server::AppState;

/// Body for creating a customer
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCustomerRequest {
    /// Unique identifier upstream, typically an email address
    pub identifier: Option<String>,
}

/// Lists customers visible to the configured service credentials
#[utoipa::path(
    get,
    path = "/api/saltedge/customers",
    responses(
        (status = 200, description = "Customers as returned by Salt Edge", body = CustomerList),
        (status = 500, description = "Upstream or configuration failure", body = ApiError)
    ),
    tag = "customers"
)]
pub async fn list_customers(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.upstream.list_customers().await?))
}

/// Creates a customer
#[utoipa::path(
    post,
    path = "/api/saltedge/customers",
    request_body = CreateCustomerRequest,
    responses(
        (status = 200, description = "Created customer as returned by Salt Edge", body = CustomerEnvelope),
        (status = 400, description = "identifier is missing", body = ApiError),
        (status = 500, description = "Upstream or configuration failure", body = ApiError)
    ),
    tag = "customers"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    payload: Result<Json<CreateCustomerRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    let identifier = require(request.identifier.as_deref(), "identifier is required")?;

    info!("Creating Salt Edge customer");
    Ok(Json(state.upstream.create_customer(&identifier).await?))
}
