//! # Connections API Handler

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::IntoParams;

use super::require;
use crate::error::ApiError;
use crate::models::ConnectionList;
use crate::server::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ConnectionsQuery {
    /// Required; the upstream has no global connection listing
    pub customer_id: Option<String>,
}

/// Lists bank connections of one customer
#[utoipa::path(
    get,
    path = "/api/saltedge/connections",
    params(ConnectionsQuery),
    responses(
        (status = 200, description = "Connections as returned by Salt Edge", body = ConnectionList),
        (status = 400, description = "customer_id is missing", body = ApiError),
        (status = 500, description = "Upstream or configuration failure", body = ApiError)
    ),
    tag = "connections"
)]
pub async fn list_connections(
    State(state): State<AppState>,
    query: Result<Query<ConnectionsQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let customer_id = require(query.customer_id.as_deref(), "customer_id is required")?;

    Ok(Json(state.upstream.list_connections(&customer_id).await?))
}
