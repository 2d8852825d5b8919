//! # Accounts API Handler

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::IntoParams;

use crate::error::ApiError;
use crate::models::AccountList;
use crate::server::AppState;

/// Optional account filters
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AccountsQuery {
    pub customer_id: Option<String>,
    pub connection_id: Option<String>,
}

/// Lists accounts, optionally filtered by customer or connection
#[utoipa::path(
    get,
    path = "/api/saltedge/accounts",
    params(AccountsQuery),
    responses(
        (status = 200, description = "Accounts as returned by Salt Edge", body = AccountList),
        (status = 500, description = "Upstream or configuration failure", body = ApiError)
    ),
    tag = "accounts"
)]
pub async fn list_accounts(
    State(state): State<AppState>,
    query: Result<Query<AccountsQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let accounts = state
        .upstream
        .list_accounts(query.customer_id.as_deref(), query.connection_id.as_deref())
        .await?;
    Ok(Json(accounts))
}
