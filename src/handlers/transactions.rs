//! # Transactions API Handler

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::IntoParams;

use crate::error::ApiError;
use crate::models::TransactionList;
use crate::server::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TransactionsQuery {
    pub connection_id: Option<String>,
    pub account_id: Option<String>,
}

/// Lists transactions, optionally filtered by connection or account
#[utoipa::path(
    get,
    path = "/api/saltedge/transactions",
    params(TransactionsQuery),
    responses(
        (status = 200, description = "Transactions as returned by Salt Edge", body = TransactionList),
        (status = 500, description = "Upstream or configuration failure", body = ApiError)
    ),
    tag = "transactions"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    query: Result<Query<TransactionsQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let transactions = state
        .upstream
        .list_transactions(query.connection_id.as_deref(), query.account_id.as_deref())
        .await?;
    Ok(Json(transactions))
}
