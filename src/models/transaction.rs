//! Transaction records

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    pub id: String,
    /// Signed amount; debits are negative
    pub amount: f64,
    pub currency_code: String,
    #[serde(default)]
    pub description: String,
    pub made_on: NaiveDate,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub category: String,
}

/// `{ "data": [Transaction] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TransactionList {
    #[serde(default)]
    pub data: Vec<Transaction>,
}
