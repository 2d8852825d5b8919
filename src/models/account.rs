//! Account records

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Optional bank identifiers attached to an account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AccountExtra {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Account {
    pub id: String,
    pub name: String,
    /// Free-form upstream category such as "checking" or "savings"
    #[serde(default)]
    pub nature: String,
    pub balance: f64,
    /// ISO 4217 code
    pub currency_code: String,
    #[serde(default)]
    pub extra: AccountExtra,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
}

/// `{ "data": [Account] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AccountList {
    #[serde(default)]
    pub data: Vec<Account>,
}
