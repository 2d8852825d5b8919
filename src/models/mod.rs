//! # Data Models
//!
//! Records exchanged with the Salt Edge API. None of them are owned here: ids,
//! balances and statuses are whatever the upstream says. The executor and the
//! adapter move `serde_json::Value` around; these types serve the typed client
//! facade, the demo payloads and the OpenAPI document.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod account;
pub mod connect_session;
pub mod connection;
pub mod customer;
pub mod status;
pub mod transaction;

pub use account::{Account, AccountExtra, AccountList};
pub use connect_session::{ConnectSession, ConnectSessionEnvelope};
pub use connection::{Connection, ConnectionList, ConnectionState};
pub use customer::{Customer, CustomerEnvelope, CustomerList};
pub use status::{StatusReport, mask_credential};
pub use transaction::{Transaction, TransactionList};

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "verifyglobal".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
