//! Connect sessions: short-lived redirect targets for linking a bank

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConnectSession {
    pub expires_at: DateTime<Utc>,
    pub connect_url: String,
}

/// `{ "data": ConnectSession }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConnectSessionEnvelope {
    pub data: ConnectSession,
}
