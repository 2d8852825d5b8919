//! Customer records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A Salt Edge customer. `identifier` is unique upstream; nothing enforces it locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "CustomerRecord")]
pub struct Customer {
    pub id: String,
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Wire shape of a customer. v6 bodies carry `customer_id`, some carry both
/// it and `id`; `id` wins when both are present.
#[derive(Deserialize)]
struct CustomerRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    customer_id: Option<String>,
    identifier: String,
    #[serde(default)]
    secret: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<CustomerRecord> for Customer {
    type Error = String;

    fn try_from(record: CustomerRecord) -> Result<Self, Self::Error> {
        let id = record
            .id
            .or(record.customer_id)
            .ok_or_else(|| "missing field `id`".to_string())?;
        Ok(Self {
            id,
            identifier: record.identifier,
            secret: record.secret,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// `{ "data": [Customer] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CustomerList {
    #[serde(default)]
    pub data: Vec<Customer>,
}

/// `{ "data": Customer }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CustomerEnvelope {
    pub data: Customer,
}
