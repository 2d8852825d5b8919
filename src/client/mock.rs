//! Deterministic demo payloads, served in demo mode and when a route looks missing.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{Value, json};

use crate::models::{
    Account, AccountExtra, AccountList, ConnectSession, ConnectSessionEnvelope, Connection,
    ConnectionList, ConnectionState, Customer, CustomerList, Transaction, TransactionList,
};

pub const DEMO_CUSTOMER_ID: &str = "demo_user_v6";
pub const DEMO_ACCOUNT_ID: &str = "acc_demo_1";
pub const DEMO_CONNECTION_ID: &str = "conn_demo_1";

/// Resource a request endpoint refers to, ignoring its query string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockResource {
    Customers,
    ConnectSession,
    Accounts,
    Connections,
    Transactions,
    Status,
    Other,
}

impl MockResource {
    pub fn for_endpoint(endpoint: &str) -> Self {
        let path = endpoint.split('?').next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            ["connect"] | ["connections", "connect"] | ["connect_sessions", ..] => {
                MockResource::ConnectSession
            }
            ["customers", ..] => MockResource::Customers,
            ["accounts", ..] => MockResource::Accounts,
            ["connections", ..] => MockResource::Connections,
            ["transactions", ..] => MockResource::Transactions,
            ["status", ..] => MockResource::Status,
            _ => MockResource::Other,
        }
    }
}

/// Demo payload for `endpoint`. Same input, same output.
pub fn mock_response(endpoint: &str) -> Value {
    let payload = match MockResource::for_endpoint(endpoint) {
        MockResource::Customers => serde_json::to_value(demo_customers()),
        MockResource::ConnectSession => serde_json::to_value(demo_connect_session()),
        MockResource::Accounts => serde_json::to_value(demo_accounts()),
        MockResource::Connections => serde_json::to_value(demo_connections()),
        MockResource::Transactions => serde_json::to_value(demo_transactions()),
        MockResource::Status => Ok(demo_status()),
        MockResource::Other => Ok(json!({ "data": [] })),
    };

    payload.unwrap_or_else(|_| json!({ "data": [] }))
}

fn demo_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

fn demo_date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, day).unwrap_or_default()
}

pub fn demo_customers() -> CustomerList {
    CustomerList {
        data: vec![Customer {
            id: DEMO_CUSTOMER_ID.to_string(),
            identifier: "demo@verifyglobal.com".to_string(),
            secret: None,
            created_at: Some(demo_timestamp()),
            updated_at: Some(demo_timestamp()),
        }],
    }
}

pub fn demo_connect_session() -> ConnectSessionEnvelope {
    ConnectSessionEnvelope {
        data: ConnectSession {
            expires_at: demo_timestamp(),
            connect_url: "https://www.saltedge.com/connect?token=demo".to_string(),
        },
    }
}

pub fn demo_accounts() -> AccountList {
    AccountList {
        data: vec![
            Account {
                id: DEMO_ACCOUNT_ID.to_string(),
                name: "Demo Checking".to_string(),
                nature: "checking".to_string(),
                balance: 5000.0,
                currency_code: "USD".to_string(),
                extra: AccountExtra {
                    account_number: Some("12345678".to_string()),
                    iban: None,
                    sort_code: None,
                },
                connection_id: Some(DEMO_CONNECTION_ID.to_string()),
            },
            Account {
                id: "acc_demo_2".to_string(),
                name: "Demo Savings".to_string(),
                nature: "savings".to_string(),
                balance: 12500.5,
                currency_code: "EUR".to_string(),
                extra: AccountExtra {
                    account_number: None,
                    iban: Some("DE89370400440532013000".to_string()),
                    sort_code: None,
                },
                connection_id: Some(DEMO_CONNECTION_ID.to_string()),
            },
        ],
    }
}

pub fn demo_connections() -> ConnectionList {
    ConnectionList {
        data: vec![Connection {
            id: DEMO_CONNECTION_ID.to_string(),
            customer_id: DEMO_CUSTOMER_ID.to_string(),
            provider_id: "fake_oauth_client_xf".to_string(),
            provider_name: "Fake Bank".to_string(),
            status: ConnectionState::Active,
            last_success_at: Some(demo_timestamp()),
            created_at: Some(demo_timestamp()),
        }],
    }
}

pub fn demo_transactions() -> TransactionList {
    TransactionList {
        data: vec![
            Transaction {
                id: "txn_demo_1".to_string(),
                amount: -42.5,
                currency_code: "USD".to_string(),
                description: "Coffee Roasters".to_string(),
                made_on: demo_date(3),
                status: "posted".to_string(),
                category: "food_and_dining".to_string(),
            },
            Transaction {
                id: "txn_demo_2".to_string(),
                amount: 2500.0,
                currency_code: "USD".to_string(),
                description: "Payroll".to_string(),
                made_on: demo_date(5),
                status: "posted".to_string(),
                category: "income".to_string(),
            },
        ],
    }
}

/// Status document mirroring the internal `/status` shape in demo form
pub fn demo_status() -> Value {
    json!({
        "app_id": false,
        "app_id_masked": null,
        "secret": false,
        "secret_masked": null,
        "private_key": false,
        "test_mode": true,
        "environment": "demo",
        "api_version": "v6",
        "mode": "shadow",
    })
}
