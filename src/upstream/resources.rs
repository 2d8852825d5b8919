//! Request builders for the Salt Edge resources the dashboard uses.

use chrono::{Duration, NaiveDate};
use serde_json::{Value, json};
use url::form_urlencoded;

use super::version::{ApiVersion, Capability, ConsentScope};

/// Redirect target used when the caller does not supply one
pub const DEFAULT_RETURN_TO: &str = "http://localhost:3000";

/// How far back a new connection may fetch history
pub const CONSENT_WINDOW_DAYS: i64 = 90;

/// Wrap a write payload in the `{ "data": ... }` envelope Salt Edge expects.
///
/// Absent, `null` and empty-object payloads produce no body. Objects that
/// already carry a `data` key are sent unchanged.
pub fn wrap_payload(payload: Option<Value>) -> Option<Value> {
    match payload {
        None | Some(Value::Null) => None,
        Some(Value::Object(object)) if object.is_empty() => None,
        Some(Value::Object(object)) if object.contains_key("data") => Some(Value::Object(object)),
        Some(other) => Some(json!({ "data": other })),
    }
}

/// Render `?k=v&...` for the pairs that have a non-empty value; empty string otherwise.
pub fn query_string(pairs: &[(&str, Option<&str>)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for &(key, value) in pairs {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            serializer.append_pair(key, value);
            any = true;
        }
    }

    if any {
        format!("?{}", serializer.finish())
    } else {
        String::new()
    }
}

/// Path of a single customer
pub fn customer_path(version: ApiVersion, customer_id: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(customer_id.as_bytes()).collect();
    format!("{}/{}", version.path(Capability::GetCustomer), encoded)
}

pub fn accounts_path(
    version: ApiVersion,
    customer_id: Option<&str>,
    connection_id: Option<&str>,
) -> String {
    format!(
        "{}{}",
        version.path(Capability::ListAccounts),
        query_string(&[("customer_id", customer_id), ("connection_id", connection_id)])
    )
}

pub fn connections_path(version: ApiVersion, customer_id: &str) -> String {
    format!(
        "{}{}",
        version.path(Capability::ListConnections),
        query_string(&[("customer_id", Some(customer_id))])
    )
}

pub fn transactions_path(
    version: ApiVersion,
    connection_id: Option<&str>,
    account_id: Option<&str>,
) -> String {
    format!(
        "{}{}",
        version.path(Capability::ListTransactions),
        query_string(&[("connection_id", connection_id), ("account_id", account_id)])
    )
}

/// Body for a new connect session, before envelope wrapping.
pub fn connect_session_payload(
    version: ApiVersion,
    customer_id: &str,
    return_to: Option<&str>,
    today: NaiveDate,
) -> Value {
    let from_date = today - Duration::days(CONSENT_WINDOW_DAYS);
    json!({
        "customer_id": customer_id,
        "consent": {
            "scopes": [
                version.consent_scope(ConsentScope::Accounts),
                version.consent_scope(ConsentScope::Transactions),
            ],
            "from_date": from_date.format("%Y-%m-%d").to_string(),
        },
        "attempt": {
            "return_to": return_to.filter(|r| !r.is_empty()).unwrap_or(DEFAULT_RETURN_TO),
        },
    })
}
