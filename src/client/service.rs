//! Typed operations over the executor, one per dashboard call.
//!
//! On the internal route the proxy's own paths are used. Relays reach Salt
//! Edge directly, so there the upstream paths from the version table are
//! used and write bodies are wrapped in the data envelope here.

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use super::{
    ClientError,
    executor::{FallbackPolicy, RequestExecutor, RequestOptions},
    status::{ConnectionStatus, current_status, derive_status},
    store::CredentialStore,
    transport::TransportRoute,
};
use crate::config::{AppConfig, ConfigError};
use crate::models::{Customer, StatusReport};
use crate::upstream::{ApiVersion, Capability, resources};

/// Endpoint the connectivity test reads
pub const CONNECTIVITY_ENDPOINT: &str = "/customers?limit=1";

/// Outcome of the connectivity test
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConnectivityReport {
    /// Real data came back over `route`
    Verified { route: TransportRoute },
    /// Demo mode answered; nothing reached the network
    Obstructed,
    /// The upstream refused the request (credentials, quota, API errors)
    Rejected { status: u16, message: String },
    /// Credentials are missing on the client or on the proxy
    Misconfigured { message: String },
    /// Nothing usable came back from the route
    Unreachable { message: String },
}

impl ConnectivityReport {
    pub fn is_verified(&self) -> bool {
        matches!(self, ConnectivityReport::Verified { .. })
    }

    /// The route is broken; demo-mode results are not failures.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ConnectivityReport::Rejected { .. }
                | ConnectivityReport::Misconfigured { .. }
                | ConnectivityReport::Unreachable { .. }
        )
    }
}

#[derive(Clone)]
pub struct VerifyGlobalService {
    executor: RequestExecutor,
    version: ApiVersion,
}

impl VerifyGlobalService {
    pub fn new(executor: RequestExecutor, version: ApiVersion) -> Self {
        Self { executor, version }
    }

    pub fn from_config(config: &AppConfig, store: CredentialStore) -> Result<Self, ConfigError> {
        Ok(Self::new(
            RequestExecutor::from_config(&config.client, store),
            config.api_version()?,
        ))
    }

    pub fn store(&self) -> &CredentialStore {
        self.executor.store()
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        current_status(self.store())
    }

    fn on_relay(&self) -> bool {
        self.store().active_route() != TransportRoute::Internal
    }

    fn upstream_post(&self, capability: Capability, payload: Value) -> (String, RequestOptions) {
        let body = resources::wrap_payload(Some(payload)).unwrap_or(Value::Null);
        (
            self.version.path(capability).to_string(),
            RequestOptions::post(body),
        )
    }

    /// Credential status. Relays have no `/status`, so it is built from the store.
    pub async fn get_status(&self) -> Result<Value, ClientError> {
        let store = self.store();
        if self.on_relay() && !store.demo_mode() {
            let report = StatusReport::from_credentials(
                &store.app_id(),
                &store.secret(),
                None,
                "client",
                self.version.as_str(),
                ConnectionStatus::Proxy.as_str(),
            );
            return Ok(json!(report));
        }
        self.executor.request("/status", RequestOptions::get()).await
    }

    pub async fn get_customers(&self) -> Result<Value, ClientError> {
        let endpoint = if self.on_relay() {
            self.version.path(Capability::ListCustomers)
        } else {
            "/customers"
        };
        self.executor.request(endpoint, RequestOptions::get()).await
    }

    pub async fn create_customer(&self, identifier: &str) -> Result<Value, ClientError> {
        if identifier.trim().is_empty() {
            return Err(ClientError::Validation("identifier is required".to_string()));
        }

        let payload = json!({ "identifier": identifier });
        let (endpoint, options) = if self.on_relay() {
            self.upstream_post(Capability::CreateCustomer, payload)
        } else {
            ("/customers".to_string(), RequestOptions::post(payload))
        };
        self.executor.request(&endpoint, options).await
    }

    pub async fn create_connect_session(
        &self,
        customer_id: &str,
        return_to: Option<&str>,
    ) -> Result<Value, ClientError> {
        if customer_id.trim().is_empty() {
            return Err(ClientError::Validation("customer_id is required".to_string()));
        }

        let (endpoint, options) = if self.on_relay() {
            let payload = resources::connect_session_payload(
                self.version,
                customer_id,
                return_to,
                chrono::Utc::now().date_naive(),
            );
            self.upstream_post(Capability::CreateConnectSession, payload)
        } else {
            let mut payload = json!({ "customer_id": customer_id });
            if let Some(return_to) = return_to {
                payload["return_to"] = json!(return_to);
            }
            ("/connect".to_string(), RequestOptions::post(payload))
        };
        self.executor.request(&endpoint, options).await
    }

    pub async fn get_accounts(&self, customer_id: Option<&str>) -> Result<Value, ClientError> {
        let endpoint = if self.on_relay() {
            resources::accounts_path(self.version, customer_id, None)
        } else {
            format!(
                "/accounts{}",
                resources::query_string(&[("customer_id", customer_id)])
            )
        };
        self.executor.request(&endpoint, RequestOptions::get()).await
    }

    pub async fn get_connections(&self, customer_id: Option<&str>) -> Result<Value, ClientError> {
        let endpoint = if self.on_relay() {
            format!(
                "{}{}",
                self.version.path(Capability::ListConnections),
                resources::query_string(&[("customer_id", customer_id)])
            )
        } else {
            format!(
                "/connections{}",
                resources::query_string(&[("customer_id", customer_id)])
            )
        };
        self.executor.request(&endpoint, RequestOptions::get()).await
    }

    pub async fn get_transactions(
        &self,
        connection_id: Option<&str>,
    ) -> Result<Value, ClientError> {
        let endpoint = if self.on_relay() {
            resources::transactions_path(self.version, connection_id, None)
        } else {
            format!(
                "/transactions{}",
                resources::query_string(&[("connection_id", connection_id)])
            )
        };
        self.executor.request(&endpoint, RequestOptions::get()).await
    }

    /// Find a customer in the current list and remember it as the active one.
    pub async fn select_customer(&self, customer_id: &str) -> Result<Option<Customer>, ClientError> {
        let listing = self.get_customers().await?;
        let selected = listing
            .get("data")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|entry| match serde_json::from_value::<Customer>(entry.clone()) {
                Ok(customer) => Some(customer),
                Err(err) => {
                    warn!(error = %err, "Skipping customer entry that does not decode");
                    None
                }
            })
            .find(|customer| customer.id == customer_id);

        match &selected {
            Some(customer) => self.store().set_active_customer(Some(customer)),
            None => warn!(customer_id, "Customer not found in current listing"),
        }
        Ok(selected)
    }

    /// Deep connectivity test.
    ///
    /// Runs without mock fallback so a missing route reports as unreachable
    /// instead of passing on synthesized data. The outcome is recorded in the
    /// store: a failure shows as `error` status until a later test passes or
    /// the configuration changes.
    #[instrument(skip(self))]
    pub async fn test_connection(&self) -> ConnectivityReport {
        let store = self.store();
        let status = derive_status(store.demo_mode(), store.active_route());
        let route = store.active_route();
        let executor = self.executor.with_policy(FallbackPolicy {
            fallback_on_route_missing: false,
        });

        let report = match executor.request(CONNECTIVITY_ENDPOINT, RequestOptions::get()).await {
            Ok(_) if status == ConnectionStatus::Shadow => ConnectivityReport::Obstructed,
            Ok(_) => ConnectivityReport::Verified { route },
            Err(ClientError::UpstreamRejection { status, message }) => {
                ConnectivityReport::Rejected { status, message }
            }
            Err(ClientError::Configuration(message)) => {
                ConnectivityReport::Misconfigured { message }
            }
            Err(err) => ConnectivityReport::Unreachable {
                message: err.to_string(),
            },
        };

        store.set_connectivity_failed(report.is_failure());
        info!(report = ?report, "Connectivity test finished");
        report
    }
}
