//! # Upstream Adapter
//!
//! Server-side pass-through to the Salt Edge API. It attaches the service
//! credentials, wraps write payloads in the data envelope, and classifies the
//! response with the same text-then-JSON sequence the client uses. It never
//! substitutes demo data: every failure is surfaced to the caller.

use std::fmt;

use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use reqwest::{
    Method,
    header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE},
};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, instrument};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::body::{self, BodyFailure};
use crate::config::{AppConfig, ConfigError};

pub mod resources;
pub mod version;

pub use version::{ApiVersion, Capability, ConsentScope};

/// Header names Salt Edge reads the service identity from.
pub const APP_ID_HEADER: &str = "App-id";
pub const SECRET_HEADER: &str = "Secret";

/// Characters of a raw body kept in adapter error messages.
const RAW_EXCERPT_CHARS: usize = 100;

const MISSING_CREDENTIALS: &str = "SERVER_CONFIG_ERROR: Missing SALTEDGE_APP_ID or SALTEDGE_SECRET in environment variables. Salt Edge v6 requires Service API keys, not App API keys.";

/// Failures surfaced by the adapter
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Service credentials are not configured; no request was sent
    #[error("{0}")]
    Configuration(String),
    /// Successful status, but the body is not JSON
    #[error("Malformed JSON from Salt Edge: {excerpt}")]
    MalformedBody { status: u16, excerpt: String },
    /// Non-success status, with the message extracted from the body when possible
    #[error("{message}")]
    Rejection { status: u16, message: String },
    /// No response was received
    #[error("Salt Edge request failed: {0}")]
    Network(#[from] reqwest::Error),
}

impl UpstreamError {
    /// Stable code for logs and the `x-error-code` header
    pub fn code(&self) -> &'static str {
        match self {
            UpstreamError::Configuration(_) => "CONFIGURATION_ERROR",
            UpstreamError::MalformedBody { .. } => "MALFORMED_BODY",
            UpstreamError::Rejection { .. } => "UPSTREAM_REJECTION",
            UpstreamError::Network(_) => "UPSTREAM_UNREACHABLE",
        }
    }
}

/// Salt Edge service identity. Wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ServiceCredentials {
    app_id: String,
    secret: String,
}

impl ServiceCredentials {
    /// Both values must be non-blank.
    pub fn new(app_id: impl Into<String>, secret: impl Into<String>) -> Option<Self> {
        let app_id = app_id.into().trim().to_string();
        let secret = secret.into().trim().to_string();
        if app_id.is_empty() || secret.is_empty() {
            return None;
        }
        Some(Self { app_id, secret })
    }

    pub fn from_config(config: &AppConfig) -> Option<Self> {
        match (&config.saltedge_app_id, &config.saltedge_secret) {
            (Some(app_id), Some(secret)) => Self::new(app_id.as_str(), secret.as_str()),
            _ => None,
        }
    }
}

impl fmt::Debug for ServiceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCredentials")
            .field("app_id", &"[REDACTED]")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Salt Edge operations available to the internal HTTP surface.
///
/// `forward` is the only required method; the resource helpers build their
/// paths and payloads from the implementation's [`ApiVersion`].
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    /// API generation every path is taken from
    fn version(&self) -> ApiVersion;

    /// Whether a request could be authenticated at all
    fn has_credentials(&self) -> bool;

    /// Send one request to `endpoint` (path plus optional query) and parse the reply.
    async fn forward(
        &self,
        endpoint: &str,
        method: Method,
        payload: Option<Value>,
    ) -> Result<Value, UpstreamError>;

    async fn list_customers(&self) -> Result<Value, UpstreamError> {
        let path = self.version().path(Capability::ListCustomers);
        self.forward(path, Method::GET, None).await
    }

    async fn create_customer(&self, identifier: &str) -> Result<Value, UpstreamError> {
        let path = self.version().path(Capability::CreateCustomer);
        let payload = serde_json::json!({ "identifier": identifier });
        self.forward(path, Method::POST, Some(payload)).await
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Value, UpstreamError> {
        let path = resources::customer_path(self.version(), customer_id);
        self.forward(&path, Method::GET, None).await
    }

    async fn create_connect_session(
        &self,
        customer_id: &str,
        return_to: Option<&str>,
    ) -> Result<Value, UpstreamError> {
        let version = self.version();
        let payload = resources::connect_session_payload(
            version,
            customer_id,
            return_to,
            Utc::now().date_naive(),
        );
        self.forward(
            version.path(Capability::CreateConnectSession),
            Method::POST,
            Some(payload),
        )
        .await
    }

    async fn list_accounts(
        &self,
        customer_id: Option<&str>,
        connection_id: Option<&str>,
    ) -> Result<Value, UpstreamError> {
        let path = resources::accounts_path(self.version(), customer_id, connection_id);
        self.forward(&path, Method::GET, None).await
    }

    async fn list_connections(&self, customer_id: &str) -> Result<Value, UpstreamError> {
        let path = resources::connections_path(self.version(), customer_id);
        self.forward(&path, Method::GET, None).await
    }

    async fn list_transactions(
        &self,
        connection_id: Option<&str>,
        account_id: Option<&str>,
    ) -> Result<Value, UpstreamError> {
        let path = resources::transactions_path(self.version(), connection_id, account_id);
        self.forward(&path, Method::GET, None).await
    }
}

/// reqwest-backed adapter bound to one base URL and one API generation
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
    version: ApiVersion,
    credentials: Option<ServiceCredentials>,
}

impl UpstreamClient {
    pub fn new(
        base_url: impl Into<String>,
        version: ApiVersion,
        credentials: Option<ServiceCredentials>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            version,
            credentials,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.upstream_base()?,
            config.api_version()?,
            ServiceCredentials::from_config(config),
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }
}

#[async_trait]
impl UpstreamApi for UpstreamClient {
    fn version(&self) -> ApiVersion {
        self.version
    }

    fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    #[instrument(skip(self, payload), fields(version = %self.version))]
    async fn forward(
        &self,
        endpoint: &str,
        method: Method,
        payload: Option<Value>,
    ) -> Result<Value, UpstreamError> {
        let Some(credentials) = self.credentials.as_ref() else {
            counter!("upstream_requests_total", "outcome" => "unconfigured").increment(1);
            return Err(UpstreamError::Configuration(MISSING_CREDENTIALS.to_string()));
        };

        let url = self.url_for(endpoint);
        debug!(method = %method, url = %url, "Forwarding request to Salt Edge");

        let mut request = self
            .http
            .request(method, &url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header(CACHE_CONTROL, "no-store")
            .header(APP_ID_HEADER, credentials.app_id.as_str())
            .header(SECRET_HEADER, credentials.secret.as_str());

        if let Some(body) = resources::wrap_payload(payload) {
            request = request.body(body.to_string());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                counter!("upstream_requests_total", "outcome" => "unreachable").increment(1);
                return Err(UpstreamError::Network(err));
            }
        };

        let status = response.status().as_u16();
        let raw = response.text().await?;

        let result = match body::parse_response_body(status, &raw) {
            Ok(parsed) => Ok(parsed),
            Err(BodyFailure::Markup { status, raw } | BodyFailure::Malformed { status, raw })
                if !body::is_success(status) =>
            {
                Err(UpstreamError::Rejection {
                    status,
                    message: format!(
                        "Salt Edge API Rejection: {}. Raw response: {}",
                        status,
                        body::excerpt(&raw, RAW_EXCERPT_CHARS)
                    ),
                })
            }
            Err(BodyFailure::Markup { status, raw } | BodyFailure::Malformed { status, raw }) => {
                Err(UpstreamError::MalformedBody {
                    status,
                    excerpt: body::excerpt(&raw, RAW_EXCERPT_CHARS),
                })
            }
            Err(BodyFailure::Rejected { status, body }) => {
                error!(status, response = %body, "Salt Edge API error response");
                Err(UpstreamError::Rejection {
                    status,
                    message: body::error_message(&body)
                        .unwrap_or_else(|| format!("Salt Edge API Rejection: {}", status)),
                })
            }
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(UpstreamError::MalformedBody { .. }) => "malformed",
            Err(_) => "rejected",
        };
        counter!("upstream_requests_total", "outcome" => outcome).increment(1);

        result
    }
}
