//! Resilient Request Executor
//!
//! Sends one request over the active route, reads the body as text before
//! parsing, classifies failures, and substitutes demo data when the route
//! looks missing and the fallback policy allows it.

use metrics::counter;
use reqwest::{
    Method,
    header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use super::{
    ClientError,
    mock::mock_response,
    store::CredentialStore,
    transport::{TransportRoute, TransportRouter},
};
use crate::body::{self, BodyFailure};
use crate::config::ClientConfig;
use crate::error::ERROR_CODE_HEADER;
use crate::upstream::{APP_ID_HEADER, SECRET_HEADER};

/// Characters of an unparseable body kept in the error itself.
const MALFORMED_EXCERPT_CHARS: usize = 10;
/// Characters of an unparseable body written to the log.
const LOGGED_EXCERPT_CHARS: usize = 200;

/// When failures are masked with demo data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackPolicy {
    /// Markup bodies and connection failures return mock data instead of an error
    pub fallback_on_route_missing: bool,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            fallback_on_route_missing: true,
        }
    }
}

/// Per-request settings
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    /// Sent as-is; the executor never wraps bodies
    pub body: Option<Value>,
    /// Merged over the default headers
    pub headers: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: None,
            headers: Vec::new(),
        }
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Clone)]
pub struct RequestExecutor {
    http: reqwest::Client,
    router: TransportRouter,
    store: CredentialStore,
    policy: FallbackPolicy,
}

impl RequestExecutor {
    pub fn new(router: TransportRouter, store: CredentialStore, policy: FallbackPolicy) -> Self {
        Self {
            http: reqwest::Client::new(),
            router,
            store,
            policy,
        }
    }

    pub fn from_config(config: &ClientConfig, store: CredentialStore) -> Self {
        Self::new(
            TransportRouter::from_config(config),
            store,
            FallbackPolicy {
                fallback_on_route_missing: config.fallback_on_route_missing,
            },
        )
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn router(&self) -> &TransportRouter {
        &self.router
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    /// Same executor with a different fallback policy
    pub fn with_policy(&self, policy: FallbackPolicy) -> Self {
        Self {
            policy,
            ..self.clone()
        }
    }

    /// Issue `endpoint` over the route selected in the store.
    pub async fn request(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Value, ClientError> {
        self.request_via(self.store.active_route(), endpoint, options)
            .await
    }

    /// Issue `endpoint` over an explicit route.
    #[instrument(skip(self, options), fields(route = %route, method = %options.method))]
    pub async fn request_via(
        &self,
        route: TransportRoute,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Value, ClientError> {
        if self.store.demo_mode() {
            debug!(endpoint, "Demo mode active; serving mock data");
            return Ok(mock_response(endpoint));
        }

        match self.send(route, endpoint, options).await {
            Ok(value) => Ok(value),
            Err(err) if err.is_route_missing() && self.policy.fallback_on_route_missing => {
                warn!(endpoint, error = %err, "Route unavailable; falling back to mock data");
                counter!("client_mock_fallback_total", "route" => route.as_str()).increment(1);
                Ok(mock_response(endpoint))
            }
            Err(err) => {
                error!(endpoint, error = %err, "API request failed");
                Err(err)
            }
        }
    }

    async fn send(
        &self,
        route: TransportRoute,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Value, ClientError> {
        let transport = self.router.resolve(route);
        let url = transport.url_for(endpoint);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ClientError::Validation(format!("invalid header name '{}'", name)))?;
            let value = HeaderValue::from_str(value).map_err(|_| {
                ClientError::Validation(format!("invalid value for header '{}'", name))
            })?;
            headers.insert(name, value);
        }

        if transport.requires_client_credentials {
            let app_id = self.store.app_id();
            let secret = self.store.secret();
            if app_id.trim().is_empty() || secret.trim().is_empty() {
                return Err(ClientError::Configuration(format!(
                    "Route {} calls Salt Edge directly and needs an App ID and Secret",
                    route
                )));
            }
            for (name, value) in [(APP_ID_HEADER, app_id), (SECRET_HEADER, secret)] {
                let (name, value) = credential_header(name, &value)?;
                headers.insert(name, value);
            }
        }

        debug!(url = %url, "Sending API request");
        let mut request = self.http.request(options.method, &url).headers(headers);
        if let Some(body) = options.body {
            request = request.body(body.to_string());
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let error_code = response
            .headers()
            .get(ERROR_CODE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let raw = response.text().await?;

        match body::parse_response_body(status, &raw) {
            Ok(value) => Ok(value),
            Err(BodyFailure::Markup { status, raw }) => {
                error!(
                    status,
                    body = %body::excerpt(&raw, LOGGED_EXCERPT_CHARS),
                    "Received markup instead of JSON"
                );
                Err(ClientError::TransportMarkup { status })
            }
            Err(BodyFailure::Malformed { status, raw }) => {
                error!(
                    status,
                    body = %body::excerpt(&raw, LOGGED_EXCERPT_CHARS),
                    "Malformed API response received"
                );
                Err(ClientError::MalformedBody {
                    status,
                    excerpt: body::excerpt(&raw, MALFORMED_EXCERPT_CHARS),
                })
            }
            Err(BodyFailure::Rejected { status, body }) => {
                let message = body::error_message(&body)
                    .unwrap_or_else(|| format!("API Error {}", status));
                // The internal proxy flags missing server credentials by code.
                if error_code.as_deref() == Some("CONFIGURATION_ERROR") {
                    return Err(ClientError::Configuration(message));
                }
                Err(ClientError::UpstreamRejection { status, message })
            }
        }
    }
}

fn credential_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), ClientError> {
    let invalid =
        || ClientError::Configuration(format!("stored {} is not a valid header value", name));
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
    let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
    Ok((header_name, header_value))
}
