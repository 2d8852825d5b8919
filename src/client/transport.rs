//! Transport Router: maps a route key to the base URL requests are sent through.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;

/// Public relay that forwards to Salt Edge through a `quest=` query parameter.
pub const DEFAULT_RELAY_A_URL: &str =
    "https://api.codetabs.com/v1/proxy?quest=https://www.saltedge.com/api/v6";

/// Public relay that takes the target URL as its whole query string.
pub const DEFAULT_RELAY_B_URL: &str = "https://corsproxy.io/?https://www.saltedge.com/api/v6";

/// Route a request travels over
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportRoute {
    /// Same-origin proxy service; credentials are injected server-side
    #[default]
    Internal,
    RelayA,
    RelayB,
}

impl TransportRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportRoute::Internal => "internal",
            TransportRoute::RelayA => "relay_a",
            TransportRoute::RelayB => "relay_b",
        }
    }

    /// Relays reach Salt Edge directly, so the caller supplies `App-id` and `Secret`.
    pub fn requires_client_credentials(&self) -> bool {
        !matches!(self, TransportRoute::Internal)
    }

    /// Parse a stored or user-supplied key. Unknown keys select the internal route.
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "relay_a" | "relaya" | "codetabs" => TransportRoute::RelayA,
            "relay_b" | "relayb" | "corsproxy" => TransportRoute::RelayB,
            _ => TransportRoute::Internal,
        }
    }
}

impl fmt::Display for TransportRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportRoute {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_key(s))
    }
}

/// Result of resolving a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTransport {
    pub route: TransportRoute,
    pub base_url: String,
    pub requires_client_credentials: bool,
}

impl ResolvedTransport {
    /// Full request URL. Plain concatenation: relay prefixes carry the target in
    /// their query string and must not be URL-joined.
    pub fn url_for(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

/// Route table built from client configuration
#[derive(Debug, Clone)]
pub struct TransportRouter {
    internal_base_url: String,
    relay_a_url: String,
    relay_b_url: String,
}

impl TransportRouter {
    pub fn new(
        internal_base_url: impl Into<String>,
        relay_a_url: impl Into<String>,
        relay_b_url: impl Into<String>,
    ) -> Self {
        Self {
            internal_base_url: internal_base_url.into().trim_end_matches('/').to_string(),
            relay_a_url: relay_a_url.into(),
            relay_b_url: relay_b_url.into(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            config.internal_base_url.as_str(),
            config.relay_a_url.as_str(),
            config.relay_b_url.as_str(),
        )
    }

    pub fn resolve(&self, route: TransportRoute) -> ResolvedTransport {
        let base_url = match route {
            TransportRoute::Internal => &self.internal_base_url,
            TransportRoute::RelayA => &self.relay_a_url,
            TransportRoute::RelayB => &self.relay_b_url,
        };

        ResolvedTransport {
            route,
            base_url: base_url.clone(),
            requires_client_credentials: route.requires_client_credentials(),
        }
    }

    /// Resolve a raw key, falling back to the internal route for unknown keys.
    pub fn resolve_key(&self, key: &str) -> ResolvedTransport {
        self.resolve(TransportRoute::from_key(key))
    }
}

impl Default for TransportRouter {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}
