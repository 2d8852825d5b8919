//! # Resilient client
//!
//! The request layer the dashboard sits on: a persisted flag store, a route
//! table over the internal proxy and two public relays, an executor that
//! classifies every failure and may substitute demo data, and the status
//! derivation shown to the operator.

use thiserror::Error;

pub mod executor;
pub mod mock;
pub mod service;
pub mod status;
pub mod store;
pub mod transport;

pub use executor::{FallbackPolicy, RequestExecutor, RequestOptions};
pub use service::{ConnectivityReport, VerifyGlobalService};
pub use status::{ConnectionStatus, StatusMonitor, current_status, derive_status};
pub use store::{CredentialStore, JsonFileStore, KeyValueStore, MemoryStore};
pub use transport::{ResolvedTransport, TransportRoute, TransportRouter};

/// Failures surfaced by the client request layer.
///
/// Classification happens where the failure is detected; callers match on
/// variants, never on message text.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Credentials needed for the selected route are absent
    #[error("{0}")]
    Configuration(String),
    /// The route answered with markup instead of JSON
    #[error("SERVER_ERROR: Received HTML instead of JSON (status {status}). The proxy or route may be misconfigured.")]
    TransportMarkup { status: u16 },
    /// Body was neither JSON nor markup; `excerpt` holds at most 10 characters
    #[error("PARSE_ERROR: Response was not valid JSON. Position 0: {excerpt}...")]
    MalformedBody { status: u16, excerpt: String },
    /// Non-success status with a parseable body
    #[error("{message}")]
    UpstreamRejection { status: u16, message: String },
    /// A required parameter was missing before anything was sent
    #[error("{0}")]
    Validation(String),
    /// No response was received
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),
}

impl ClientError {
    /// Failures that look like the route is not deployed or not reachable.
    pub fn is_route_missing(&self) -> bool {
        matches!(
            self,
            ClientError::TransportMarkup { .. } | ClientError::Network(_)
        )
    }

    /// HTTP status that produced the failure, when there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::TransportMarkup { status }
            | ClientError::MalformedBody { status, .. }
            | ClientError::UpstreamRejection { status, .. } => Some(*status),
            ClientError::Network(err) => err.status().map(|s| s.as_u16()),
            ClientError::Configuration(_) | ClientError::Validation(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_missing_classification() {
        assert!(ClientError::TransportMarkup { status: 404 }.is_route_missing());
        assert!(
            !ClientError::UpstreamRejection {
                status: 401,
                message: "bad".to_string()
            }
            .is_route_missing()
        );
        assert!(!ClientError::Configuration("x".to_string()).is_route_missing());
    }

    #[test]
    fn test_rejection_displays_upstream_message() {
        let err = ClientError::UpstreamRejection {
            status: 402,
            message: "quota exceeded".to_string(),
        };
        assert_eq!(err.to_string(), "quota exceeded");
        assert_eq!(err.status(), Some(402));
    }
}
