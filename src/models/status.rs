//! Credential status document served at `/status`

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Which credentials are configured, never the values themselves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StatusReport {
    /// App ID present
    pub app_id: bool,
    #[serde(default)]
    pub app_id_masked: Option<String>,
    /// Secret present
    pub secret: bool,
    #[serde(default)]
    pub secret_masked: Option<String>,
    /// A real private key is configured (placeholder values do not count)
    pub private_key: bool,
    /// No private key, so the upstream account runs in test mode
    pub test_mode: bool,
    pub environment: String,
    pub api_version: String,
    /// `live` or `unconfigured` from the proxy; `proxy` when built on the client for a relay
    pub mode: String,
}

impl StatusReport {
    pub fn from_credentials(
        app_id: &str,
        secret: &str,
        private_key: Option<&str>,
        environment: impl Into<String>,
        api_version: impl Into<String>,
        mode: impl Into<String>,
    ) -> Self {
        let private_key = private_key
            .map(str::trim)
            .is_some_and(|key| !key.is_empty() && !key.contains("your_key_here"));

        Self {
            app_id: !app_id.is_empty(),
            app_id_masked: (!app_id.is_empty()).then(|| mask_credential(app_id)),
            secret: !secret.is_empty(),
            secret_masked: (!secret.is_empty()).then(|| mask_credential(secret)),
            private_key,
            test_mode: !private_key,
            environment: environment.into(),
            api_version: api_version.into(),
            mode: mode.into(),
        }
    }
}

/// First and last four characters for values longer than eight, else `****`.
pub fn mask_credential(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "****".to_string()
    }
}
