//! Configuration loading for VerifyGlobal.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `VERIFYGLOBAL_`, producing a typed [`AppConfig`]. The bare Salt Edge
//! variables (`SALTEDGE_APP_ID`, `SALTEDGE_SECRET`, `SALTEDGE_PRIVATE_KEY`)
//! are honored as well; prefixed keys win when both are present.

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::client::transport::{DEFAULT_RELAY_A_URL, DEFAULT_RELAY_B_URL};
use crate::upstream::ApiVersion;

const ENV_PREFIX: &str = "VERIFYGLOBAL_";

/// Bare variable names accepted for the upstream service credentials.
const BARE_SALTEDGE_KEYS: &[&str] = &["SALTEDGE_APP_ID", "SALTEDGE_SECRET", "SALTEDGE_PRIVATE_KEY"];

/// Application configuration derived from `VERIFYGLOBAL_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saltedge_app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saltedge_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saltedge_private_key: Option<String>,
    #[serde(default = "default_saltedge_api_version")]
    pub saltedge_api_version: String,
    /// Overrides the version's default base URL (used by tests and staging relays).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saltedge_api_base: Option<String>,
    #[serde(default)]
    pub client: ClientConfig,
}

/// Settings for the client-side request layer and the `vglobal` CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ClientConfig {
    /// Base URL of the internal proxy, including the `/api/saltedge` prefix.
    ///
    /// Environment variable: `VERIFYGLOBAL_CLIENT_INTERNAL_BASE_URL`
    #[serde(default = "default_internal_base_url")]
    pub internal_base_url: String,

    /// Public relay prefix selected by the `relay_a` route.
    ///
    /// Environment variable: `VERIFYGLOBAL_CLIENT_RELAY_A_URL`
    #[serde(default = "default_relay_a_url")]
    pub relay_a_url: String,

    /// Public relay prefix selected by the `relay_b` route.
    ///
    /// Environment variable: `VERIFYGLOBAL_CLIENT_RELAY_B_URL`
    #[serde(default = "default_relay_b_url")]
    pub relay_b_url: String,

    /// Substitute mock data when a route looks missing (HTML body or connection failure).
    ///
    /// Environment variable: `VERIFYGLOBAL_CLIENT_FALLBACK_ON_ROUTE_MISSING`
    #[serde(default = "default_fallback_on_route_missing")]
    pub fallback_on_route_missing: bool,

    /// Interval between status re-derivations in milliseconds (default: 2000)
    ///
    /// Environment variable: `VERIFYGLOBAL_CLIENT_STATUS_POLL_INTERVAL_MS`
    #[serde(default = "default_status_poll_interval_ms")]
    pub status_poll_interval_ms: u64,

    /// JSON file backing the CLI's persisted flags.
    ///
    /// Environment variable: `VERIFYGLOBAL_CLIENT_STORE_PATH`
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            internal_base_url: default_internal_base_url(),
            relay_a_url: default_relay_a_url(),
            relay_b_url: default_relay_b_url(),
            fallback_on_route_missing: default_fallback_on_route_missing(),
            status_poll_interval_ms: default_status_poll_interval_ms(),
            store_path: default_store_path(),
        }
    }
}

impl ClientConfig {
    /// Validate client configuration bounds
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("CLIENT_INTERNAL_BASE_URL", &self.internal_base_url),
            ("CLIENT_RELAY_A_URL", &self.relay_a_url),
            ("CLIENT_RELAY_B_URL", &self.relay_b_url),
        ] {
            Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
                field: field.to_string(),
                value: value.clone(),
                source,
            })?;
        }

        if !(100..=60_000).contains(&self.status_poll_interval_ms) {
            return Err(ConfigError::InvalidStatusPollInterval {
                value: self.status_poll_interval_ms,
            });
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            saltedge_app_id: None,
            saltedge_secret: None,
            saltedge_private_key: None,
            saltedge_api_version: default_saltedge_api_version(),
            saltedge_api_base: None,
            client: ClientConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Upstream API generation selected for the adapter.
    pub fn api_version(&self) -> Result<ApiVersion, ConfigError> {
        self.saltedge_api_version
            .parse()
            .map_err(|_| ConfigError::InvalidApiVersion {
                value: self.saltedge_api_version.clone(),
            })
    }

    /// Base URL the adapter talks to: the explicit override, else the version default.
    pub fn upstream_base(&self) -> Result<String, ConfigError> {
        match &self.saltedge_api_base {
            Some(base) => Ok(base.trim_end_matches('/').to_string()),
            None => Ok(self.api_version()?.default_base_url().to_string()),
        }
    }

    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if config.saltedge_app_id.is_some() {
            config.saltedge_app_id = Some("[REDACTED]".to_string());
        }
        if config.saltedge_secret.is_some() {
            config.saltedge_secret = Some("[REDACTED]".to_string());
        }
        if config.saltedge_private_key.is_some() {
            config.saltedge_private_key = Some("[REDACTED]".to_string());
        }
        serde_json::to_string_pretty(&config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()
            .map_err(|source| ConfigError::InvalidBindAddr {
                value: self.api_bind_addr.clone(),
                source,
            })?;

        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            return Err(ConfigError::InvalidLogFormat {
                value: self.log_format.clone(),
            });
        }

        self.api_version()?;

        if let Some(ref base) = self.saltedge_api_base {
            Url::parse(base).map_err(|source| ConfigError::InvalidUrl {
                field: "SALTEDGE_API_BASE".to_string(),
                value: base.clone(),
                source,
            })?;
        }

        self.client.validate()?;

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_saltedge_api_version() -> String {
    "v6".to_string()
}

fn default_internal_base_url() -> String {
    "http://127.0.0.1:8080/api/saltedge".to_string()
}

fn default_relay_a_url() -> String {
    DEFAULT_RELAY_A_URL.to_string()
}

fn default_relay_b_url() -> String {
    DEFAULT_RELAY_B_URL.to_string()
}

fn default_fallback_on_route_missing() -> bool {
    true
}

fn default_status_poll_interval_ms() -> u64 {
    2000 // 2 seconds
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".verifyglobal/session.json")
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("log format must be 'json' or 'pretty', got '{value}'")]
    InvalidLogFormat { value: String },
    #[error("unsupported Salt Edge API version '{value}'; expected v5 or v6")]
    InvalidApiVersion { value: String },
    #[error("{field} is not a valid URL '{value}': {source}")]
    InvalidUrl {
        field: String,
        value: String,
        source: url::ParseError,
    },
    #[error("status poll interval must be between 100 and 60000 milliseconds, got {value}")]
    InvalidStatusPollInterval { value: u64 },
    #[error("{field} must be true or false, got '{value}'")]
    InvalidBool { field: String, value: String },
    #[error("{field} must be a whole number, got '{value}'")]
    InvalidNumber { field: String, value: String },
}

pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        for key in BARE_SALTEDGE_KEYS {
            if let Ok(value) = env::var(key) {
                layered.entry(key.to_string()).or_insert(value);
            }
        }
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = layered
            .remove("PROFILE")
            .filter(|v| !v.is_empty())
            .unwrap_or(profile_hint);
        let api_bind_addr = layered
            .remove("API_BIND_ADDR")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_api_bind_addr);
        let log_level = layered
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);
        let log_format = layered
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);

        let saltedge_app_id = layered.remove("SALTEDGE_APP_ID").and_then(non_blank);
        let saltedge_secret = layered.remove("SALTEDGE_SECRET").and_then(non_blank);
        let saltedge_private_key = layered.remove("SALTEDGE_PRIVATE_KEY").and_then(non_blank);
        let saltedge_api_version = layered
            .remove("SALTEDGE_API_VERSION")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_saltedge_api_version);
        let saltedge_api_base = layered.remove("SALTEDGE_API_BASE").and_then(non_blank);

        let client = ClientConfig {
            internal_base_url: layered
                .remove("CLIENT_INTERNAL_BASE_URL")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(default_internal_base_url),
            relay_a_url: layered
                .remove("CLIENT_RELAY_A_URL")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(default_relay_a_url),
            relay_b_url: layered
                .remove("CLIENT_RELAY_B_URL")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(default_relay_b_url),
            fallback_on_route_missing: match layered.remove("CLIENT_FALLBACK_ON_ROUTE_MISSING") {
                Some(value) => parse_bool("CLIENT_FALLBACK_ON_ROUTE_MISSING", &value)?,
                None => default_fallback_on_route_missing(),
            },
            status_poll_interval_ms: match layered
                .remove("CLIENT_STATUS_POLL_INTERVAL_MS")
                .filter(|v| !v.trim().is_empty())
            {
                Some(value) => parse_u64("CLIENT_STATUS_POLL_INTERVAL_MS", &value)?,
                None => default_status_poll_interval_ms(),
            },
            store_path: layered
                .remove("CLIENT_STORE_PATH")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(default_store_path),
        };

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            saltedge_app_id,
            saltedge_secret,
            saltedge_private_key,
            saltedge_api_version,
            saltedge_api_base,
            client,
        };

        config.validate()?;

        Ok(config)
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var("VERIFYGLOBAL_PROFILE")
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        values.insert(stripped.to_string(), value);
                    } else if BARE_SALTEDGE_KEYS.contains(&key.as_str()) {
                        // Prefixed entries from the same layer take precedence.
                        values.entry(key).or_insert(value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_u64(field: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber {
            field: field.to_string(),
            value: value.to_string(),
        })
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            field: field.to_string(),
            value: value.to_string(),
        }),
    }
}
