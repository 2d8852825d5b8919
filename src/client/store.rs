//! Credential & Mode Store
//!
//! A handful of string flags persisted through an injected [`KeyValueStore`].
//! Writes are fire-and-forget: a failing backend is logged, never surfaced.

use std::{
    collections::BTreeMap,
    fs,
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, RwLock},
};

use thiserror::Error;
use tracing::warn;

use super::transport::TransportRoute;
use crate::models::Customer;

pub const APP_ID_KEY: &str = "vglobal_app_id";
pub const SECRET_KEY: &str = "vglobal_secret";
pub const SHADOW_MODE_KEY: &str = "vglobal_shadow_mode";
pub const PROXY_KEY: &str = "vglobal_proxy";
pub const ACTIVE_CUSTOMER_KEY: &str = "vglobal_active_customer";
pub const CONNECTIVITY_ERROR_KEY: &str = "vglobal_connectivity_error";

const ALL_KEYS: [&str; 6] = [
    APP_ID_KEY,
    SECRET_KEY,
    SHADOW_MODE_KEY,
    PROXY_KEY,
    ACTIVE_CUSTOMER_KEY,
    CONNECTIVITY_ERROR_KEY,
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed for {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("store file {path} is not a JSON object: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("store lock poisoned")]
    Poisoned,
}

/// Persistence seam. Each call is atomic per key.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-process store, used by tests and by embedders without persistence
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.read().map_err(|_| StoreError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.write().map_err(|_| StoreError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.values.write().map_err(|_| StoreError::Poisoned)?;
        values.remove(key);
        Ok(())
    }
}

/// A JSON object on disk, rewritten in full on every change
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let rendered = serde_json::to_string_pretty(values).map_err(|source| {
            StoreError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, rendered).map_err(io_err)
    }

    fn update<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut values = self.read_all()?;
        change(&mut values);
        self.write_all(&values)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.update(|values| {
            values.remove(key);
        })
    }
}

/// Typed accessors over the persisted flags.
///
/// A detached store (no backend) answers every read with its default and
/// drops every write.
#[derive(Clone, Default)]
pub struct CredentialStore {
    backend: Option<Arc<dyn KeyValueStore>>,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn detached() -> Self {
        Self { backend: None }
    }

    pub fn is_detached(&self) -> bool {
        self.backend.is_none()
    }

    fn read(&self, key: &str) -> Option<String> {
        let backend = self.backend.as_ref()?;
        match backend.get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "Failed to read from credential store");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Some(backend) = &self.backend
            && let Err(err) = backend.set(key, value)
        {
            warn!(key, error = %err, "Failed to write to credential store");
        }
    }

    fn delete(&self, key: &str) {
        if let Some(backend) = &self.backend
            && let Err(err) = backend.remove(key)
        {
            warn!(key, error = %err, "Failed to remove from credential store");
        }
    }

    pub fn app_id(&self) -> String {
        self.read(APP_ID_KEY).unwrap_or_default()
    }

    pub fn secret(&self) -> String {
        self.read(SECRET_KEY).unwrap_or_default()
    }

    pub fn set_credentials(&self, app_id: &str, secret: &str) {
        self.write(APP_ID_KEY, app_id);
        self.write(SECRET_KEY, secret);
        self.set_connectivity_failed(false);
    }

    pub fn clear_credentials(&self) {
        self.delete(APP_ID_KEY);
        self.delete(SECRET_KEY);
        self.set_connectivity_failed(false);
    }

    pub fn demo_mode(&self) -> bool {
        self.read(SHADOW_MODE_KEY).as_deref() == Some("true")
    }

    pub fn set_demo_mode(&self, enabled: bool) {
        self.write(SHADOW_MODE_KEY, if enabled { "true" } else { "false" });
        self.set_connectivity_failed(false);
    }

    pub fn active_route(&self) -> TransportRoute {
        self.read(PROXY_KEY)
            .map(|key| TransportRoute::from_key(&key))
            .unwrap_or_default()
    }

    pub fn set_active_route(&self, route: TransportRoute) {
        self.write(PROXY_KEY, route.as_str());
        self.set_connectivity_failed(false);
    }

    /// Whether the last connectivity test failed. Changing the route, demo
    /// mode or credentials resets it.
    pub fn connectivity_failed(&self) -> bool {
        self.read(CONNECTIVITY_ERROR_KEY).as_deref() == Some("true")
    }

    pub fn set_connectivity_failed(&self, failed: bool) {
        if failed {
            self.write(CONNECTIVITY_ERROR_KEY, "true");
        } else {
            self.delete(CONNECTIVITY_ERROR_KEY);
        }
    }

    /// Last customer picked in the UI; unreadable entries count as none.
    pub fn active_customer(&self) -> Option<Customer> {
        let raw = self.read(ACTIVE_CUSTOMER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(customer) => Some(customer),
            Err(err) => {
                warn!(error = %err, "Ignoring unreadable active customer entry");
                None
            }
        }
    }

    pub fn set_active_customer(&self, customer: Option<&Customer>) {
        match customer {
            Some(customer) => match serde_json::to_string(customer) {
                Ok(raw) => self.write(ACTIVE_CUSTOMER_KEY, &raw),
                Err(err) => warn!(error = %err, "Failed to serialize active customer"),
            },
            None => self.delete(ACTIVE_CUSTOMER_KEY),
        }
    }

    /// Remove every flag this store owns.
    pub fn clear(&self) {
        for key in ALL_KEYS {
            self.delete(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn customer() -> Customer {
        Customer {
            id: "c1".to_string(),
            identifier: "x@example.com".to_string(),
            secret: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_detached_store_returns_defaults() {
        let store = CredentialStore::detached();
        store.set_demo_mode(true);
        store.set_credentials("app", "secret");

        assert_eq!(store.app_id(), "");
        assert_eq!(store.secret(), "");
        assert!(!store.demo_mode());
        assert_eq!(store.active_route(), TransportRoute::Internal);
        assert!(store.active_customer().is_none());
    }

    #[test]
    fn test_memory_store_round_trips_flags() {
        let store = CredentialStore::in_memory();
        store.set_demo_mode(true);
        store.set_active_route(TransportRoute::RelayB);
        store.set_credentials("app", "secret");
        store.set_active_customer(Some(&customer()));

        assert!(store.demo_mode());
        assert_eq!(store.active_route(), TransportRoute::RelayB);
        assert_eq!(store.app_id(), "app");
        assert_eq!(store.active_customer(), Some(customer()));

        store.clear();
        assert!(!store.demo_mode());
        assert_eq!(store.app_id(), "");
        assert!(store.active_customer().is_none());
    }

    #[test]
    fn test_connectivity_failure_resets_on_configuration_change() {
        let store = CredentialStore::in_memory();
        store.set_connectivity_failed(true);
        assert!(store.connectivity_failed());

        store.set_active_route(TransportRoute::RelayA);
        assert!(!store.connectivity_failed());

        store.set_connectivity_failed(true);
        store.set_credentials("app", "secret");
        assert!(!store.connectivity_failed());

        store.set_connectivity_failed(true);
        store.clear();
        assert!(!store.connectivity_failed());
    }

    #[test]
    fn test_legacy_route_key_is_understood() {
        let backend = Arc::new(MemoryStore::new());
        backend.set(PROXY_KEY, "CODETABS").unwrap();
        let store = CredentialStore::new(backend);
        assert_eq!(store.active_route(), TransportRoute::RelayA);
    }

    #[test]
    fn test_json_file_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let first = CredentialStore::new(Arc::new(JsonFileStore::new(&path)));
        first.set_demo_mode(true);
        first.set_active_route(TransportRoute::RelayA);

        let second = CredentialStore::new(Arc::new(JsonFileStore::new(&path)));
        assert!(second.demo_mode());
        assert_eq!(second.active_route(), TransportRoute::RelayA);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("vglobal_shadow_mode"));
    }

    #[test]
    fn test_corrupt_file_reads_as_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        let store = CredentialStore::new(Arc::new(JsonFileStore::new(&path)));
        assert!(!store.demo_mode());
        assert_eq!(store.app_id(), "");
    }
}
