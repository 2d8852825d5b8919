//! Status Deriver and the polling monitor built on it.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::{sync::watch, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::{store::CredentialStore, transport::TransportRoute};

/// Coarse health label shown to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Internal proxy, real data
    Live,
    /// A public relay, real data
    Proxy,
    /// Demo mode, synthesized data
    Shadow,
    /// The last connectivity test failed; never derived from the flags alone
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Live => "live",
            ConnectionStatus::Proxy => "proxy",
            ConnectionStatus::Shadow => "shadow",
            ConnectionStatus::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Demo mode wins over the route; any relay reports `proxy`.
pub fn derive_status(demo_mode: bool, route: TransportRoute) -> ConnectionStatus {
    if demo_mode {
        ConnectionStatus::Shadow
    } else if route != TransportRoute::Internal {
        ConnectionStatus::Proxy
    } else {
        ConnectionStatus::Live
    }
}

/// Status shown for the stored flags: `error` while the last connectivity
/// test is recorded as failed, otherwise [`derive_status`].
pub fn current_status(store: &CredentialStore) -> ConnectionStatus {
    if store.connectivity_failed() {
        ConnectionStatus::Error
    } else {
        derive_status(store.demo_mode(), store.active_route())
    }
}

/// Re-derives status from the store on a fixed interval and publishes changes.
pub struct StatusMonitor {
    store: CredentialStore,
    interval: Duration,
    sender: watch::Sender<ConnectionStatus>,
}

impl StatusMonitor {
    pub fn new(store: CredentialStore, interval: Duration) -> Self {
        let (sender, _) = watch::channel(current_status(&store));
        Self {
            store,
            interval,
            sender,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.sender.subscribe()
    }

    pub fn current(&self) -> ConnectionStatus {
        *self.sender.borrow()
    }

    /// Report `error` until a test passes or the configuration changes.
    pub fn mark_connectivity_failed(&self) {
        self.store.set_connectivity_failed(true);
        self.refresh();
    }

    pub fn clear_connectivity_failure(&self) {
        self.store.set_connectivity_failed(false);
        self.refresh();
    }

    /// Re-derive now; subscribers are only woken when the value changes.
    pub fn refresh(&self) -> ConnectionStatus {
        let next = current_status(&self.store);

        self.sender.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            debug!(from = %current, to = %next, "Connection status changed");
            *current = next;
            true
        });
        next
    }

    /// Poll until `shutdown` fires.
    #[instrument(skip_all)]
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(interval_ms = self.interval.as_millis() as u64, "Starting status monitor");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Status monitor shutdown requested");
                    break;
                }
                _ = sleep(self.interval) => {
                    self.refresh();
                }
            }
        }

        info!("Status monitor stopped");
    }
}
