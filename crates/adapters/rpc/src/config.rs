//! RPC bridge configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the RPC bridge.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Endpoint URL the bridge listens on (`tcp://host:port` or `unix:///path`).
    pub listen: String,
    /// Endpoint URL of the peer subscriptions are mirrored to.
    pub remote: Option<String>,
    /// URL announced to the peer; defaults to the bound listen address.
    pub advertise: Option<String>,
    /// Upper bound on one remote call (connect, request and reply), in milliseconds.
    pub call_timeout_ms: u64,
}

impl BridgeConfig {
    /// [`call_timeout_ms`](Self::call_timeout_ms) as a [`Duration`].
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            listen: "tcp://127.0.0.1:7633".to_string(),
            remote: None,
            advertise: None,
            call_timeout_ms: 5000,
        }
    }
}
