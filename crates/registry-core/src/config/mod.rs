//! Configuration for the registry core.

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

/// Default capacity of the event relay channel.
pub const DEFAULT_RELAY_CAPACITY: usize = 32;

/// Default timeout for a single webhook delivery, in seconds.
pub const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 10;

/// Configuration for storage and the event pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Path to the SQLite database (default: None = in-memory).
    pub database_path: Option<String>,
    /// Number of events the relay buffers before dropping (default: 32).
    pub relay_capacity: usize,
    /// Per-delivery timeout for outbound webhooks in seconds (default: 10).
    pub webhook_timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            relay_capacity: DEFAULT_RELAY_CAPACITY,
            webhook_timeout_secs: DEFAULT_WEBHOOK_TIMEOUT_SECS,
        }
    }
}

impl RegistryConfig {
    /// Set path for the database file.
    pub fn with_database_path(mut self, path: impl Into<String>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Set the relay capacity. A relay always holds at least one event.
    pub fn with_relay_capacity(mut self, capacity: usize) -> Self {
        self.relay_capacity = capacity.max(1);
        self
    }

    /// Set the webhook delivery timeout.
    pub fn with_webhook_timeout(mut self, secs: u64) -> Self {
        self.webhook_timeout_secs = secs.max(1);
        self
    }

    /// Create config from environment variables.
    ///
    /// Reads:
    /// - `REGISTRY_DATABASE_PATH` (default: None = in-memory)
    /// - `REGISTRY_RELAY_CAPACITY` (default: 32)
    /// - `REGISTRY_WEBHOOK_TIMEOUT_SECS` (default: 10)
    pub fn from_env() -> RegistryResult<Self> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("REGISTRY_DATABASE_PATH") {
            if !path.is_empty() {
                config.database_path = Some(path);
            }
        }

        if let Ok(capacity) = std::env::var("REGISTRY_RELAY_CAPACITY") {
            let capacity = capacity.parse().map_err(|_| {
                RegistryError::Configuration(format!(
                    "REGISTRY_RELAY_CAPACITY must be a positive integer, got '{}'",
                    capacity
                ))
            })?;
            config = config.with_relay_capacity(capacity);
        }

        if let Ok(timeout) = std::env::var("REGISTRY_WEBHOOK_TIMEOUT_SECS") {
            let secs = timeout.parse().map_err(|_| {
                RegistryError::Configuration(format!(
                    "REGISTRY_WEBHOOK_TIMEOUT_SECS must be a number of seconds, got '{}'",
                    timeout
                ))
            })?;
            config = config.with_webhook_timeout(secs);
        }

        Ok(config)
    }
}
