//! Runtime wiring for the event pipeline.
//!
//! Builds the relay, the database holding the mutation hook, and the webhook
//! dispatcher, then starts the dispatcher loop once for the process lifetime.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::RegistryConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::events::{EventRelay, RelayReceiver, SubscriptionSource, WebhookDispatcher};
use crate::store::Database;

/// Owns the storage and the dispatcher of one registry process.
///
/// # Example
///
/// ```ignore
/// use registry_core::{RegistryConfig, Runtime};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut runtime = Runtime::new(RegistryConfig::from_env()?)?;
///     runtime.start()?;
///
///     let database = runtime.database();
///     // ... serve requests against `database` ...
///     Ok(())
/// }
/// ```
pub struct Runtime {
    database: Arc<Database>,
    dispatcher: WebhookDispatcher,
    /// Relay consumer, taken by the first `start()`.
    receiver: Option<RelayReceiver>,
    /// Dispatcher loop, retained once started. There is no drain on exit.
    handle: Option<JoinHandle<()>>,
    config: RegistryConfig,
}

impl Runtime {
    /// Create the runtime. Nothing runs until `start()` is called.
    pub fn new(config: RegistryConfig) -> RegistryResult<Self> {
        debug!(
            relay_capacity = config.relay_capacity,
            webhook_timeout_secs = config.webhook_timeout_secs,
            "Creating registry runtime"
        );

        let (relay, receiver) = EventRelay::channel(config.relay_capacity);

        let database = match &config.database_path {
            Some(path) => {
                debug!(path = %path, "Opening file-backed database");
                Arc::new(Database::open(path, relay)?)
            }
            None => {
                debug!("Opening in-memory database");
                Arc::new(Database::in_memory(relay)?)
            }
        };

        let subscriptions: Arc<dyn SubscriptionSource> = database.clone();
        let dispatcher = WebhookDispatcher::new(
            subscriptions,
            Duration::from_secs(config.webhook_timeout_secs),
        )?;

        Ok(Self {
            database,
            dispatcher,
            receiver: Some(receiver),
            handle: None,
            config,
        })
    }

    /// Start the webhook dispatcher loop.
    ///
    /// Must be called from within a tokio runtime. The loop can only be
    /// started once; later calls fail with a relay error.
    pub fn start(&mut self) -> RegistryResult<()> {
        let receiver = self
            .receiver
            .take()
            .ok_or_else(|| RegistryError::Relay("webhook dispatcher already started".to_string()))?;

        self.handle = Some(self.dispatcher.clone().spawn(receiver));
        info!(
            relay_capacity = self.database.relay().capacity(),
            "Webhook dispatcher running"
        );
        Ok(())
    }

    /// Whether the dispatcher loop has been started and is still alive.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Shared handle to the database.
    pub fn database(&self) -> Arc<Database> {
        self.database.clone()
    }

    /// The relay producers offer events to.
    pub fn relay(&self) -> &EventRelay {
        self.database.relay()
    }

    /// Get the runtime configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}
