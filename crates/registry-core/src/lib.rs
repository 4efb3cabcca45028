//! registry-core - Core library for the software registry.
//!
//! This crate provides the registry's storage, the event ledger recorded for
//! every mutation of a tracked entity, and best-effort webhook dispatch of
//! those events to registered subscriptions.
//!
//! # Example
//!
//! ```ignore
//! use registry_core::{NewSoftware, RegistryConfig, Runtime};
//!
//! let mut runtime = Runtime::new(RegistryConfig::default())?;
//! runtime.start()?;
//!
//! let db = runtime.database();
//! db.create_subscription("software", "http://hook.example/a", None)?;
//!
//! // Records a `create` event and notifies http://hook.example/a
//! db.create_software(NewSoftware {
//!     url: "https://github.com/example/app".to_string(),
//!     publiccode_yml: publiccode,
//!     ..Default::default()
//! })?;
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod runtime;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::RegistryConfig;
pub use error::{ErrorCode, RegistryError, RegistryResult};
pub use events::{
    Event, EventRelay, EventType, MutationHook, Notification, RelayReceiver, SubscriptionSource,
    TrackedEntity, WebhookDispatcher,
};
pub use runtime::Runtime;
pub use store::Database;
pub use types::{
    CodeHosting, Log, NewPublisher, NewSoftware, Publisher, PublisherUpdate, Software,
    SoftwareUpdate, Webhook,
};
