//! Server state management.

use std::sync::Arc;

use registry_core::Database;
use secrecy::{ExposeSecret, SecretString};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    db: Arc<Database>,
    api_key: Option<SecretString>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: Arc<Database>, api_key: Option<SecretString>) -> Self {
        Self { db, api_key }
    }

    /// The registry database.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Check a bearer token against the configured key.
    ///
    /// Always false when no key is configured.
    pub fn authorizes(&self, token: &str) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|key| !token.is_empty() && key.expose_secret() == token)
    }

    /// Whether the API accepts writes at all.
    pub fn is_read_only(&self) -> bool {
        self.api_key.is_none()
    }
}
