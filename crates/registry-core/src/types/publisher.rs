//! Publisher types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::TrackedEntity;

/// A code hosting location owned by a publisher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeHosting {
    /// Organization or repository URL.
    pub url: String,
    /// Whether the URL points to a group of repositories.
    #[serde(default = "default_true")]
    pub group: bool,
}

fn default_true() -> bool {
    true
}

/// An organization publishing software in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publisher {
    /// Unique identifier.
    pub id: String,
    /// Optional human-chosen identifier, unique across publishers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative_id: Option<String>,
    /// Contact email, normalized to lowercase.
    pub email: String,
    /// Free-form description.
    pub description: String,
    /// Whether the publisher is active.
    pub active: bool,
    /// Code hosting locations (at least one).
    pub code_hosting: Vec<CodeHosting>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl TrackedEntity for Publisher {
    const ENTITY_TYPE: &'static str = "publishers";

    fn entity_id(&self) -> &str {
        &self.id
    }
}

/// Fields for creating a publisher.
#[derive(Debug, Clone, Default)]
pub struct NewPublisher {
    pub email: String,
    pub description: String,
    pub alternative_id: Option<String>,
    pub active: Option<bool>,
    pub code_hosting: Vec<CodeHosting>,
}

/// Partial update of a publisher. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct PublisherUpdate {
    pub email: Option<String>,
    pub description: Option<String>,
    pub alternative_id: Option<String>,
    pub active: Option<bool>,
    pub code_hosting: Option<Vec<CodeHosting>>,
}

/// Trim and lowercase an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
