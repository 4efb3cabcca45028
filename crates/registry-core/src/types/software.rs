//! Software types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::TrackedEntity;

/// A software entry in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Software {
    /// Unique identifier.
    pub id: String,
    /// Canonical repository URL.
    pub url: String,
    /// Other URLs the software is known by, sorted.
    pub aliases: Vec<String>,
    /// Raw publiccode.yml contents.
    pub publiccode_yml: String,
    /// Whether the software is active.
    pub active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl TrackedEntity for Software {
    const ENTITY_TYPE: &'static str = "software";

    fn entity_id(&self) -> &str {
        &self.id
    }
}

/// Fields for creating a software entry.
#[derive(Debug, Clone, Default)]
pub struct NewSoftware {
    pub url: String,
    pub aliases: Vec<String>,
    pub publiccode_yml: String,
    pub active: Option<bool>,
}

/// Partial update of a software entry. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct SoftwareUpdate {
    pub url: Option<String>,
    pub aliases: Option<Vec<String>>,
    pub publiccode_yml: Option<String>,
    pub active: Option<bool>,
}
