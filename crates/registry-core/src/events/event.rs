//! Ledger events for tracked entity mutations.
//!
//! An event is written in the same transaction as the create, update or
//! delete it describes and is never modified afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Kind of mutation an event records.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EventType {
    Create,
    Update,
    Delete,
}

/// Durable record that a tracked entity was created, updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Unique event ID, assigned at creation
    pub id: String,
    /// What happened to the entity
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Resource kind, e.g. "publishers" or "software"
    pub entity_type: String,
    /// Identifier of the affected instance
    #[serde(rename = "entityID")]
    pub entity_id: String,
    /// When the event was recorded
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn new(
        event_type: EventType,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type,
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            created_at: Utc::now(),
        }
    }

    /// Path identifying the affected resource in outbound notifications.
    ///
    /// `/<entityType>` when the event carries no entity id,
    /// `/<entityType>/<entityID>` otherwise.
    pub fn subject(&self) -> String {
        if self.entity_id.is_empty() {
            format!("/{}", self.entity_type)
        } else {
            format!("/{}/{}", self.entity_type, self.entity_id)
        }
    }
}
