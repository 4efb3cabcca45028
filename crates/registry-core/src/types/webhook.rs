//! Webhook subscription types.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A registered webhook endpoint.
///
/// An empty `entity_id` subscribes to every instance of `entity_type`;
/// otherwise only events for that exact instance match. Only the id, URL
/// and timestamps are exposed when serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub id: String,
    pub url: String,
    #[serde(skip)]
    pub secret: Option<String>,
    #[serde(skip)]
    pub entity_type: String,
    #[serde(skip)]
    pub entity_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
