//! Subscription registry: webhook storage and matching.
//!
//! A subscription is either global for an entity type (`entity_id` stored as
//! the empty string) or scoped to one instance. Duplicate subscriptions are
//! allowed and each one is delivered independently.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{entity_exists, new_id, parse_timestamp, Database};
use crate::error::{RegistryError, RegistryResult};
use crate::events::SubscriptionSource;
use crate::types::Webhook;

const WEBHOOK_COLUMNS: &str = "id, url, secret, entity_type, entity_id, created_at, updated_at";

fn row_to_webhook(row: &Row<'_>) -> RegistryResult<Webhook> {
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;

    Ok(Webhook {
        id: row.get(0)?,
        url: row.get(1)?,
        secret: row.get(2)?,
        entity_type: row.get(3)?,
        entity_id: row.get(4)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn query_webhooks(
    conn: &Connection,
    filter: &str,
    entity_type: &str,
    entity_id: &str,
) -> RegistryResult<Vec<Webhook>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM webhooks WHERE {} ORDER BY created_at, rowid",
        WEBHOOK_COLUMNS, filter
    ))?;
    let rows = stmt.query_map(params![entity_type, entity_id], |row| Ok(row_to_webhook(row)))?;

    let mut webhooks = Vec::new();
    for row in rows {
        webhooks.push(row??);
    }
    Ok(webhooks)
}

fn validate_url(url: &str) -> RegistryResult<()> {
    if url.trim().is_empty() {
        return Err(RegistryError::invalid_url(url));
    }
    Ok(())
}

fn insert_webhook(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
    url: String,
    secret: Option<String>,
) -> RegistryResult<Webhook> {
    let now = Utc::now();
    let webhook = Webhook {
        id: new_id(),
        url,
        secret,
        entity_type: entity_type.to_string(),
        entity_id: entity_id.to_string(),
        created_at: now,
        updated_at: now,
    };

    conn.execute(
        "INSERT INTO webhooks (id, url, secret, entity_type, entity_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            webhook.id,
            webhook.url,
            webhook.secret,
            webhook.entity_type,
            webhook.entity_id,
            webhook.created_at.to_rfc3339(),
            webhook.updated_at.to_rfc3339(),
        ],
    )?;

    tracing::debug!(
        webhook_id = %webhook.id,
        entity_type = %webhook.entity_type,
        entity_id = %webhook.entity_id,
        "Registered webhook"
    );
    Ok(webhook)
}

impl Database {
    /// Subscribe to every instance of `entity_type`.
    pub fn create_subscription(
        &self,
        entity_type: &str,
        url: impl Into<String>,
        secret: Option<String>,
    ) -> RegistryResult<Webhook> {
        let url = url.into();
        validate_url(&url)?;

        self.transaction(|tx| {
            // Rejects entity types that are not tracked.
            entity_exists(tx, entity_type, "")?;
            insert_webhook(tx, entity_type, "", url, secret)
        })
    }

    /// Subscribe to one existing instance.
    ///
    /// The instance must exist when the subscription is created; it is not
    /// checked again afterwards.
    pub fn create_scoped_subscription(
        &self,
        entity_type: &str,
        entity_id: &str,
        url: impl Into<String>,
        secret: Option<String>,
    ) -> RegistryResult<Webhook> {
        let url = url.into();
        validate_url(&url)?;

        self.transaction(|tx| {
            if entity_id.is_empty() || !entity_exists(tx, entity_type, entity_id)? {
                return Err(RegistryError::not_found(entity_type, entity_id));
            }
            insert_webhook(tx, entity_type, entity_id, url, secret)
        })
    }

    /// Get a subscription by ID
    pub fn get_subscription(&self, id: &str) -> RegistryResult<Option<Webhook>> {
        self.read(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM webhooks WHERE id = ?1", WEBHOOK_COLUMNS),
                params![id],
                |row| Ok(row_to_webhook(row)),
            )
            .optional()?
            .transpose()
        })
    }

    /// Global subscriptions for an entity type.
    pub fn list_subscriptions(&self, entity_type: &str) -> RegistryResult<Vec<Webhook>> {
        self.read(|conn| {
            query_webhooks(conn, "entity_type = ?1 AND entity_id = ?2", entity_type, "")
        })
    }

    /// Subscriptions scoped to one existing instance.
    pub fn list_scoped_subscriptions(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> RegistryResult<Vec<Webhook>> {
        self.read(|conn| {
            if entity_id.is_empty() || !entity_exists(conn, entity_type, entity_id)? {
                return Err(RegistryError::not_found(entity_type, entity_id));
            }
            query_webhooks(conn, "entity_type = ?1 AND entity_id = ?2", entity_type, entity_id)
        })
    }

    /// Change the delivery URL of a subscription.
    pub fn update_subscription_url(
        &self,
        id: &str,
        url: impl Into<String>,
    ) -> RegistryResult<Webhook> {
        let url = url.into();
        validate_url(&url)?;

        self.transaction(|tx| {
            let now = Utc::now();
            let updated = tx.execute(
                "UPDATE webhooks SET url = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, url, now.to_rfc3339()],
            )?;
            if updated == 0 {
                return Err(RegistryError::not_found("Webhook", id));
            }

            tx.query_row(
                &format!("SELECT {} FROM webhooks WHERE id = ?1", WEBHOOK_COLUMNS),
                params![id],
                |row| Ok(row_to_webhook(row)),
            )?
        })
    }

    /// Remove a subscription.
    pub fn delete_subscription(&self, id: &str) -> RegistryResult<()> {
        let deleted = self.transaction(|tx| {
            Ok(tx.execute("DELETE FROM webhooks WHERE id = ?1", params![id])?)
        })?;
        if deleted == 0 {
            return Err(RegistryError::not_found("Webhook", id));
        }
        Ok(())
    }
}

impl SubscriptionSource for Database {
    fn matching_subscriptions(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> RegistryResult<Vec<Webhook>> {
        self.read(|conn| {
            query_webhooks(
                conn,
                "entity_type = ?1 AND (entity_id = '' OR entity_id = ?2)",
                entity_type,
                entity_id,
            )
        })
    }
}
