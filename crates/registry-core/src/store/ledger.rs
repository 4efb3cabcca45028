//! Event ledger: append-only record of tracked entity mutations.
//!
//! Rows are inserted only by the mutation hook, inside the transaction of the
//! write they describe. There is no update or delete path.

use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{parse_timestamp, Database};
use crate::error::{RegistryError, RegistryResult};
use crate::events::{Event, EventType};

const EVENT_COLUMNS: &str = "id, type, entity_type, entity_id, created_at";

/// Append an event using the caller's connection or transaction.
pub(crate) fn insert_event(conn: &Connection, event: &Event) -> RegistryResult<()> {
    conn.execute(
        "INSERT INTO events (id, type, entity_type, entity_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            event.id,
            event.event_type.to_string(),
            event.entity_type,
            event.entity_id,
            event.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn row_to_event(row: &Row<'_>) -> RegistryResult<Event> {
    let event_type: String = row.get(1)?;
    let created_at: String = row.get(4)?;

    Ok(Event {
        id: row.get(0)?,
        event_type: EventType::from_str(&event_type).map_err(|_| {
            RegistryError::database(format!("unknown event type '{}'", event_type))
        })?,
        entity_type: row.get(2)?,
        entity_id: row.get(3)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

impl Database {
    /// Get an event by ID
    pub fn get_event(&self, id: &str) -> RegistryResult<Option<Event>> {
        self.read(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM events WHERE id = ?1", EVENT_COLUMNS),
                params![id],
                |row| Ok(row_to_event(row)),
            )
            .optional()?
            .transpose()
        })
    }

    /// Events recorded for one entity instance, oldest first.
    pub fn list_events_for(&self, entity_type: &str, entity_id: &str) -> RegistryResult<Vec<Event>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM events WHERE entity_type = ?1 AND entity_id = ?2 ORDER BY rowid",
                EVENT_COLUMNS
            ))?;
            let rows = stmt.query_map(params![entity_type, entity_id], |row| Ok(row_to_event(row)))?;

            let mut events = Vec::new();
            for row in rows {
                events.push(row??);
            }
            Ok(events)
        })
    }

    /// Total number of recorded events.
    pub fn count_events(&self) -> RegistryResult<usize> {
        self.read(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }
}
