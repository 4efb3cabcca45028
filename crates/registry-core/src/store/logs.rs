//! Log storage. Logs are not tracked entities and produce no events.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{entity_exists, new_id, parse_timestamp, Database};
use crate::error::{RegistryError, RegistryResult};
use crate::events::TrackedEntity;
use crate::types::{Log, Software};

const LOG_COLUMNS: &str = "id, message, entity_type, entity_id, created_at, updated_at";

fn row_to_log(row: &Row<'_>) -> RegistryResult<Log> {
    let created_at: String = row.get(4)?;
    let updated_at: String = row.get(5)?;

    Ok(Log {
        id: row.get(0)?,
        message: row.get(1)?,
        entity_type: row.get(2)?,
        entity_id: row.get(3)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn find_log(conn: &Connection, id: &str) -> RegistryResult<Option<Log>> {
    conn.query_row(
        &format!("SELECT {} FROM logs WHERE id = ?1", LOG_COLUMNS),
        params![id],
        |row| Ok(row_to_log(row)),
    )
    .optional()?
    .transpose()
}

fn validate_message(message: &str) -> RegistryResult<()> {
    if message.trim().is_empty() {
        return Err(RegistryError::validation("message is required"));
    }
    Ok(())
}

fn insert_log(conn: &Connection, log: &Log) -> RegistryResult<()> {
    conn.execute(
        "INSERT INTO logs (id, message, entity_type, entity_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            log.id,
            log.message,
            log.entity_type,
            log.entity_id,
            log.created_at.to_rfc3339(),
            log.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

impl Database {
    /// Create a log entry not attached to any entity.
    pub fn create_log(&self, message: impl Into<String>) -> RegistryResult<Log> {
        let message = message.into();
        validate_message(&message)?;

        let now = Utc::now();
        let log = Log {
            id: new_id(),
            message,
            entity_type: None,
            entity_id: None,
            created_at: now,
            updated_at: now,
        };
        self.transaction(|tx| insert_log(tx, &log))?;
        Ok(log)
    }

    /// Create a log entry attached to an existing software entry.
    pub fn create_software_log(
        &self,
        software_id: &str,
        message: impl Into<String>,
    ) -> RegistryResult<Log> {
        let message = message.into();
        validate_message(&message)?;

        self.transaction(|tx| {
            if !entity_exists(tx, Software::ENTITY_TYPE, software_id)? {
                return Err(RegistryError::not_found("Software", software_id));
            }

            let now = Utc::now();
            let log = Log {
                id: new_id(),
                message,
                entity_type: Some(Software::ENTITY_TYPE.to_string()),
                entity_id: Some(software_id.to_string()),
                created_at: now,
                updated_at: now,
            };
            insert_log(tx, &log)?;
            Ok(log)
        })
    }

    /// Get a log entry by ID
    pub fn get_log(&self, id: &str) -> RegistryResult<Option<Log>> {
        self.read(|conn| find_log(conn, id))
    }

    /// All log entries in creation order.
    pub fn list_logs(&self) -> RegistryResult<Vec<Log>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM logs ORDER BY created_at, rowid",
                LOG_COLUMNS
            ))?;
            let rows = stmt.query_map([], |row| Ok(row_to_log(row)))?;

            let mut logs = Vec::new();
            for row in rows {
                logs.push(row??);
            }
            Ok(logs)
        })
    }

    /// Log entries attached to one software entry.
    pub fn list_software_logs(&self, software_id: &str) -> RegistryResult<Vec<Log>> {
        self.read(|conn| {
            if !entity_exists(conn, Software::ENTITY_TYPE, software_id)? {
                return Err(RegistryError::not_found("Software", software_id));
            }

            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM logs WHERE entity_type = ?1 AND entity_id = ?2 ORDER BY created_at, rowid",
                LOG_COLUMNS
            ))?;
            let rows = stmt.query_map(params![Software::ENTITY_TYPE, software_id], |row| {
                Ok(row_to_log(row))
            })?;

            let mut logs = Vec::new();
            for row in rows {
                logs.push(row??);
            }
            Ok(logs)
        })
    }

    /// Replace the message of a log entry.
    pub fn update_log(&self, id: &str, message: impl Into<String>) -> RegistryResult<Log> {
        let message = message.into();
        validate_message(&message)?;

        self.transaction(|tx| {
            let mut log = find_log(tx, id)?.ok_or_else(|| RegistryError::not_found("Log", id))?;
            log.message = message;
            log.updated_at = Utc::now();

            tx.execute(
                "UPDATE logs SET message = ?2, updated_at = ?3 WHERE id = ?1",
                params![log.id, log.message, log.updated_at.to_rfc3339()],
            )?;
            Ok(log)
        })
    }

    /// Delete a log entry.
    pub fn delete_log(&self, id: &str) -> RegistryResult<()> {
        let deleted =
            self.transaction(|tx| Ok(tx.execute("DELETE FROM logs WHERE id = ?1", params![id])?))?;
        if deleted == 0 {
            return Err(RegistryError::not_found("Log", id));
        }
        Ok(())
    }
}
