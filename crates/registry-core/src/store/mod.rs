//! SQLite storage for the registry.
//!
//! A single connection behind a mutex serves all reads and writes. Writes to
//! tracked entities go through [`Database::mutate`], which runs the mutation
//! hook inside the same transaction as the write.

pub(crate) mod ledger;
mod logs;
mod publishers;
mod software;
mod webhooks;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction};

use crate::error::{RegistryError, RegistryResult};
use crate::events::{EventRelay, EventType, MutationHook, TrackedEntity};
use crate::types::{Publisher, Software};

/// SQLite-backed registry database
pub struct Database {
    conn: Mutex<Connection>,
    hook: MutationHook,
}

impl Database {
    /// Open (or create) a database at the given path
    pub fn open(path: impl AsRef<Path>, relay: EventRelay) -> RegistryResult<Self> {
        Self::from_connection(Connection::open(path)?, relay)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory(relay: EventRelay) -> RegistryResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, relay)
    }

    fn from_connection(conn: Connection, relay: EventRelay) -> RegistryResult<Self> {
        let db = Self {
            conn: Mutex::new(conn),
            hook: MutationHook::new(relay),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> RegistryResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS publishers (
                id TEXT PRIMARY KEY,
                alternative_id TEXT UNIQUE,
                email TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL DEFAULT '',
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS publisher_code_hosting (
                id TEXT PRIMARY KEY,
                publisher_id TEXT NOT NULL REFERENCES publishers(id) ON DELETE CASCADE,
                url TEXT NOT NULL UNIQUE,
                is_group INTEGER NOT NULL DEFAULT 1
            );

            CREATE INDEX IF NOT EXISTS idx_code_hosting_publisher
                ON publisher_code_hosting(publisher_id);

            CREATE TABLE IF NOT EXISTS software (
                id TEXT PRIMARY KEY,
                publiccode_yml TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS software_urls (
                id TEXT PRIMARY KEY,
                software_id TEXT NOT NULL REFERENCES software(id) ON DELETE CASCADE,
                url TEXT NOT NULL UNIQUE,
                canonical INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_software_urls_software
                ON software_urls(software_id);

            CREATE TABLE IF NOT EXISTS logs (
                id TEXT PRIMARY KEY,
                message TEXT NOT NULL,
                entity_type TEXT,
                entity_id TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_logs_entity ON logs(entity_type, entity_id);

            CREATE TABLE IF NOT EXISTS webhooks (
                id TEXT PRIMARY KEY,
                url TEXT NOT NULL,
                secret TEXT,
                entity_type TEXT NOT NULL,
                entity_id TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Index for subscription matching
            CREATE INDEX IF NOT EXISTS idx_webhooks_entity ON webhooks(entity_type, entity_id);

            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                type TEXT NOT NULL,
                entity_type TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id);
        "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> RegistryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RegistryError::Internal("database connection lock poisoned".to_string()))
    }

    /// Run a read-only closure against the connection.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> RegistryResult<T>) -> RegistryResult<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` in a transaction, committing on `Ok` and rolling back on `Err`.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> RegistryResult<T>,
    ) -> RegistryResult<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Mutate a tracked entity and record the event in one transaction.
    ///
    /// `f` performs the write and returns the entity in its post-mutation
    /// state (for deletes, the state it had when removed). The mutation hook
    /// then appends the event; if either step fails nothing is committed.
    pub fn mutate<E, F>(&self, event_type: EventType, f: F) -> RegistryResult<E>
    where
        E: TrackedEntity,
        F: FnOnce(&Transaction<'_>) -> RegistryResult<E>,
    {
        self.transaction(|tx| {
            let entity = f(tx)?;
            self.hook.after_mutation(tx, event_type, &entity)?;
            Ok(entity)
        })
    }

    /// Check that the database answers queries.
    pub fn ping(&self) -> RegistryResult<()> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    /// The relay events are offered to after capture.
    pub fn relay(&self) -> &EventRelay {
        self.hook.relay()
    }
}

/// Whether a row with `id` exists for the given tracked entity type.
///
/// Entity types double as table names.
pub(crate) fn entity_exists(conn: &Connection, entity_type: &str, id: &str) -> RegistryResult<bool> {
    if entity_type != Publisher::ENTITY_TYPE && entity_type != Software::ENTITY_TYPE {
        return Err(RegistryError::validation(format!(
            "unknown entity type '{}'",
            entity_type
        )));
    }

    let exists = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", entity_type),
        [id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub(crate) fn parse_timestamp(value: &str) -> RegistryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RegistryError::database(format!("invalid timestamp '{}': {}", value, e)))
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CodeHosting, NewPublisher, NewSoftware};

    #[test]
    fn test_ping() {
        let (db, _rx) = test_support::database();
        db.ping().unwrap();
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let (db, _rx) = test_support::database();

        let result: RegistryResult<()> = db.transaction(|tx| {
            tx.execute(
                "INSERT INTO logs (id, message, created_at, updated_at) VALUES ('l1', 'm', 'x', 'x')",
                [],
            )?;
            Err(RegistryError::validation("abort"))
        });
        assert!(result.is_err());

        let count: i64 = db
            .read(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM logs", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_failed_mutation_leaves_no_event() {
        let (db, mut rx) = test_support::database();

        let result: RegistryResult<Publisher> = db.mutate(EventType::Create, |_tx| {
            Err(RegistryError::validation("rejected"))
        });
        assert!(result.is_err());

        assert_eq!(db.count_events().unwrap(), 0);
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_ledger_failure_rolls_back_write() {
        let (db, mut rx) = test_support::database();
        db.transaction(|tx| Ok(tx.execute_batch("DROP TABLE events")?))
            .unwrap();

        let result = db.create_software(NewSoftware {
            url: "https://github.com/example/app".to_string(),
            publiccode_yml: "publiccodeYmlVersion: \"0.2\"".to_string(),
            ..Default::default()
        });

        let err = result.unwrap_err();
        assert!(err.to_string().contains("events"));
        assert!(db.list_software().unwrap().is_empty());
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_entity_exists() {
        let (db, _rx) = test_support::database();
        let publisher = db
            .create_publisher(NewPublisher {
                email: "info@example.org".to_string(),
                code_hosting: vec![CodeHosting {
                    url: "https://github.com/example".to_string(),
                    group: true,
                }],
                ..Default::default()
            })
            .unwrap();

        db.read(|conn| {
            assert!(entity_exists(conn, "publishers", &publisher.id)?);
            assert!(!entity_exists(conn, "software", &publisher.id)?);
            assert!(entity_exists(conn, "bundles", "x").is_err());
            Ok(())
        })
        .unwrap();
    }
}
