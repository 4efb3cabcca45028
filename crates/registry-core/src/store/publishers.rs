//! Publisher storage.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{new_id, parse_timestamp, Database};
use crate::error::{RegistryError, RegistryResult};
use crate::events::EventType;
use crate::types::{normalize_email, CodeHosting, NewPublisher, Publisher, PublisherUpdate};

const PUBLISHER_COLUMNS: &str =
    "id, alternative_id, email, description, active, created_at, updated_at";

fn row_to_publisher(row: &Row<'_>) -> RegistryResult<Publisher> {
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;

    Ok(Publisher {
        id: row.get(0)?,
        alternative_id: row.get(1)?,
        email: row.get(2)?,
        description: row.get(3)?,
        active: row.get::<_, i32>(4)? != 0,
        code_hosting: Vec::new(),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn load_code_hosting(conn: &Connection, publisher_id: &str) -> RegistryResult<Vec<CodeHosting>> {
    let mut stmt = conn.prepare(
        "SELECT url, is_group FROM publisher_code_hosting WHERE publisher_id = ?1 ORDER BY rowid",
    )?;
    let rows = stmt.query_map(params![publisher_id], |row| {
        Ok(CodeHosting {
            url: row.get(0)?,
            group: row.get::<_, i32>(1)? != 0,
        })
    })?;

    let mut hosting = Vec::new();
    for row in rows {
        hosting.push(row?);
    }
    Ok(hosting)
}

fn replace_code_hosting(
    conn: &Connection,
    publisher_id: &str,
    hosting: &[CodeHosting],
) -> RegistryResult<()> {
    conn.execute(
        "DELETE FROM publisher_code_hosting WHERE publisher_id = ?1",
        params![publisher_id],
    )?;
    for entry in hosting {
        conn.execute(
            "INSERT INTO publisher_code_hosting (id, publisher_id, url, is_group) VALUES (?1, ?2, ?3, ?4)",
            params![new_id(), publisher_id, entry.url, entry.group as i32],
        )?;
    }
    Ok(())
}

/// Look a publisher up by id or alternative id. A primary id match wins.
fn find_publisher(conn: &Connection, id: &str) -> RegistryResult<Option<Publisher>> {
    let publisher = conn
        .query_row(
            &format!(
                "SELECT {} FROM publishers WHERE id = ?1 OR alternative_id = ?1
                 ORDER BY id = ?1 DESC LIMIT 1",
                PUBLISHER_COLUMNS
            ),
            params![id],
            |row| Ok(row_to_publisher(row)),
        )
        .optional()?
        .transpose()?;

    match publisher {
        Some(mut publisher) => {
            publisher.code_hosting = load_code_hosting(conn, &publisher.id)?;
            Ok(Some(publisher))
        }
        None => Ok(None),
    }
}

fn require_publisher(conn: &Connection, id: &str) -> RegistryResult<Publisher> {
    find_publisher(conn, id)?.ok_or_else(|| RegistryError::not_found("Publisher", id))
}

fn validate_email(email: &str) -> RegistryResult<()> {
    if email.is_empty() || !email.contains('@') {
        return Err(RegistryError::validation(format!(
            "'{}' is not a valid email",
            email
        )));
    }
    Ok(())
}

fn validate_code_hosting(hosting: &[CodeHosting]) -> RegistryResult<()> {
    if hosting.is_empty() {
        return Err(RegistryError::validation(
            "a publisher needs at least one code hosting URL",
        ));
    }
    if let Some(entry) = hosting.iter().find(|h| h.url.trim().is_empty()) {
        return Err(RegistryError::invalid_url(&entry.url));
    }
    Ok(())
}

impl Database {
    /// Create a publisher and record a `create` event.
    pub fn create_publisher(&self, new: NewPublisher) -> RegistryResult<Publisher> {
        let email = normalize_email(&new.email);
        validate_email(&email)?;
        validate_code_hosting(&new.code_hosting)?;

        self.mutate(EventType::Create, |tx| {
            let now = Utc::now();
            let publisher = Publisher {
                id: new_id(),
                alternative_id: new.alternative_id.filter(|alt| !alt.is_empty()),
                email,
                description: new.description,
                active: new.active.unwrap_or(true),
                code_hosting: new.code_hosting,
                created_at: now,
                updated_at: now,
            };

            tx.execute(
                "INSERT INTO publishers (id, alternative_id, email, description, active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    publisher.id,
                    publisher.alternative_id,
                    publisher.email,
                    publisher.description,
                    publisher.active as i32,
                    publisher.created_at.to_rfc3339(),
                    publisher.updated_at.to_rfc3339(),
                ],
            )?;
            replace_code_hosting(tx, &publisher.id, &publisher.code_hosting)?;

            Ok(publisher)
        })
    }

    /// Get a publisher by id or alternative id.
    pub fn get_publisher(&self, id: &str) -> RegistryResult<Option<Publisher>> {
        self.read(|conn| find_publisher(conn, id))
    }

    /// All publishers in creation order.
    pub fn list_publishers(&self) -> RegistryResult<Vec<Publisher>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM publishers ORDER BY created_at, rowid",
                PUBLISHER_COLUMNS
            ))?;
            let rows = stmt.query_map([], |row| Ok(row_to_publisher(row)))?;

            let mut publishers = Vec::new();
            for row in rows {
                let mut publisher = row??;
                publisher.code_hosting = load_code_hosting(conn, &publisher.id)?;
                publishers.push(publisher);
            }
            Ok(publishers)
        })
    }

    /// Apply a partial update and record an `update` event.
    pub fn update_publisher(&self, id: &str, update: PublisherUpdate) -> RegistryResult<Publisher> {
        let email = update.email.as_deref().map(normalize_email);
        if let Some(email) = &email {
            validate_email(email)?;
        }
        if let Some(hosting) = &update.code_hosting {
            validate_code_hosting(hosting)?;
        }

        self.mutate(EventType::Update, |tx| {
            let mut publisher = require_publisher(tx, id)?;

            if let Some(email) = email {
                publisher.email = email;
            }
            if let Some(description) = update.description {
                publisher.description = description;
            }
            if let Some(alternative_id) = update.alternative_id {
                publisher.alternative_id = Some(alternative_id).filter(|alt| !alt.is_empty());
            }
            if let Some(active) = update.active {
                publisher.active = active;
            }
            if let Some(hosting) = update.code_hosting {
                replace_code_hosting(tx, &publisher.id, &hosting)?;
                publisher.code_hosting = hosting;
            }
            publisher.updated_at = Utc::now();

            tx.execute(
                "UPDATE publishers SET alternative_id = ?2, email = ?3, description = ?4,
                 active = ?5, updated_at = ?6 WHERE id = ?1",
                params![
                    publisher.id,
                    publisher.alternative_id,
                    publisher.email,
                    publisher.description,
                    publisher.active as i32,
                    publisher.updated_at.to_rfc3339(),
                ],
            )?;

            Ok(publisher)
        })
    }

    /// Delete a publisher and record a `delete` event.
    pub fn delete_publisher(&self, id: &str) -> RegistryResult<Publisher> {
        self.mutate(EventType::Delete, |tx| {
            let publisher = require_publisher(tx, id)?;
            tx.execute("DELETE FROM publishers WHERE id = ?1", params![publisher.id])?;
            Ok(publisher)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support;

    fn new_publisher(email: &str, hosting: &str) -> NewPublisher {
        NewPublisher {
            email: email.to_string(),
            description: "Comune di Esempio".to_string(),
            code_hosting: vec![CodeHosting {
                url: hosting.to_string(),
                group: true,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_create_records_one_event() {
        let (db, mut rx) = test_support::database();

        let publisher = db
            .create_publisher(new_publisher(" Info@Example.ORG", "https://github.com/example"))
            .unwrap();
        assert_eq!(publisher.email, "info@example.org");
        assert!(publisher.active);

        let events = db.list_events_for("publishers", &publisher.id).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::Create);

        let relayed = rx.try_recv().unwrap();
        assert_eq!(relayed.id, events[0].id);
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_get_by_alternative_id() {
        let (db, _rx) = test_support::database();
        let mut new = new_publisher("a@example.org", "https://github.com/a");
        new.alternative_id = Some("c_a123".to_string());
        let created = db.create_publisher(new).unwrap();

        let found = db.get_publisher("c_a123").unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.code_hosting.len(), 1);
        assert!(db.get_publisher("nope").unwrap().is_none());
    }

    #[test]
    fn test_primary_id_wins_over_alternative_id() {
        let (db, _rx) = test_support::database();
        let first = db
            .create_publisher(new_publisher("a@example.org", "https://github.com/a"))
            .unwrap();
        let mut new = new_publisher("b@example.org", "https://github.com/b");
        new.alternative_id = Some(first.id.clone());
        let second = db.create_publisher(new).unwrap();

        assert_eq!(db.get_publisher(&first.id).unwrap().unwrap().id, first.id);
        assert_eq!(db.get_publisher(&second.id).unwrap().unwrap().id, second.id);

        let updated = db
            .update_publisher(
                &first.id,
                PublisherUpdate {
                    description: Some("first".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.id, first.id);
        assert_eq!(updated.email, "a@example.org");
    }

    #[test]
    fn test_duplicate_email_conflicts_without_event() {
        let (db, _rx) = test_support::database();
        db.create_publisher(new_publisher("a@example.org", "https://github.com/a"))
            .unwrap();

        let err = db
            .create_publisher(new_publisher("A@example.org", "https://github.com/b"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Conflict { .. }));
        assert_eq!(db.count_events().unwrap(), 1);
        assert_eq!(db.list_publishers().unwrap().len(), 1);
    }

    #[test]
    fn test_validation() {
        let (db, _rx) = test_support::database();

        assert!(matches!(
            db.create_publisher(new_publisher("not-an-email", "https://github.com/a")),
            Err(RegistryError::Validation { .. })
        ));

        let mut no_hosting = new_publisher("a@example.org", "https://github.com/a");
        no_hosting.code_hosting.clear();
        assert!(matches!(
            db.create_publisher(no_hosting),
            Err(RegistryError::Validation { .. })
        ));
        assert_eq!(db.count_events().unwrap(), 0);
    }

    #[test]
    fn test_update_merges_fields() {
        let (db, _rx) = test_support::database();
        let created = db
            .create_publisher(new_publisher("a@example.org", "https://github.com/a"))
            .unwrap();

        let updated = db
            .update_publisher(
                &created.id,
                PublisherUpdate {
                    active: Some(false),
                    code_hosting: Some(vec![CodeHosting {
                        url: "https://gitlab.com/a".to_string(),
                        group: false,
                    }]),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.email, "a@example.org");
        assert!(!updated.active);
        let stored = db.get_publisher(&created.id).unwrap().unwrap();
        assert_eq!(stored.code_hosting, updated.code_hosting);

        let kinds: Vec<_> = db
            .list_events_for("publishers", &created.id)
            .unwrap()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(kinds, vec![EventType::Create, EventType::Update]);
    }

    #[test]
    fn test_delete() {
        let (db, _rx) = test_support::database();
        let created = db
            .create_publisher(new_publisher("a@example.org", "https://github.com/a"))
            .unwrap();

        db.delete_publisher(&created.id).unwrap();
        assert!(db.get_publisher(&created.id).unwrap().is_none());

        let err = db.delete_publisher(&created.id).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(db.list_events_for("publishers", &created.id).unwrap().len(), 2);
    }
}
