//! Software storage.
//!
//! A software entry owns one canonical URL plus any number of aliases. All of
//! them live in `software_urls`, where a UNIQUE index keeps every URL
//! attached to at most one software entry.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{new_id, parse_timestamp, Database};
use crate::error::{RegistryError, RegistryResult};
use crate::events::EventType;
use crate::types::{NewSoftware, Software, SoftwareUpdate};

const SOFTWARE_COLUMNS: &str = "id, publiccode_yml, active, created_at, updated_at";

fn row_to_software(row: &Row<'_>) -> RegistryResult<Software> {
    let created_at: String = row.get(3)?;
    let updated_at: String = row.get(4)?;

    Ok(Software {
        id: row.get(0)?,
        url: String::new(),
        aliases: Vec::new(),
        publiccode_yml: row.get(1)?,
        active: row.get::<_, i32>(2)? != 0,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn load_urls(conn: &Connection, software: &mut Software) -> RegistryResult<()> {
    let mut stmt = conn.prepare(
        "SELECT url, canonical FROM software_urls WHERE software_id = ?1 ORDER BY url",
    )?;
    let rows = stmt.query_map(params![software.id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i32>(1)? != 0))
    })?;

    software.aliases.clear();
    for row in rows {
        let (url, canonical) = row?;
        if canonical {
            software.url = url;
        } else {
            software.aliases.push(url);
        }
    }
    Ok(())
}

fn replace_urls(conn: &Connection, software: &Software) -> RegistryResult<()> {
    conn.execute(
        "DELETE FROM software_urls WHERE software_id = ?1",
        params![software.id],
    )?;

    let insert = "INSERT INTO software_urls (id, software_id, url, canonical) VALUES (?1, ?2, ?3, ?4)";
    conn.execute(insert, params![new_id(), software.id, software.url, 1])?;
    for alias in &software.aliases {
        conn.execute(insert, params![new_id(), software.id, alias, 0])?;
    }
    Ok(())
}

/// Sort and dedupe aliases, dropping any that repeat the canonical URL.
fn normalize_aliases(url: &str, mut aliases: Vec<String>) -> Vec<String> {
    aliases.retain(|alias| !alias.is_empty() && alias != url);
    aliases.sort();
    aliases.dedup();
    aliases
}

fn find_software(conn: &Connection, id: &str) -> RegistryResult<Option<Software>> {
    let software = conn
        .query_row(
            &format!("SELECT {} FROM software WHERE id = ?1", SOFTWARE_COLUMNS),
            params![id],
            |row| Ok(row_to_software(row)),
        )
        .optional()?
        .transpose()?;

    match software {
        Some(mut software) => {
            load_urls(conn, &mut software)?;
            Ok(Some(software))
        }
        None => Ok(None),
    }
}

fn require_software(conn: &Connection, id: &str) -> RegistryResult<Software> {
    find_software(conn, id)?.ok_or_else(|| RegistryError::not_found("Software", id))
}

fn validate_url(url: &str) -> RegistryResult<()> {
    if url.trim().is_empty() {
        return Err(RegistryError::invalid_url(url));
    }
    Ok(())
}

impl Database {
    /// Create a software entry and record a `create` event.
    pub fn create_software(&self, new: NewSoftware) -> RegistryResult<Software> {
        validate_url(&new.url)?;
        if new.publiccode_yml.trim().is_empty() {
            return Err(RegistryError::validation("publiccodeYml is required"));
        }

        self.mutate(EventType::Create, |tx| {
            let now = Utc::now();
            let software = Software {
                id: new_id(),
                aliases: normalize_aliases(&new.url, new.aliases),
                url: new.url,
                publiccode_yml: new.publiccode_yml,
                active: new.active.unwrap_or(true),
                created_at: now,
                updated_at: now,
            };

            tx.execute(
                "INSERT INTO software (id, publiccode_yml, active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    software.id,
                    software.publiccode_yml,
                    software.active as i32,
                    software.created_at.to_rfc3339(),
                    software.updated_at.to_rfc3339(),
                ],
            )?;
            replace_urls(tx, &software)?;

            Ok(software)
        })
    }

    /// Get a software entry by ID
    pub fn get_software(&self, id: &str) -> RegistryResult<Option<Software>> {
        self.read(|conn| find_software(conn, id))
    }

    /// All software entries in creation order.
    pub fn list_software(&self) -> RegistryResult<Vec<Software>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM software ORDER BY created_at, rowid",
                SOFTWARE_COLUMNS
            ))?;
            let rows = stmt.query_map([], |row| Ok(row_to_software(row)))?;

            let mut entries = Vec::new();
            for row in rows {
                let mut software = row??;
                load_urls(conn, &mut software)?;
                entries.push(software);
            }
            Ok(entries)
        })
    }

    /// Apply a partial update and record an `update` event.
    pub fn update_software(&self, id: &str, update: SoftwareUpdate) -> RegistryResult<Software> {
        if let Some(url) = &update.url {
            validate_url(url)?;
        }

        self.mutate(EventType::Update, |tx| {
            let mut software = require_software(tx, id)?;
            let urls_changed = update.url.is_some() || update.aliases.is_some();

            if let Some(url) = update.url {
                software.url = url;
            }
            let aliases = update.aliases.unwrap_or_else(|| software.aliases.clone());
            software.aliases = normalize_aliases(&software.url, aliases);
            if let Some(publiccode_yml) = update.publiccode_yml {
                software.publiccode_yml = publiccode_yml;
            }
            if let Some(active) = update.active {
                software.active = active;
            }
            software.updated_at = Utc::now();

            if urls_changed {
                replace_urls(tx, &software)?;
            }
            tx.execute(
                "UPDATE software SET publiccode_yml = ?2, active = ?3, updated_at = ?4 WHERE id = ?1",
                params![
                    software.id,
                    software.publiccode_yml,
                    software.active as i32,
                    software.updated_at.to_rfc3339(),
                ],
            )?;

            Ok(software)
        })
    }

    /// Delete a software entry and record a `delete` event.
    pub fn delete_software(&self, id: &str) -> RegistryResult<Software> {
        self.mutate(EventType::Delete, |tx| {
            let software = require_software(tx, id)?;
            tx.execute("DELETE FROM software WHERE id = ?1", params![software.id])?;
            Ok(software)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support;

    fn new_software(url: &str) -> NewSoftware {
        NewSoftware {
            url: url.to_string(),
            publiccode_yml: "publiccodeYmlVersion: \"0.2\"".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_and_get() {
        let (db, mut rx) = test_support::database();
        let mut new = new_software("https://github.com/example/app");
        new.aliases = vec![
            "https://gitlab.com/example/app".to_string(),
            "https://github.com/example/app".to_string(),
            "https://gitlab.com/example/app".to_string(),
        ];

        let created = db.create_software(new).unwrap();
        assert_eq!(created.aliases, vec!["https://gitlab.com/example/app"]);

        let stored = db.get_software(&created.id).unwrap().unwrap();
        assert_eq!(stored, created);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.event_type, EventType::Create);
        assert_eq!(event.subject(), format!("/software/{}", created.id));
    }

    #[test]
    fn test_url_taken_by_other_software_conflicts() {
        let (db, _rx) = test_support::database();
        db.create_software(new_software("https://github.com/example/app"))
            .unwrap();

        let mut other = new_software("https://github.com/example/other");
        other.aliases = vec!["https://github.com/example/app".to_string()];
        let err = db.create_software(other).unwrap_err();

        assert!(matches!(err, RegistryError::Conflict { .. }));
        assert_eq!(db.list_software().unwrap().len(), 1);
        assert_eq!(db.count_events().unwrap(), 1);
    }

    #[test]
    fn test_update_keeps_untouched_fields() {
        let (db, _rx) = test_support::database();
        let created = db
            .create_software(new_software("https://github.com/example/app"))
            .unwrap();

        let updated = db
            .update_software(
                &created.id,
                SoftwareUpdate {
                    active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(!updated.active);
        assert_eq!(updated.url, created.url);
        assert_eq!(updated.publiccode_yml, created.publiccode_yml);

        let moved = db
            .update_software(
                &created.id,
                SoftwareUpdate {
                    url: Some("https://gitlab.com/example/app".to_string()),
                    aliases: Some(vec!["https://github.com/example/app".to_string()]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(moved.url, "https://gitlab.com/example/app");
        assert_eq!(
            db.get_software(&created.id).unwrap().unwrap().aliases,
            vec!["https://github.com/example/app"]
        );
        assert_eq!(db.list_events_for("software", &created.id).unwrap().len(), 3);
    }

    #[test]
    fn test_update_missing_software() {
        let (db, mut rx) = test_support::database();
        let err = db
            .update_software("S404", SoftwareUpdate::default())
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(db.count_events().unwrap(), 0);
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_delete_cascades_urls() {
        let (db, _rx) = test_support::database();
        let created = db
            .create_software(new_software("https://github.com/example/app"))
            .unwrap();
        db.delete_software(&created.id).unwrap();

        db.create_software(new_software("https://github.com/example/app"))
            .unwrap();
        assert_eq!(db.list_software().unwrap().len(), 1);
    }
}
