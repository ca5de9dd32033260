//! SQLite-backed tag directory.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;
use zonetrack_core::{CoreError, CustomerRecord, ReadRecord, TagDirectory};

use crate::error::DbError;
use crate::schema::init_schema;

const TAG_COLUMNS: &str =
    "tag_id, customer_name, dog_name, dog_breed, vehicle, notes, created_at, last_seen";

/// Tag directory and read log in one SQLite file.
pub struct SqliteDirectory {
    conn: Mutex<Connection>,
}

impl SqliteDirectory {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened tag database");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, DbError> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Directory management ─────────────────────────────────────────

    /// Register a new tag. All text fields are trimmed; the tag id must
    /// be non-empty and not already registered.
    pub fn register_tag(&self, record: &CustomerRecord) -> Result<CustomerRecord, DbError> {
        let tag_id = record.tag_id.trim();
        if tag_id.is_empty() {
            return Err(DbError::MissingTagId);
        }

        let conn = self.conn();
        let exists = conn
            .query_row("SELECT 1 FROM tags WHERE tag_id = ?1", [tag_id], |_| Ok(()))
            .optional()?
            .is_some();
        if exists {
            return Err(DbError::TagExists {
                tag_id: tag_id.to_owned(),
            });
        }

        let created_at = Utc::now();
        let stored = CustomerRecord {
            tag_id: tag_id.to_owned(),
            customer_name: record.customer_name.trim().to_owned(),
            dog_name: record.dog_name.trim().to_owned(),
            dog_breed: record.dog_breed.trim().to_owned(),
            vehicle: record.vehicle.trim().to_owned(),
            notes: record.notes.trim().to_owned(),
            created_at: Some(created_at),
            last_seen: None,
        };

        conn.execute(
            "INSERT INTO tags (tag_id, customer_name, dog_name, dog_breed, vehicle, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                stored.tag_id,
                stored.customer_name,
                stored.dog_name,
                stored.dog_breed,
                stored.vehicle,
                stored.notes,
                to_db_time(created_at),
            ],
        )?;
        debug!(tag_id = %stored.tag_id, "registered tag");
        Ok(stored)
    }

    pub fn get_tag(&self, tag_id: &str) -> Result<Option<CustomerRecord>, DbError> {
        let conn = self.conn();
        let sql = format!("SELECT {TAG_COLUMNS} FROM tags WHERE tag_id = ?1");
        Ok(conn.query_row(&sql, [tag_id], map_customer).optional()?)
    }

    /// Every registered tag, most recently seen first.
    pub fn list_tags(&self) -> Result<Vec<CustomerRecord>, DbError> {
        let conn = self.conn();
        let sql = format!(
            "SELECT {TAG_COLUMNS} FROM tags
             ORDER BY last_seen IS NULL, last_seen DESC, created_at DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], map_customer)?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Delete a tag from the directory. Its read history is kept.
    pub fn delete_tag(&self, tag_id: &str) -> Result<(), DbError> {
        let deleted = self
            .conn()
            .execute("DELETE FROM tags WHERE tag_id = ?1", [tag_id])?;
        if deleted == 0 {
            return Err(DbError::TagNotFound {
                tag_id: tag_id.to_owned(),
            });
        }
        Ok(())
    }

    // ── Read log ─────────────────────────────────────────────────────

    pub fn insert_read(&self, read: &ReadRecord) -> Result<(), DbError> {
        self.conn().execute(
            "INSERT INTO tag_reads (tag_id, zone_ordinal, zone_name, controller_id, controller_ip, read_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                read.tag_id,
                i64::from(read.zone_ordinal),
                read.zone_name,
                read.controller_id,
                read.controller_ip,
                to_db_time(read.read_at),
            ],
        )?;
        Ok(())
    }

    pub fn touch_and_get(
        &self,
        tag_id: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<Option<CustomerRecord>, DbError> {
        let conn = self.conn();
        let updated = conn.execute(
            "UPDATE tags SET last_seen = ?1 WHERE tag_id = ?2",
            params![to_db_time(seen_at), tag_id],
        )?;
        if updated == 0 {
            return Ok(None);
        }
        let sql = format!("SELECT {TAG_COLUMNS} FROM tags WHERE tag_id = ?1");
        Ok(conn.query_row(&sql, [tag_id], map_customer).optional()?)
    }
}

impl TagDirectory for SqliteDirectory {
    fn log_read(&self, read: &ReadRecord) -> Result<(), CoreError> {
        self.insert_read(read).map_err(CoreError::from)
    }

    fn lookup_and_touch(
        &self,
        tag_id: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<Option<CustomerRecord>, CoreError> {
        self.touch_and_get(tag_id, seen_at).map_err(CoreError::from)
    }
}

// ── Row mapping ──────────────────────────────────────────────────────

pub(crate) fn to_db_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn from_db_time(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(DbError::InvalidTimestamp(raw.to_owned())),
            )
        })
}

fn map_customer(row: &Row) -> rusqlite::Result<CustomerRecord> {
    let created_at: String = row.get("created_at")?;
    let last_seen: Option<String> = row.get("last_seen")?;

    Ok(CustomerRecord {
        tag_id: row.get("tag_id")?,
        customer_name: row.get("customer_name")?,
        dog_name: row.get("dog_name")?,
        dog_breed: row.get("dog_breed")?,
        vehicle: row.get("vehicle")?,
        notes: row.get("notes")?,
        created_at: Some(from_db_time(6, &created_at)?),
        last_seen: last_seen.as_deref().map(|s| from_db_time(7, s)).transpose()?,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn record(tag: &str, name: &str) -> CustomerRecord {
        CustomerRecord {
            customer_name: name.into(),
            dog_name: "  Biscuit ".into(),
            ..CustomerRecord::bare(tag)
        }
    }

    #[test]
    fn register_trims_and_rejects_duplicates() {
        let db = SqliteDirectory::open_in_memory().unwrap();
        let stored = db.register_tag(&record("  TAG-1  ", " Jane ")).unwrap();
        assert_eq!(stored.tag_id, "TAG-1");
        assert_eq!(stored.customer_name, "Jane");
        assert_eq!(stored.dog_name, "Biscuit");

        assert!(matches!(
            db.register_tag(&record("TAG-1", "Other")),
            Err(DbError::TagExists { .. })
        ));
        assert!(matches!(
            db.register_tag(&record("   ", "Nobody")),
            Err(DbError::MissingTagId)
        ));
    }

    #[test]
    fn lookup_touches_last_seen() {
        let db = SqliteDirectory::open_in_memory().unwrap();
        db.register_tag(&record("TAG-1", "Jane")).unwrap();

        let seen = Utc::now();
        let found = db.lookup_and_touch("TAG-1", seen).unwrap().unwrap();
        assert_eq!(found.customer_name, "Jane");
        assert_eq!(
            found.last_seen.map(to_db_time),
            Some(to_db_time(seen))
        );
        assert!(db.lookup_and_touch("missing", seen).unwrap().is_none());
    }

    #[test]
    fn list_orders_by_last_seen() {
        let db = SqliteDirectory::open_in_memory().unwrap();
        for tag in ["A", "B", "C"] {
            db.register_tag(&record(tag, tag)).unwrap();
        }
        let now = Utc::now();
        db.touch_and_get("A", now - Duration::minutes(10)).unwrap();
        db.touch_and_get("C", now).unwrap();

        let order: Vec<String> = db.list_tags().unwrap().into_iter().map(|r| r.tag_id).collect();
        assert_eq!(order, vec!["C", "A", "B"]);
    }

    #[test]
    fn delete_tag() {
        let db = SqliteDirectory::open_in_memory().unwrap();
        db.register_tag(&record("A", "Jane")).unwrap();
        db.delete_tag("A").unwrap();
        assert!(db.get_tag("A").unwrap().is_none());
        assert!(matches!(db.delete_tag("A"), Err(DbError::TagNotFound { .. })));
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("tags.db");
        {
            let db = SqliteDirectory::open(&path).unwrap();
            db.register_tag(&record("A", "Jane")).unwrap();
        }
        let db = SqliteDirectory::open(&path).unwrap();
        assert_eq!(db.get_tag("A").unwrap().unwrap().customer_name, "Jane");
    }

    #[test]
    fn errors_map_into_core() {
        assert!(matches!(
            CoreError::from(DbError::TagExists { tag_id: "A".into() }),
            CoreError::TagExists { .. }
        ));
        assert!(matches!(
            CoreError::from(DbError::MissingTagId),
            CoreError::ValidationFailed { .. }
        ));
    }
}
