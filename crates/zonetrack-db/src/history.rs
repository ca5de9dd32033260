//! Read-log queries.

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Row, params_from_iter};
use serde::Serialize;

use crate::directory::{SqliteDirectory, from_db_time, to_db_time};
use crate::error::DbError;

/// Rows returned by a zone history query when no limit is given.
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// Reads returned for a single tag.
pub const TAG_HISTORY_LIMIT: usize = 50;

/// Filter for [`SqliteDirectory::zone_history`]. `from` is inclusive,
/// `to` exclusive.
#[derive(Debug, Clone)]
pub struct HistoryFilter {
    pub zone: Option<u8>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub tag_id: Option<String>,
    pub limit: usize,
}

impl Default for HistoryFilter {
    fn default() -> Self {
        Self {
            zone: None,
            from: None,
            to: None,
            tag_id: None,
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// One logged read, joined with the tag's customer data when registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadEntry {
    pub tag_id: String,
    pub zone_ordinal: u8,
    pub zone_name: String,
    pub controller_id: String,
    pub controller_ip: String,
    pub read_at: DateTime<Utc>,
    pub customer_name: Option<String>,
    pub dog_name: Option<String>,
}

const READ_SELECT: &str = "
    SELECT r.tag_id, r.zone_ordinal, r.zone_name, r.controller_id, r.controller_ip, r.read_at,
           t.customer_name, t.dog_name
    FROM tag_reads r
    LEFT JOIN tags t ON t.tag_id = r.tag_id";

impl SqliteDirectory {
    /// Reads matching `filter`, newest first.
    pub fn zone_history(&self, filter: &HistoryFilter) -> Result<Vec<ReadEntry>, DbError> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<Value> = Vec::new();

        if let Some(zone) = filter.zone {
            clauses.push("r.zone_ordinal = ?");
            args.push(Value::Integer(i64::from(zone)));
        }
        if let Some(from) = filter.from {
            clauses.push("r.read_at >= ?");
            args.push(Value::Text(to_db_time(from)));
        }
        if let Some(to) = filter.to {
            clauses.push("r.read_at < ?");
            args.push(Value::Text(to_db_time(to)));
        }
        if let Some(tag_id) = &filter.tag_id {
            clauses.push("r.tag_id = ?");
            args.push(Value::Text(tag_id.clone()));
        }

        let mut sql = READ_SELECT.to_owned();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY r.read_at DESC, r.id DESC LIMIT ?");
        args.push(Value::Integer(i64::try_from(filter.limit).unwrap_or(i64::MAX)));

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args), map_read)?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// The most recent reads of one tag, newest first.
    pub fn tag_history(&self, tag_id: &str) -> Result<Vec<ReadEntry>, DbError> {
        self.zone_history(&HistoryFilter {
            tag_id: Some(tag_id.to_owned()),
            limit: TAG_HISTORY_LIMIT,
            ..HistoryFilter::default()
        })
    }
}

fn map_read(row: &Row) -> rusqlite::Result<ReadEntry> {
    let read_at: String = row.get("read_at")?;
    let zone: i64 = row.get("zone_ordinal")?;
    let zone_ordinal = u8::try_from(zone).map_err(|_| {
        rusqlite::Error::IntegralValueOutOfRange(1, zone)
    })?;

    Ok(ReadEntry {
        tag_id: row.get("tag_id")?,
        zone_ordinal,
        zone_name: row.get("zone_name")?,
        controller_id: row.get("controller_id")?,
        controller_ip: row.get("controller_ip")?,
        read_at: from_db_time(5, &read_at)?,
        customer_name: row.get("customer_name")?,
        dog_name: row.get("dog_name")?,
    })
}
