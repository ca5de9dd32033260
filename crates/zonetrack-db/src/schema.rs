//! Schema creation. Idempotent; safe to run on every open.

use rusqlite::Connection;

pub const SCHEMA_VERSION: i64 = 1;

pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r"
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS tags (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            tag_id         TEXT NOT NULL UNIQUE,
            customer_name  TEXT NOT NULL DEFAULT '',
            dog_name       TEXT NOT NULL DEFAULT '',
            dog_breed      TEXT NOT NULL DEFAULT '',
            vehicle        TEXT NOT NULL DEFAULT '',
            notes          TEXT NOT NULL DEFAULT '',
            created_at     TEXT NOT NULL,
            last_seen      TEXT
        );

        CREATE TABLE IF NOT EXISTS tag_reads (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            tag_id         TEXT NOT NULL,
            zone_ordinal   INTEGER NOT NULL,
            zone_name      TEXT NOT NULL,
            controller_id  TEXT NOT NULL,
            controller_ip  TEXT NOT NULL,
            read_at        TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tag_reads_tag  ON tag_reads(tag_id);
        CREATE INDEX IF NOT EXISTS idx_tag_reads_time ON tag_reads(read_at);
        CREATE INDEX IF NOT EXISTS idx_tag_reads_zone ON tag_reads(zone_ordinal);
        ",
    )?;

    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }
    Ok(())
}
