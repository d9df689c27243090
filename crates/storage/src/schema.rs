use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

fn apply_pragmas(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    Ok(())
}

pub fn init_store_schema(conn: &Connection) -> Result<(), StorageError> {
    apply_pragmas(conn)?;
    conn.execute_batch(STORE_SCHEMA_SQL)?;
    Ok(())
}

pub fn init_cache_schema(conn: &Connection) -> Result<(), StorageError> {
    apply_pragmas(conn)?;
    conn.execute_batch(CACHE_SCHEMA_SQL)?;
    Ok(())
}

const STORE_SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS documents (
    rowid INTEGER PRIMARY KEY,
    collection TEXT NOT NULL,
    doc_id BLOB NOT NULL CHECK (length(doc_id) = 16),
    created_at INTEGER NOT NULL DEFAULT (CAST(unixepoch('now','subsec') * 1000 AS INTEGER)),
    UNIQUE (collection, doc_id)
);

CREATE TABLE IF NOT EXISTS fields (
    collection TEXT NOT NULL,
    doc_id BLOB NOT NULL CHECK (length(doc_id) = 16),
    field_key TEXT NOT NULL,
    value BLOB NOT NULL,
    updated_at INTEGER NOT NULL DEFAULT (CAST(unixepoch('now','subsec') * 1000 AS INTEGER)),
    PRIMARY KEY (collection, doc_id, field_key),
    FOREIGN KEY (collection, doc_id) REFERENCES documents (collection, doc_id)
);
";

const CACHE_SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS cache_entries (
    cache_key TEXT PRIMARY KEY,
    value BLOB NOT NULL,
    written_at INTEGER NOT NULL DEFAULT (CAST(unixepoch('now','subsec') * 1000 AS INTEGER))
);
";
