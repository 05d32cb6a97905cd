//! Ingestion layer: schema detection and canonical record mapping
//!
//! This module turns a message database (Layer 0, never written) into the
//! canonical [`Dataset`](crate::types::Dataset).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │  msgstore.db    │ ──► │  detect()        │ ──► │ SchemaGeneration│
//! │  (read-only)    │     │  inspect tables  │     │                 │
//! └─────────────────┘     └──────────────────┘     └─────────────────┘
//!                                                           │
//!                                                           ▼
//!                                              ┌──────────────────────────┐
//!                                              │  ExtractionStrategy      │
//!                                              │  ├─ NormalizedStrategy   │
//!                                              │  └─ LegacyStrategy       │
//!                                              └──────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chatlens_core::ingest::{self, strategies::strategy_for, KindTable};
//!
//! let conn = ingest::open_read_only(path)?;
//! let generation = ingest::detect(&conn)?;
//! let dataset = strategy_for(generation).extract(&conn, &KindTable::default())?;
//! ```

mod classify;
mod detect;
pub mod strategies;
mod strategy;

pub use classify::KindTable;
pub use detect::{detect, SchemaGeneration};
pub use strategy::ExtractionStrategy;

use crate::error::{Error, Result};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;

/// Open a SQLite database without write access.
///
/// Fails with [`Error::InputNotFound`] when the file does not exist, so a
/// typo never creates an empty database.
pub fn open_read_only(path: &Path) -> Result<Connection> {
    if !path.is_file() {
        return Err(Error::InputNotFound(path.to_path_buf()));
    }

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    // Fails here, not at the first query, when the file is not a database
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
        row.get::<_, i64>(0)
    })?;

    Ok(conn)
}

/// Whether a table with this name exists.
pub fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let exists: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(exists.is_some())
}

/// Whether `table` has a column named `column`.
///
/// Returns `false` for a missing table.
pub fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{}\")", table))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// First column of `preferred` that exists on `table`.
pub fn pick_column(conn: &Connection, table: &str, preferred: &[&str]) -> Result<Option<String>> {
    for col in preferred {
        if column_exists(conn, table, col)? {
            return Ok(Some((*col).to_string()));
        }
    }
    Ok(None)
}

/// Names of all tables, sorted. Used for diagnostics.
pub fn list_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE message (_id INTEGER PRIMARY KEY, chat_row_id INTEGER, text_data TEXT);
             CREATE TABLE chat (_id INTEGER PRIMARY KEY);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_table_and_column_lookups() {
        let conn = conn();
        assert!(table_exists(&conn, "message").unwrap());
        assert!(!table_exists(&conn, "messages").unwrap());
        assert!(column_exists(&conn, "message", "chat_row_id").unwrap());
        assert!(!column_exists(&conn, "message", "sender_jid_row_id").unwrap());
        assert!(!column_exists(&conn, "nope", "x").unwrap());
    }

    #[test]
    fn test_pick_column_and_list_tables() {
        let conn = conn();
        assert_eq!(
            pick_column(&conn, "message", &["data", "text_data"]).unwrap(),
            Some("text_data".to_string())
        );
        assert_eq!(pick_column(&conn, "message", &["data"]).unwrap(), None);
        assert_eq!(list_tables(&conn).unwrap(), vec!["chat", "message"]);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_read_only(&dir.path().join("missing.db")).unwrap_err();
        assert!(matches!(err, Error::InputNotFound(_)));
        assert!(!dir.path().join("missing.db").exists());
    }

    #[test]
    fn test_open_is_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ro.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE t (x INTEGER)")
            .unwrap();

        let conn = open_read_only(&path).unwrap();
        assert!(conn.execute("INSERT INTO t VALUES (1)", []).is_err());
    }
}
