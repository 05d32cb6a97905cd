//! Schema generation detection.
//!
//! Detection is structural only: table and column presence, never row content.

use super::{column_exists, list_tables, table_exists};
use crate::error::{Error, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fmt;

/// On-disk layout of a message database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaGeneration {
    /// Normalized tables with per-message sender and a LID link table
    LidNormalized,
    /// Normalized tables with per-message sender
    Normalized,
    /// Normalized tables without a sender column; sender is the chat
    ChatScoped,
    /// Single flat `messages` table keyed by remote identifier
    Legacy,
}

impl SchemaGeneration {
    /// Every generation, in detection priority order (most modern first).
    pub const PRIORITY: [SchemaGeneration; 4] = [
        SchemaGeneration::LidNormalized,
        SchemaGeneration::Normalized,
        SchemaGeneration::ChatScoped,
        SchemaGeneration::Legacy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaGeneration::LidNormalized => "lid_normalized",
            SchemaGeneration::Normalized => "normalized",
            SchemaGeneration::ChatScoped => "chat_scoped",
            SchemaGeneration::Legacy => "legacy",
        }
    }

    /// Whether this generation stores messages in the normalized
    /// `message`/`chat`/`jid` tables.
    pub fn is_normalized(&self) -> bool {
        !matches!(self, SchemaGeneration::Legacy)
    }

    fn matches(&self, conn: &Connection) -> Result<bool> {
        let normalized_tables = || -> Result<bool> {
            Ok(table_exists(conn, "message")?
                && table_exists(conn, "chat")?
                && table_exists(conn, "jid")?)
        };

        match self {
            SchemaGeneration::LidNormalized => Ok(normalized_tables()?
                && table_exists(conn, "jid_map")?
                && column_exists(conn, "message", "sender_jid_row_id")?),
            SchemaGeneration::Normalized => Ok(normalized_tables()?
                && column_exists(conn, "message", "sender_jid_row_id")?),
            SchemaGeneration::ChatScoped => {
                Ok(normalized_tables()? && column_exists(conn, "message", "chat_row_id")?)
            }
            SchemaGeneration::Legacy => Ok(table_exists(conn, "messages")?
                && column_exists(conn, "messages", "key_remote_jid")?
                && column_exists(conn, "messages", "key_from_me")?),
        }
    }
}

impl fmt::Display for SchemaGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a message database into a schema generation.
///
/// Generations are tried in [`SchemaGeneration::PRIORITY`] order and the
/// first match wins. Fails with [`Error::UnsupportedSchema`] listing the
/// tables that were seen when nothing matches.
pub fn detect(conn: &Connection) -> Result<SchemaGeneration> {
    for generation in SchemaGeneration::PRIORITY {
        if generation.matches(conn)? {
            tracing::debug!(generation = %generation, "Schema generation matched");
            return Ok(generation);
        }
    }

    let tables = list_tables(conn)?;
    tracing::warn!(tables = ?tables, "No supported schema generation matched");
    Err(Error::UnsupportedSchema { tables })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db(sql: &str) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(sql).unwrap();
        conn
    }

    const NORMALIZED_BASE: &str = "
        CREATE TABLE chat (_id INTEGER PRIMARY KEY, jid_row_id INTEGER, subject TEXT);
        CREATE TABLE jid (_id INTEGER PRIMARY KEY, user TEXT, server TEXT, raw_string TEXT);
    ";

    #[test]
    fn test_detect_lid_normalized() {
        let conn = db(&format!(
            "{NORMALIZED_BASE}
             CREATE TABLE message (_id INTEGER PRIMARY KEY, chat_row_id INTEGER, sender_jid_row_id INTEGER);
             CREATE TABLE jid_map (lid_row_id INTEGER, jid_row_id INTEGER);"
        ));
        assert_eq!(detect(&conn).unwrap(), SchemaGeneration::LidNormalized);
    }

    #[test]
    fn test_detect_normalized() {
        let conn = db(&format!(
            "{NORMALIZED_BASE}
             CREATE TABLE message (_id INTEGER PRIMARY KEY, chat_row_id INTEGER, sender_jid_row_id INTEGER);"
        ));
        assert_eq!(detect(&conn).unwrap(), SchemaGeneration::Normalized);
    }

    #[test]
    fn test_detect_chat_scoped() {
        let conn = db(&format!(
            "{NORMALIZED_BASE}
             CREATE TABLE message (_id INTEGER PRIMARY KEY, chat_row_id INTEGER);
             CREATE TABLE jid_map (lid_row_id INTEGER, jid_row_id INTEGER);"
        ));
        // jid_map alone does not make a LID generation without a sender column
        assert_eq!(detect(&conn).unwrap(), SchemaGeneration::ChatScoped);
    }

    #[test]
    fn test_detect_legacy() {
        let conn = db("CREATE TABLE messages (_id INTEGER PRIMARY KEY, key_remote_jid TEXT, key_from_me INTEGER, data TEXT);");
        assert_eq!(detect(&conn).unwrap(), SchemaGeneration::Legacy);
    }

    #[test]
    fn test_detect_prefers_modern_when_both_present() {
        let conn = db(&format!(
            "{NORMALIZED_BASE}
             CREATE TABLE message (_id INTEGER PRIMARY KEY, chat_row_id INTEGER, sender_jid_row_id INTEGER);
             CREATE TABLE messages (_id INTEGER PRIMARY KEY, key_remote_jid TEXT, key_from_me INTEGER);"
        ));
        assert_eq!(detect(&conn).unwrap(), SchemaGeneration::Normalized);
    }

    #[test]
    fn test_detect_unsupported() {
        let conn = db("CREATE TABLE notes (id INTEGER); CREATE TABLE messages (id INTEGER);");
        match detect(&conn) {
            Err(Error::UnsupportedSchema { tables }) => {
                assert_eq!(tables, vec!["messages".to_string(), "notes".to_string()]);
            }
            other => panic!("expected UnsupportedSchema, got {:?}", other),
        }
    }

    #[test]
    fn test_detect_empty_database() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(
            detect(&conn),
            Err(Error::UnsupportedSchema { .. })
        ));
    }

    #[test]
    fn test_generation_tags() {
        let tags: Vec<&str> = SchemaGeneration::PRIORITY
            .iter()
            .map(|g| g.as_str())
            .collect();
        assert_eq!(tags, vec!["lid_normalized", "normalized", "chat_scoped", "legacy"]);
        assert_eq!(
            serde_json::to_string(&SchemaGeneration::ChatScoped).unwrap(),
            "\"chat_scoped\""
        );
    }
}
