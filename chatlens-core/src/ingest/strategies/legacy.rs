//! Extraction for the flat `messages` layout.

use super::{map_rows, text_cell, IntCell, RawRow, RawSender, DELETED_STATUS};
use crate::error::Result;
use crate::ingest::{
    column_exists, pick_column, table_exists, ExtractionStrategy, KindTable, SchemaGeneration,
};
use crate::types::{ChatKind, Dataset};
use rusqlite::Connection;
use std::collections::BTreeMap;

/// `status` value of system notices in this layout.
const SYSTEM_STATUS: i64 = 6;

/// Chat identifier of the placeholder row the source keeps at the top.
const PSEUDO_CHAT: &str = "-1";

/// Strategy for `legacy` databases.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyStrategy;

impl LegacyStrategy {
    pub fn new() -> Self {
        Self
    }
}

fn column_or_null(conn: &Connection, preferred: &[&str]) -> Result<String> {
    Ok(pick_column(conn, "messages", preferred)?.unwrap_or_else(|| "NULL".to_string()))
}

impl ExtractionStrategy for LegacyStrategy {
    fn generation(&self) -> SchemaGeneration {
        SchemaGeneration::Legacy
    }

    fn extract(&self, conn: &Connection, kinds: &KindTable) -> Result<Dataset> {
        let sql = format!(
            "SELECT _id, key_remote_jid, key_from_me, {timestamp}, {text}, {kind},
                    {status}, {resource}, {size}, {mime}
             FROM messages
             WHERE key_remote_jid IS NULL OR key_remote_jid != ?1",
            timestamp = column_or_null(conn, &["timestamp"])?,
            text = column_or_null(conn, &["data", "text_data"])?,
            kind = column_or_null(conn, &["media_wa_type", "message_type"])?,
            status = column_or_null(conn, &["status"])?,
            resource = column_or_null(conn, &["remote_resource"])?,
            size = column_or_null(conn, &["media_size"])?,
            mime = column_or_null(conn, &["media_mime_type"])?,
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([PSEUDO_CHAT], |row| {
                let chat_id = text_cell(row, 1)?;
                let from_me = IntCell::read(row, 2)?.value();
                let status = IntCell::read(row, 6)?.value();
                let resource = text_cell(row, 7)?;

                let sender = if from_me == Some(1) {
                    RawSender::Me
                } else {
                    match chat_id.as_deref().map(ChatKind::from_identifier) {
                        Some(ChatKind::Group) => resource
                            .filter(|r| !r.is_empty())
                            .map(RawSender::Known)
                            .unwrap_or(RawSender::Dangling),
                        _ => RawSender::Known(chat_id.clone().unwrap_or_default()),
                    }
                };

                Ok(RawRow {
                    id: row.get(0)?,
                    // chats are keyed by identifier; there is no row to dangle
                    chat_found: true,
                    chat_id,
                    sender,
                    timestamp_ms: IntCell::read(row, 3)?,
                    text: text_cell(row, 4)?,
                    type_code: IntCell::read(row, 5)?,
                    system: status == Some(SYSTEM_STATUS),
                    byte_size: IntCell::read(row, 8)?.value(),
                    mime_type: text_cell(row, 9)?,
                    deleted: status == Some(DELETED_STATUS),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let row_count = rows.len();
        let (messages, skipped) = map_rows(rows, kinds);
        let subjects = read_subjects(conn)?;

        tracing::info!(
            generation = %SchemaGeneration::Legacy,
            rows = row_count,
            messages = messages.len(),
            skipped = skipped.total,
            "Extracted message database"
        );

        Ok(Dataset::assemble(
            SchemaGeneration::Legacy,
            messages,
            &subjects,
            BTreeMap::new(),
            skipped,
        ))
    }
}

/// Group subjects from `chat_list`, when the database has one.
fn read_subjects(conn: &Connection) -> Result<BTreeMap<String, String>> {
    if !table_exists(conn, "chat_list")?
        || !column_exists(conn, "chat_list", "key_remote_jid")?
        || !column_exists(conn, "chat_list", "subject")?
    {
        return Ok(BTreeMap::new());
    }

    let mut stmt = conn.prepare(
        "SELECT key_remote_jid, subject FROM chat_list
         WHERE key_remote_jid IS NOT NULL AND subject IS NOT NULL",
    )?;
    let subjects = stmt
        .query_map([], |row| Ok((text_cell(row, 0)?, text_cell(row, 1)?)))?
        .filter_map(|r| match r {
            Ok((Some(id), Some(subject))) => Some(Ok((id, subject))),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
        .collect::<std::result::Result<BTreeMap<_, _>, _>>()?;

    Ok(subjects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentKind, Sender, SkipReason};

    fn db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE messages (_id INTEGER PRIMARY KEY, key_remote_jid TEXT, key_from_me INTEGER,
                 status INTEGER, data TEXT, timestamp INTEGER, media_wa_type INTEGER,
                 media_size INTEGER, media_mime_type TEXT, remote_resource TEXT);
             CREATE TABLE chat_list (_id INTEGER PRIMARY KEY, key_remote_jid TEXT, subject TEXT);

             INSERT INTO chat_list VALUES (1, 'club@g.us', 'Book club');

             INSERT INTO messages VALUES (1, '-1', 0, 0, NULL, 1, 0, NULL, NULL, NULL);
             INSERT INTO messages VALUES (2, 'a@s.whatsapp.net', 0, 0, 'hi', 1000, 0, NULL, NULL, NULL);
             INSERT INTO messages VALUES (3, 'a@s.whatsapp.net', 1, 0, NULL, 2000, 1, 4096, 'image/jpeg', NULL);
             INSERT INTO messages VALUES (4, 'club@g.us', 0, 0, 'chapter 3?', 3000, 0, NULL, NULL, 'b@s.whatsapp.net');
             INSERT INTO messages VALUES (5, 'club@g.us', 0, 6, NULL, 4000, 0, NULL, NULL, 'b@s.whatsapp.net');
             INSERT INTO messages VALUES (6, 'club@g.us', 0, 0, 'anon', 5000, 0, NULL, NULL, NULL);
             INSERT INTO messages VALUES (7, NULL, 0, 0, 'lost', 6000, 0, NULL, NULL, NULL);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_extract_legacy() {
        let conn = db();
        let ds = LegacyStrategy::new()
            .extract(&conn, &KindTable::default())
            .unwrap();

        assert_eq!(ds.generation, SchemaGeneration::Legacy);
        let ids: Vec<i64> = ds.messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2, 3, 4, 5]);

        assert_eq!(
            ds.messages[0].sender,
            Sender::Participant("a@s.whatsapp.net".to_string())
        );
        assert_eq!(ds.messages[1].sender, Sender::Me);
        assert_eq!(ds.messages[1].kind, ContentKind::Photo);
        assert_eq!(ds.messages[1].byte_size, Some(4096));
        assert_eq!(
            ds.messages[2].sender,
            Sender::Participant("b@s.whatsapp.net".to_string())
        );
        assert_eq!(ds.messages[3].kind, ContentKind::System);

        assert_eq!(ds.skipped.count(SkipReason::DanglingSender), 1);
        assert_eq!(ds.skipped.count(SkipReason::MissingChatIdentifier), 1);

        let club = ds.chat("club@g.us").unwrap();
        assert_eq!(club.subject.as_deref(), Some("Book club"));
    }

    #[test]
    fn test_deleted_status_flags_message() {
        let conn = db();
        conn.execute_batch(
            "INSERT INTO messages VALUES (8, 'a@s.whatsapp.net', 0, 13, NULL, 7000, 0, NULL, NULL, NULL);",
        )
        .unwrap();
        let ds = LegacyStrategy::new()
            .extract(&conn, &KindTable::default())
            .unwrap();

        let deleted: Vec<i64> = ds
            .messages
            .iter()
            .filter(|m| m.deleted)
            .map(|m| m.id)
            .collect();
        assert_eq!(deleted, vec![8]);
        // system notices are not deletions
        assert!(!ds.messages.iter().any(|m| m.deleted && m.kind == ContentKind::System));
    }

    #[test]
    fn test_undecodable_cells_are_skipped_or_decoded() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE messages (_id INTEGER PRIMARY KEY, key_remote_jid TEXT, key_from_me INTEGER,
                 status INTEGER, data TEXT, timestamp INTEGER, media_wa_type INTEGER,
                 media_size INTEGER, media_mime_type TEXT, remote_resource TEXT);

             INSERT INTO messages VALUES (1, 'a@s.whatsapp.net', 0, 0, 'ok', 1000, 0, NULL, NULL, NULL);
             INSERT INTO messages VALUES (2, 'a@s.whatsapp.net', 0, 0, CAST(x'C328' AS TEXT), 2000, 0, NULL, NULL, NULL);
             INSERT INTO messages VALUES (3, 'a@s.whatsapp.net', 1, 0, x'796F', 3000, 0, NULL, NULL, NULL);
             INSERT INTO messages VALUES (4, 'a@s.whatsapp.net', 0, 0, 'late', 'yesterday', 0, NULL, NULL, NULL);",
        )
        .unwrap();

        let ds = LegacyStrategy::new()
            .extract(&conn, &KindTable::default())
            .unwrap();

        let ids: Vec<i64> = ds.messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(ds.messages[1].text.as_deref(), Some("\u{FFFD}("));
        assert_eq!(ds.messages[2].text.as_deref(), Some("yo"));
        assert_eq!(ds.skipped.total, 1);
        assert_eq!(ds.skipped.count(SkipReason::MalformedTimestamp), 1);
    }
}
