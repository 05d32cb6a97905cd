//! Extraction for the normalized `message`/`chat`/`jid` layouts.
//!
//! Covers three generations that share the table set and differ in how the
//! sender of an incoming message is stored.

use super::{jid_expr, map_rows, text_cell, IntCell, RawRow, RawSender, DELETED_STATUS};
use crate::error::{Error, Result};
use crate::ingest::{
    column_exists, list_tables, pick_column, table_exists, ExtractionStrategy, KindTable,
    SchemaGeneration,
};
use crate::types::{ChatKind, Dataset};
use rusqlite::Connection;
use std::collections::BTreeMap;

/// Strategy for `lid_normalized`, `normalized` and `chat_scoped` databases.
#[derive(Debug, Clone, Copy)]
pub struct NormalizedStrategy {
    generation: SchemaGeneration,
}

impl NormalizedStrategy {
    /// # Panics
    ///
    /// Debug builds assert that `generation` is a normalized layout.
    pub fn new(generation: SchemaGeneration) -> Self {
        debug_assert!(generation.is_normalized());
        Self { generation }
    }

    fn has_sender_column(&self) -> bool {
        matches!(
            self.generation,
            SchemaGeneration::LidNormalized | SchemaGeneration::Normalized
        )
    }
}

/// Column layout discovered on the connection.
struct Layout {
    jid_raw: bool,
    jid_parts: bool,
    text: Option<String>,
    message_type: bool,
    status: bool,
    media_size: Option<String>,
    media_mime: Option<String>,
    subject: bool,
}

impl Layout {
    fn discover(conn: &Connection) -> Result<Self> {
        let has_raw = column_exists(conn, "jid", "raw_string")?;
        let has_parts =
            column_exists(conn, "jid", "user")? && column_exists(conn, "jid", "server")?;

        if !has_raw && !has_parts {
            return Err(Error::UnsupportedSchema {
                tables: list_tables(conn)?,
            });
        }

        let (media_size, media_mime) = if table_exists(conn, "message_media")?
            && column_exists(conn, "message_media", "message_row_id")?
        {
            (
                pick_column(conn, "message_media", &["file_size", "media_size"])?,
                pick_column(conn, "message_media", &["mime_type", "media_mime_type"])?,
            )
        } else {
            (None, None)
        };

        Ok(Self {
            jid_raw: has_raw,
            jid_parts: has_parts,
            text: pick_column(conn, "message", &["text_data", "data"])?,
            message_type: column_exists(conn, "message", "message_type")?,
            status: column_exists(conn, "message", "status")?,
            media_size,
            media_mime,
            subject: column_exists(conn, "chat", "subject")?,
        })
    }

    /// Identifier expression for a `jid` table alias.
    fn jid(&self, alias: &str) -> String {
        jid_expr(alias, self.jid_raw, self.jid_parts).unwrap_or_else(|| "NULL".to_string())
    }

    fn media_column(column: &Option<String>) -> String {
        match column {
            Some(col) => format!(
                "(SELECT mm.{} FROM message_media mm WHERE mm.message_row_id = m._id LIMIT 1)",
                col
            ),
            None => "NULL".to_string(),
        }
    }
}

impl ExtractionStrategy for NormalizedStrategy {
    fn generation(&self) -> SchemaGeneration {
        self.generation
    }

    fn extract(&self, conn: &Connection, kinds: &KindTable) -> Result<Dataset> {
        let layout = Layout::discover(conn)?;

        let rows = self.read_rows(conn, &layout)?;
        let row_count = rows.len();
        let (messages, skipped) = map_rows(rows, kinds);

        let subjects = read_subjects(conn, &layout)?;
        let identifier_links = if self.generation == SchemaGeneration::LidNormalized {
            read_identifier_links(conn, &layout)?
        } else {
            BTreeMap::new()
        };

        tracing::info!(
            generation = %self.generation,
            rows = row_count,
            messages = messages.len(),
            skipped = skipped.total,
            links = identifier_links.len(),
            "Extracted message database"
        );

        Ok(Dataset::assemble(
            self.generation,
            messages,
            &subjects,
            identifier_links,
            skipped,
        ))
    }
}

impl NormalizedStrategy {
    fn read_rows(&self, conn: &Connection, layout: &Layout) -> Result<Vec<RawRow>> {
        let text = layout
            .text
            .as_deref()
            .map(|c| format!("m.{}", c))
            .unwrap_or_else(|| "NULL".to_string());
        let message_type = if layout.message_type {
            "m.message_type"
        } else {
            "NULL"
        };
        let status = if layout.status { "m.status" } else { "NULL" };

        let (sender_cols, sender_join) = if self.has_sender_column() {
            (
                format!("m.sender_jid_row_id, s._id, {}", layout.jid("s")),
                "LEFT JOIN jid s ON m.sender_jid_row_id = s._id",
            )
        } else {
            ("NULL, NULL, NULL".to_string(), "")
        };

        let sql = format!(
            "SELECT m._id, c._id, {chat_jid}, m.from_me, m.timestamp, {text},
                    {message_type}, {sender_cols}, {size}, {mime}, {status}
             FROM message m
             LEFT JOIN chat c ON m.chat_row_id = c._id
             LEFT JOIN jid j ON c.jid_row_id = j._id
             {sender_join}
             WHERE m.chat_row_id > 0",
            chat_jid = layout.jid("j"),
            size = Layout::media_column(&layout.media_size),
            mime = Layout::media_column(&layout.media_mime),
        );

        let has_sender_column = self.has_sender_column();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                let chat_row = IntCell::read(row, 1)?;
                let chat_id = text_cell(row, 2)?;
                let from_me = IntCell::read(row, 3)?.value();
                let sender_ref = IntCell::read(row, 7)?.value();
                let sender_row = IntCell::read(row, 8)?.value();
                let sender_id = text_cell(row, 9)?;

                let sender = if from_me == Some(1) {
                    RawSender::Me
                } else {
                    incoming_sender(
                        has_sender_column,
                        chat_id.as_deref(),
                        sender_ref,
                        sender_row,
                        sender_id,
                    )
                };

                Ok(RawRow {
                    id: row.get(0)?,
                    chat_found: chat_row != IntCell::Null,
                    chat_id,
                    sender,
                    timestamp_ms: IntCell::read(row, 4)?,
                    text: text_cell(row, 5)?,
                    type_code: IntCell::read(row, 6)?,
                    system: false,
                    byte_size: IntCell::read(row, 10)?.value(),
                    mime_type: text_cell(row, 11)?,
                    deleted: IntCell::read(row, 12)?.value() == Some(DELETED_STATUS),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

/// Resolve the sender of an incoming row.
///
/// Direct chats leave the sender reference empty; the counterpart is then the
/// chat itself. A group message without a sender cannot be attributed.
fn incoming_sender(
    has_sender_column: bool,
    chat_id: Option<&str>,
    sender_ref: Option<i64>,
    sender_row: Option<i64>,
    sender_id: Option<String>,
) -> RawSender {
    let chat_sender = || match chat_id {
        Some(id) => RawSender::Known(id.to_string()),
        // missing chat identifier is reported by the row mapper
        None => RawSender::Known(String::new()),
    };

    if !has_sender_column {
        return chat_sender();
    }

    match (sender_ref.filter(|r| *r > 0), sender_row, sender_id) {
        (Some(_), Some(_), Some(id)) => RawSender::Known(id),
        (Some(_), _, _) => RawSender::Dangling,
        (None, _, _) => match chat_id.map(ChatKind::from_identifier) {
            Some(ChatKind::Group) => RawSender::Dangling,
            _ => chat_sender(),
        },
    }
}

fn read_subjects(conn: &Connection, layout: &Layout) -> Result<BTreeMap<String, String>> {
    if !layout.subject {
        return Ok(BTreeMap::new());
    }

    let sql = format!(
        "SELECT {chat_jid}, c.subject FROM chat c
         JOIN jid j ON c.jid_row_id = j._id
         WHERE c.subject IS NOT NULL",
        chat_jid = layout.jid("j"),
    );
    let mut stmt = conn.prepare(&sql)?;
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

/// Read `jid_map` as LID identifier → normalized identifier.
fn read_identifier_links(conn: &Connection, layout: &Layout) -> Result<BTreeMap<String, String>> {
    if !column_exists(conn, "jid_map", "lid_row_id")?
        || !column_exists(conn, "jid_map", "jid_row_id")?
    {
        tracing::warn!("jid_map lacks lid_row_id/jid_row_id, skipping identifier links");
        return Ok(BTreeMap::new());
    }

    let sql = format!(
        "SELECT {lid}, {jid} FROM jid_map jm
         JOIN jid l ON jm.lid_row_id = l._id
         JOIN jid j ON jm.jid_row_id = j._id",
        lid = layout.jid("l"),
        jid = layout.jid("j"),
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut links = BTreeMap::new();
    let rows = stmt.query_map([], |row| Ok((text_cell(row, 0)?, text_cell(row, 1)?)))?;
    for row in rows {
        if let (Some(lid), Some(jid)) = row? {
            links.insert(lid, jid);
        }
    }

    Ok(links)
}
