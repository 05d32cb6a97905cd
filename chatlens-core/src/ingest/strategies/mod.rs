//! Generation-specific extraction strategies
//!
//! Each supported schema generation is handled by a strategy implementing
//! [`ExtractionStrategy`](super::ExtractionStrategy).
//!
//! ## Supported Generations
//!
//! | Generation | Strategy | Sender path |
//! |------------|----------|-------------|
//! | `lid_normalized` | [`NormalizedStrategy`] | `message.sender_jid_row_id → jid`, plus `jid_map` links |
//! | `normalized` | [`NormalizedStrategy`] | `message.sender_jid_row_id → jid` |
//! | `chat_scoped` | [`NormalizedStrategy`] | the chat's own identifier |
//! | `legacy` | [`LegacyStrategy`] | `remote_resource` in groups, `key_remote_jid` otherwise |

mod legacy;
mod normalized;

pub use legacy::LegacyStrategy;
pub use normalized::NormalizedStrategy;

use super::{ExtractionStrategy, KindTable, SchemaGeneration};
use crate::types::{ContentKind, Message, Sender, SkipReason, SkipTally};
use chrono::{TimeZone, Utc};
use rusqlite::types::ValueRef;
use rusqlite::Row;

/// `status` value of a message deleted by its sender.
pub(crate) const DELETED_STATUS: i64 = 13;

/// Strategy for a detected generation.
pub fn strategy_for(generation: SchemaGeneration) -> Box<dyn ExtractionStrategy> {
    match generation {
        SchemaGeneration::Legacy => Box::new(LegacyStrategy::new()),
        normalized => Box::new(NormalizedStrategy::new(normalized)),
    }
}

/// An integer cell read without trusting the column's declared type.
///
/// SQLite stores whatever it was given, so a column declared `INTEGER` can
/// still hold text or a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IntCell {
    Null,
    Int(i64),
    /// Present but not readable as an integer
    Malformed,
}

impl IntCell {
    pub fn read(row: &Row<'_>, idx: usize) -> rusqlite::Result<Self> {
        Ok(match row.get_ref(idx)? {
            ValueRef::Null => IntCell::Null,
            ValueRef::Integer(i) => IntCell::Int(i),
            ValueRef::Real(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                IntCell::Int(f as i64)
            }
            ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                .ok()
                .and_then(|s| s.trim().parse::<i64>().ok())
                .map_or(IntCell::Malformed, IntCell::Int),
            ValueRef::Real(_) | ValueRef::Blob(_) => IntCell::Malformed,
        })
    }

    pub fn value(self) -> Option<i64> {
        match self {
            IntCell::Int(i) => Some(i),
            IntCell::Null | IntCell::Malformed => None,
        }
    }
}

/// Read a text cell, decoding invalid UTF-8 and blobs lossily.
pub(crate) fn text_cell(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
    })
}

/// Sender of a row as read from the source, before validation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawSender {
    /// Outgoing row
    Me,
    /// Incoming row with a resolvable identifier
    Known(String),
    /// Incoming row whose sender reference points nowhere
    Dangling,
}

/// One message row as read from the source.
#[derive(Debug, Clone)]
pub(crate) struct RawRow {
    pub id: i64,
    /// Whether the chat reference resolved to a chat row
    pub chat_found: bool,
    pub chat_id: Option<String>,
    pub sender: RawSender,
    pub timestamp_ms: IntCell,
    pub text: Option<String>,
    pub type_code: IntCell,
    /// Set when the row is a system notice regardless of its type code
    pub system: bool,
    pub byte_size: Option<i64>,
    pub mime_type: Option<String>,
    pub deleted: bool,
}

impl RawRow {
    /// Validate and convert into a canonical message.
    pub fn into_message(self, kinds: &KindTable) -> Result<Message, SkipReason> {
        if self.timestamp_ms == IntCell::Malformed {
            return Err(SkipReason::MalformedTimestamp);
        }
        let timestamp = self
            .timestamp_ms
            .value()
            .filter(|ms| *ms > 0)
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .ok_or(SkipReason::MissingTimestamp)?;

        if !self.chat_found {
            return Err(SkipReason::DanglingChat);
        }
        let chat_id = self
            .chat_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(SkipReason::MissingChatIdentifier)?;

        let sender = match self.sender {
            RawSender::Me => Sender::Me,
            RawSender::Known(id) if !id.trim().is_empty() => Sender::Participant(id),
            RawSender::Known(_) | RawSender::Dangling => return Err(SkipReason::DanglingSender),
        };

        let kind = match self.type_code {
            _ if self.system => ContentKind::System,
            IntCell::Malformed => ContentKind::Unknown,
            code => kinds.classify(code.value()),
        };

        let byte_size = if kind.is_media() {
            self.byte_size.and_then(|b| u64::try_from(b).ok())
        } else {
            None
        };

        Ok(Message {
            id: self.id,
            chat_id,
            sender,
            timestamp,
            kind,
            text: self.text,
            byte_size,
            mime_type: self.mime_type.filter(|m| !m.is_empty()),
            deleted: self.deleted,
        })
    }
}

/// Map rows into messages, tallying the ones that cannot be mapped.
pub(crate) fn map_rows(
    rows: impl IntoIterator<Item = RawRow>,
    kinds: &KindTable,
) -> (Vec<Message>, SkipTally) {
    let mut messages = Vec::new();
    let mut skipped = SkipTally::default();

    for row in rows {
        let id = row.id;
        match row.into_message(kinds) {
            Ok(message) => messages.push(message),
            Err(reason) => {
                tracing::debug!(row_id = id, reason = ?reason, "Skipping unmappable message row");
                skipped.record(reason);
            }
        }
    }

    if skipped.total > 0 {
        tracing::warn!(
            skipped = skipped.total,
            mapped = messages.len(),
            "Some message rows could not be mapped"
        );
    }

    (messages, skipped)
}

/// Build a SQL expression for a jid row's identifier.
///
/// Prefers `raw_string`, falling back to `user@server`.
pub(crate) fn jid_expr(alias: &str, has_raw: bool, has_parts: bool) -> Option<String> {
    match (has_raw, has_parts) {
        (true, true) => Some(format!(
            "COALESCE({a}.raw_string, {a}.user || '@' || {a}.server)",
            a = alias
        )),
        (true, false) => Some(format!("{}.raw_string", alias)),
        (false, true) => Some(format!("{a}.user || '@' || {a}.server", a = alias)),
        (false, false) => None,
    }
}
