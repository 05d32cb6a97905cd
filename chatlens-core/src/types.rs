//! Canonical data model for chatlens
//!
//! Every supported schema generation is mapped into these types. Nothing
//! downstream of the mapper knows which on-disk layout a record came from.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Chat** | One conversation, direct (two parties) or group |
//! | **Message** | One row of a chat, incoming or outgoing |
//! | **Sender** | Who wrote a message: [`Sender::Me`] or a participant identifier |
//! | **MediaItem** | A message whose kind is media (see [`ContentKind::is_media`]) |
//! | **Identifier link** | A LID → normalized identifier pair |

use crate::ingest::SchemaGeneration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Suffix the source uses for group chat identifiers.
pub const GROUP_SUFFIX: &str = "@g.us";

// ============================================
// Content kinds
// ============================================

/// Canonical message content kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Text,
    Photo,
    Video,
    Audio,
    Document,
    Sticker,
    Gif,
    /// Shared contact card
    Contact,
    Location,
    System,
    /// Type code not present in the classification table
    Unknown,
}

impl ContentKind {
    /// Every kind, in report order.
    pub const ALL: [ContentKind; 11] = [
        ContentKind::Text,
        ContentKind::Photo,
        ContentKind::Video,
        ContentKind::Audio,
        ContentKind::Document,
        ContentKind::Sticker,
        ContentKind::Gif,
        ContentKind::Contact,
        ContentKind::Location,
        ContentKind::System,
        ContentKind::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Photo => "photo",
            ContentKind::Video => "video",
            ContentKind::Audio => "audio",
            ContentKind::Document => "document",
            ContentKind::Sticker => "sticker",
            ContentKind::Gif => "gif",
            ContentKind::Contact => "contact",
            ContentKind::Location => "location",
            ContentKind::System => "system",
            ContentKind::Unknown => "unknown",
        }
    }

    /// Whether messages of this kind appear in media statistics.
    ///
    /// Unknown codes count as media: the source only assigns new codes to
    /// attachment types.
    pub fn is_media(&self) -> bool {
        !matches!(self, ContentKind::Text | ContentKind::System)
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown content kind: {}", s))
    }
}

// ============================================
// Chats and senders
// ============================================

/// Direct (one-to-one) or group conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    Direct,
    Group,
}

impl ChatKind {
    /// Classify a chat by its identifier.
    pub fn from_identifier(id: &str) -> Self {
        if id.ends_with(GROUP_SUFFIX) {
            ChatKind::Group
        } else {
            ChatKind::Direct
        }
    }
}

/// Author of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Sender {
    /// The database owner (outgoing message)
    Me,
    /// Another participant, by raw identifier
    Participant(String),
}

impl Sender {
    /// Raw identifier for participants, `None` for the owner.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Sender::Me => None,
            Sender::Participant(id) => Some(id),
        }
    }

    /// Key used as the final tie-break in rankings. The owner sorts first.
    pub fn sort_key(&self) -> &str {
        self.identifier().unwrap_or("")
    }

    pub fn is_me(&self) -> bool {
        matches!(self, Sender::Me)
    }
}

/// A canonical message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Source row id; final tie-break for equal timestamps
    pub id: i64,
    /// Owning chat identifier
    pub chat_id: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    pub kind: ContentKind,
    pub text: Option<String>,
    /// Attachment size in bytes (media only)
    pub byte_size: Option<u64>,
    pub mime_type: Option<String>,
    /// Deleted by its sender; the row survives as a placeholder
    #[serde(default)]
    pub deleted: bool,
}

impl Message {
    pub fn is_outgoing(&self) -> bool {
        self.sender.is_me()
    }

    /// Text body, if present and non-blank.
    pub fn body(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// A canonical conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chat {
    /// Raw chat identifier
    pub id: String,
    pub kind: ChatKind,
    /// Group subject stored by the source, if any
    pub subject: Option<String>,
    /// Indices into [`Dataset::messages`], oldest first
    pub message_indices: Vec<usize>,
}

/// Media view over one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MediaItem {
    /// Index into [`Dataset::messages`]
    pub message_index: usize,
    pub kind: ContentKind,
    pub byte_size: Option<u64>,
}

// ============================================
// Mapping skips
// ============================================

/// Why a source row was not mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Timestamp NULL or not positive
    MissingTimestamp,
    /// Timestamp stored as something other than an integer
    MalformedTimestamp,
    /// Chat row id points at no chat row
    DanglingChat,
    /// Chat exists but has no identifier
    MissingChatIdentifier,
    /// Sender row id points at no identifier row
    DanglingSender,
}

/// Count of skipped rows per reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipTally {
    pub total: u64,
    pub by_reason: BTreeMap<SkipReason, u64>,
}

impl SkipTally {
    pub fn record(&mut self, reason: SkipReason) {
        self.total += 1;
        *self.by_reason.entry(reason).or_insert(0) += 1;
    }

    pub fn count(&self, reason: SkipReason) -> u64 {
        self.by_reason.get(&reason).copied().unwrap_or(0)
    }
}

// ============================================
// Dataset
// ============================================

/// The full canonical record set produced by the mapper.
///
/// Messages are stored in `(timestamp, id)` order, so every chat's
/// `message_indices` is ascending in time as well.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub generation: SchemaGeneration,
    /// Sorted by chat identifier
    pub chats: Vec<Chat>,
    pub messages: Vec<Message>,
    pub media: Vec<MediaItem>,
    /// LID → normalized identifier
    pub identifier_links: BTreeMap<String, String>,
    pub skipped: SkipTally,
}

impl Dataset {
    /// Build the record set from mapped messages.
    ///
    /// `subjects` maps chat identifiers to group subjects. Only chats that own
    /// at least one message are created.
    pub fn assemble(
        generation: SchemaGeneration,
        mut messages: Vec<Message>,
        subjects: &BTreeMap<String, String>,
        identifier_links: BTreeMap<String, String>,
        skipped: SkipTally,
    ) -> Self {
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));

        let mut by_chat: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        let mut media = Vec::new();
        for (index, message) in messages.iter().enumerate() {
            by_chat.entry(&message.chat_id).or_default().push(index);
            if message.kind.is_media() {
                media.push(MediaItem {
                    message_index: index,
                    kind: message.kind,
                    byte_size: message.byte_size,
                });
            }
        }

        let chats = by_chat
            .into_iter()
            .map(|(id, message_indices)| Chat {
                id: id.to_string(),
                kind: ChatKind::from_identifier(id),
                subject: subjects
                    .get(id)
                    .filter(|s| !s.trim().is_empty())
                    .cloned(),
                message_indices,
            })
            .collect();

        Self {
            generation,
            chats,
            messages,
            media,
            identifier_links,
            skipped,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Look up a chat by identifier.
    pub fn chat(&self, id: &str) -> Option<&Chat> {
        self.chats
            .binary_search_by(|c| c.id.as_str().cmp(id))
            .ok()
            .map(|i| &self.chats[i])
    }

    /// Messages of a chat, oldest first.
    pub fn chat_messages<'a>(&'a self, chat: &'a Chat) -> impl Iterator<Item = &'a Message> + 'a {
        chat.message_indices.iter().map(move |&i| &self.messages[i])
    }

    /// Media items with their messages.
    pub fn media_messages(&self) -> impl Iterator<Item = (&MediaItem, &Message)> {
        self.media
            .iter()
            .map(move |item| (item, &self.messages[item.message_index]))
    }

    /// Every identifier worth resolving: incoming senders and direct-chat
    /// counterparts, deduplicated and sorted.
    pub fn participant_identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .messages
            .iter()
            .filter_map(|m| m.sender.identifier())
            .chain(
                self.chats
                    .iter()
                    .filter(|c| c.kind == ChatKind::Direct)
                    .map(|c| c.id.as_str()),
            )
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn msg(id: i64, chat: &str, sender: Sender, secs: i64, kind: ContentKind) -> Message {
        Message {
            id,
            chat_id: chat.to_string(),
            sender,
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            kind,
            text: None,
            byte_size: None,
            mime_type: None,
            deleted: false,
        }
    }

    #[test]
    fn test_chat_kind_from_identifier() {
        assert_eq!(ChatKind::from_identifier("123@g.us"), ChatKind::Group);
        assert_eq!(
            ChatKind::from_identifier("123@s.whatsapp.net"),
            ChatKind::Direct
        );
    }

    #[test]
    fn test_content_kind_roundtrip_names() {
        for kind in ContentKind::ALL {
            assert_eq!(kind.as_str().parse::<ContentKind>().unwrap(), kind);
        }
        assert!("hologram".parse::<ContentKind>().is_err());
    }

    #[test]
    fn test_media_kinds() {
        assert!(!ContentKind::Text.is_media());
        assert!(!ContentKind::System.is_media());
        assert!(ContentKind::Photo.is_media());
        assert!(ContentKind::Unknown.is_media());
    }

    #[test]
    fn test_assemble_orders_and_groups() {
        let a = "a@s.whatsapp.net";
        let g = "g@g.us";
        let messages = vec![
            msg(3, a, Sender::Me, 30, ContentKind::Text),
            msg(1, g, Sender::Participant(a.into()), 10, ContentKind::Photo),
            msg(2, a, Sender::Participant(a.into()), 10, ContentKind::Text),
        ];
        let mut subjects = BTreeMap::new();
        subjects.insert(g.to_string(), "Family".to_string());

        let ds = Dataset::assemble(
            SchemaGeneration::Normalized,
            messages,
            &subjects,
            BTreeMap::new(),
            SkipTally::default(),
        );

        // (timestamp, id) order: id 1 @10, id 2 @10, id 3 @30
        let ids: Vec<i64> = ds.messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        assert_eq!(ds.chats.len(), 2);
        let direct = ds.chat(a).unwrap();
        assert_eq!(direct.kind, ChatKind::Direct);
        let direct_ids: Vec<i64> = ds.chat_messages(direct).map(|m| m.id).collect();
        assert_eq!(direct_ids, vec![2, 3]);

        let group = ds.chat(g).unwrap();
        assert_eq!(group.subject.as_deref(), Some("Family"));
        assert_eq!(ds.media.len(), 1);
        assert_eq!(ds.participant_identifiers(), vec![a]);
    }

    #[test]
    fn test_skip_tally() {
        let mut tally = SkipTally::default();
        tally.record(SkipReason::DanglingChat);
        tally.record(SkipReason::DanglingChat);
        tally.record(SkipReason::MissingTimestamp);
        assert_eq!(tally.total, 3);
        assert_eq!(tally.count(SkipReason::DanglingChat), 2);
        assert_eq!(tally.count(SkipReason::DanglingSender), 0);
    }
}
