//! Report model: the single serializable output of a run.
//!
//! The builder only assembles; every number comes from the
//! [`AggregateResult`]. No wall-clock time is recorded, so two runs over the
//! same inputs serialize to identical bytes.

use crate::analytics::{AggregateResult, ConversationDetails};
use crate::config::AnalysisConfig;
use crate::contacts::{ContactDirectory, ContactsStatus};
use crate::error::Result;
use crate::ingest::SchemaGeneration;
use crate::types::{ChatKind, ContentKind, Dataset, Sender, SkipTally};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Whether the run had anything to analyze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetStatus {
    Ready,
    /// No message could be mapped; every metric is empty
    Empty,
}

/// Identity of an input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputFile {
    pub path: PathBuf,
    pub bytes: u64,
    /// Hex SHA-256 of the file contents
    pub sha256: String,
}

impl InputFile {
    pub fn identify(path: &Path) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 64 * 1024];
        let mut bytes = 0u64;
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            bytes += n as u64;
        }

        Ok(Self {
            path: path.to_path_buf(),
            bytes,
            sha256: hex::encode(hasher.finalize()),
        })
    }
}

/// Facts about the run itself.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub tool_version: String,
    pub schema_generation: SchemaGeneration,
    pub status: DatasetStatus,
    pub message_db: InputFile,
    pub contacts_db: Option<InputFile>,
    pub contacts_status: ContactsStatus,
    pub resolved_contacts: usize,
    pub identifier_links: usize,
    pub skipped: SkipTally,
}

/// One message of the conversation viewer.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationMessage {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub sender: Sender,
    pub sender_name: String,
    pub kind: ContentKind,
    pub text: Option<String>,
    pub byte_size: Option<u64>,
    pub deleted: bool,
}

/// The tail of one chat, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub chat_id: String,
    pub display_name: String,
    pub kind: ChatKind,
    pub total_messages: u64,
    pub details: ConversationDetails,
    pub messages: Vec<ConversationMessage>,
}

/// The full report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: RunMetadata,
    pub stats: AggregateResult,
    pub conversations: Vec<Conversation>,
}

impl Report {
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        Ok(if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        })
    }
}

/// Everything the report is assembled from.
pub struct ReportInputs<'a> {
    pub dataset: &'a Dataset,
    pub contacts: &'a ContactDirectory,
    pub contacts_status: ContactsStatus,
    pub stats: AggregateResult,
    pub message_db: InputFile,
    pub contacts_db: Option<InputFile>,
    pub config: &'a AnalysisConfig,
}

/// Assemble the report.
///
/// The conversation viewer covers the chats of
/// [`AggregateResult::busiest_chats`], in that order.
pub fn build(inputs: ReportInputs<'_>) -> Report {
    let ReportInputs {
        dataset,
        contacts,
        contacts_status,
        stats,
        message_db,
        contacts_db,
        config,
    } = inputs;

    let conversations = stats
        .busiest_chats
        .iter()
        .filter_map(|ranked| dataset.chat(&ranked.chat_id))
        .map(|chat| {
            let skip = chat
                .message_indices
                .len()
                .saturating_sub(config.conversation_limit);
            let messages = dataset
                .chat_messages(chat)
                .skip(skip)
                .map(|m| ConversationMessage {
                    id: m.id,
                    timestamp: m.timestamp,
                    sender: m.sender.clone(),
                    sender_name: contacts.sender_name(&m.sender).to_string(),
                    kind: m.kind,
                    text: m.text.clone(),
                    byte_size: m.byte_size,
                    deleted: m.deleted,
                })
                .collect();

            Conversation {
                chat_id: chat.id.clone(),
                display_name: contacts.chat_name(chat).to_string(),
                kind: chat.kind,
                total_messages: chat.message_indices.len() as u64,
                details: stats
                    .conversation_details
                    .get(&chat.id)
                    .cloned()
                    .unwrap_or_default(),
                messages,
            }
        })
        .collect();

    let status = if dataset.is_empty() {
        DatasetStatus::Empty
    } else {
        DatasetStatus::Ready
    };

    Report {
        metadata: RunMetadata {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            schema_generation: dataset.generation,
            status,
            message_db,
            contacts_db,
            contacts_status,
            resolved_contacts: contacts.len(),
            identifier_links: dataset.identifier_links.len(),
            skipped: dataset.skipped.clone(),
        },
        stats,
        conversations,
    }
}
