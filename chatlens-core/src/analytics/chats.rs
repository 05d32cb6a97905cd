//! Per-chat views: opening and latest messages, conversation details.

use super::text::{analysable_body, preview};
use super::{peak_index, AnalysisContext};
use crate::types::{Chat, ChatKind, ContentKind, Message, Sender};
use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;
use std::cmp::Ordering;

/// The first or the latest message of one chat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatEdge {
    pub chat_id: String,
    pub display_name: String,
    pub chat_kind: ChatKind,
    pub message_id: i64,
    pub sender: Sender,
    pub sender_name: String,
    pub timestamp: DateTime<Utc>,
    pub kind: ContentKind,
    /// First `preview_chars` characters of the body
    pub preview: Option<String>,
    pub deleted: bool,
}

/// Summary of one conversation-viewer chat.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversationDetails {
    pub sent: u64,
    pub received: u64,
    pub first_message: Option<DateTime<Utc>>,
    pub last_message: Option<DateTime<Utc>>,
    /// Mean body length in characters over messages with text
    pub mean_length: Option<f64>,
    pub media_count: u64,
    pub deleted: u64,
    /// Local hour with most messages; lowest wins ties
    pub peak_hour: Option<usize>,
}

/// Each chat's first message, oldest first.
pub fn first_messages(ctx: &AnalysisContext<'_>, limit: usize) -> Vec<ChatEdge> {
    edges(ctx, limit, |chat| chat.message_indices.first(), |a, b| a.cmp(b))
}

/// Each chat's latest message, newest first.
pub fn latest_messages(ctx: &AnalysisContext<'_>, limit: usize) -> Vec<ChatEdge> {
    edges(ctx, limit, |chat| chat.message_indices.last(), |a, b| b.cmp(a))
}

/// Pick one message per chat, order by timestamp with `order`, then chat id
/// ascending, and keep `limit`.
fn edges(
    ctx: &AnalysisContext<'_>,
    limit: usize,
    pick: impl Fn(&Chat) -> Option<&usize>,
    order: impl Fn(&DateTime<Utc>, &DateTime<Utc>) -> Ordering,
) -> Vec<ChatEdge> {
    let ds = ctx.dataset;
    let mut picked: Vec<(&Chat, &Message)> = ds
        .chats
        .iter()
        .filter_map(|chat| pick(chat).map(|&i| (chat, &ds.messages[i])))
        .collect();

    picked.sort_by(|(ca, ma), (cb, mb)| {
        order(&ma.timestamp, &mb.timestamp).then_with(|| ca.id.cmp(&cb.id))
    });
    picked.truncate(limit);

    picked
        .into_iter()
        .map(|(chat, message)| ChatEdge {
            chat_id: chat.id.clone(),
            display_name: ctx.contacts.chat_name(chat).to_string(),
            chat_kind: chat.kind,
            message_id: message.id,
            sender: message.sender.clone(),
            sender_name: ctx.contacts.sender_name(&message.sender).to_string(),
            timestamp: message.timestamp,
            kind: message.kind,
            preview: message
                .body()
                .map(|body| preview(body, ctx.config.preview_chars).0),
            deleted: message.deleted,
        })
        .collect()
}

pub fn conversation_details(ctx: &AnalysisContext<'_>, chat: &Chat) -> ConversationDetails {
    let mut details = ConversationDetails::default();
    let mut hourly = [0u64; 24];
    let mut total_length = 0usize;
    let mut with_text = 0usize;

    for message in ctx.dataset.chat_messages(chat) {
        if message.is_outgoing() {
            details.sent += 1;
        } else {
            details.received += 1;
        }
        if message.kind.is_media() {
            details.media_count += 1;
        }
        if message.deleted {
            details.deleted += 1;
        }
        if let Some(body) = analysable_body(message) {
            total_length += body.chars().count();
            with_text += 1;
        }
        hourly[ctx.local(message.timestamp).hour() as usize] += 1;

        details.first_message.get_or_insert(message.timestamp);
        details.last_message = Some(message.timestamp);
    }

    if with_text > 0 {
        details.mean_length = Some(total_length as f64 / with_text as f64);
    }
    details.peak_hour = peak_index(&hourly);
    details
}
