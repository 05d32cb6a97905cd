//! Analytics over the canonical record set
//!
//! Every metric family lives in its own module and is a pure function of the
//! [`Dataset`], the [`ContactDirectory`] and the [`AnalysisConfig`]:
//! - Volume counts ([`volume`])
//! - First and latest message per chat, conversation details ([`chats`])
//! - Time-of-day and calendar activity ([`activity`])
//! - Contact and group rankings ([`ranking`])
//! - Response times ([`response`])
//! - Word frequencies and message lengths ([`text`])
//! - Emoji frequencies ([`emoji`])
//! - Media counts and senders ([`media`])
//!
//! ## Tie-breaks
//!
//! Every ranked list is fully ordered. Chat and sender rankings order by count
//! descending, then most recent message descending, then identifier
//! ascending. Term rankings order by count descending, then term ascending.
//! Hour and weekday peaks pick the lowest index among equals.

pub mod activity;
pub mod chats;
pub mod emoji;
pub mod media;
pub mod ranking;
pub mod response;
pub mod text;
pub mod volume;

pub use activity::{ActivityStats, MonthCount};
pub use chats::{ChatEdge, ConversationDetails};
pub use emoji::EmojiStats;
pub use media::{KindTotals, MediaStats, SenderMedia};
pub use ranking::{balance_score, ChatRanking};
pub use response::{ChatResponse, ResponseSummary, ResponseTimeStats};
pub use text::{LengthStats, LongMessage, TextStats};
pub use volume::{DayCount, VolumeStats};

use crate::config::AnalysisConfig;
use crate::contacts::ContactDirectory;
use crate::error::{Error, Result};
use crate::types::{ChatKind, Dataset};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// All computed metrics. Built once by [`aggregate`].
#[derive(Debug, Clone, Serialize)]
pub struct AggregateResult {
    pub volume: VolumeStats,
    pub activity: ActivityStats,
    /// Direct chats, ranked
    pub top_contacts: Vec<ChatRanking>,
    /// Group chats, ranked
    pub top_groups: Vec<ChatRanking>,
    /// All chats, ranked; selects the conversation viewer's chats
    pub busiest_chats: Vec<ChatRanking>,
    /// Each chat's first message, oldest first
    pub first_messages: Vec<ChatEdge>,
    /// Each chat's latest message, newest first
    pub latest_messages: Vec<ChatEdge>,
    pub response_times: ResponseTimeStats,
    pub text: TextStats,
    pub emoji: EmojiStats,
    pub media: MediaStats,
    /// Details of every `busiest_chats` entry, keyed by chat identifier.
    /// Reported inside the conversation viewer.
    #[serde(skip)]
    pub conversation_details: BTreeMap<String, ConversationDetails>,
}

/// A term and how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCount {
    pub term: String,
    pub count: u64,
}

/// Shared inputs of every metric family.
pub struct AnalysisContext<'a> {
    pub dataset: &'a Dataset,
    pub contacts: &'a ContactDirectory,
    pub config: &'a AnalysisConfig,
    offset: FixedOffset,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(
        dataset: &'a Dataset,
        contacts: &'a ContactDirectory,
        config: &'a AnalysisConfig,
    ) -> Result<Self> {
        let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60).ok_or_else(|| {
            Error::Config(format!(
                "invalid utc_offset_minutes: {}",
                config.utc_offset_minutes
            ))
        })?;
        Ok(Self {
            dataset,
            contacts,
            config,
            offset,
        })
    }

    /// Timestamp in the configured local offset.
    pub fn local(&self, ts: DateTime<Utc>) -> DateTime<FixedOffset> {
        ts.with_timezone(&self.offset)
    }
}

/// Compute every metric.
pub fn aggregate(
    dataset: &Dataset,
    contacts: &ContactDirectory,
    config: &AnalysisConfig,
) -> Result<AggregateResult> {
    let ctx = AnalysisContext::new(dataset, contacts, config)?;

    let busiest_chats = ranking::rank_chats(&ctx, None, config.conversation_chats);
    let conversation_details = busiest_chats
        .iter()
        .filter_map(|ranked| dataset.chat(&ranked.chat_id))
        .map(|chat| (chat.id.clone(), chats::conversation_details(&ctx, chat)))
        .collect();

    let result = AggregateResult {
        volume: volume::compute(&ctx),
        activity: activity::compute(&ctx),
        top_contacts: ranking::rank_chats(&ctx, Some(ChatKind::Direct), config.top_n),
        top_groups: ranking::rank_chats(&ctx, Some(ChatKind::Group), config.top_n),
        busiest_chats,
        first_messages: chats::first_messages(&ctx, config.chat_edge_limit),
        latest_messages: chats::latest_messages(&ctx, config.chat_edge_limit),
        response_times: response::compute(&ctx),
        text: text::compute(&ctx),
        emoji: emoji::compute(&ctx),
        media: media::compute(&ctx),
        conversation_details,
    };

    tracing::info!(
        messages = result.volume.total_messages,
        chats = result.volume.distinct_chats,
        deleted = result.volume.deleted,
        response_samples = result
            .response_times
            .global
            .as_ref()
            .map(|s| s.samples)
            .unwrap_or(0),
        "Aggregation complete"
    );

    Ok(result)
}

/// Index of the largest value; the lowest index wins ties.
pub(crate) fn peak_index(values: &[u64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| a.cmp(b).then(ib.cmp(ia)))
        .filter(|(_, count)| **count > 0)
        .map(|(i, _)| i)
}

/// Sort term counts by count desc, term asc, and keep `limit`.
pub(crate) fn top_terms(
    counts: impl IntoIterator<Item = (String, u64)>,
    limit: usize,
) -> Vec<TermCount> {
    let mut terms: Vec<TermCount> = counts
        .into_iter()
        .map(|(term, count)| TermCount { term, count })
        .collect();
    terms.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));
    terms.truncate(limit);
    terms
}

/// Median of an ascending-sorted slice.
pub(crate) fn median_sorted(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    }
}
