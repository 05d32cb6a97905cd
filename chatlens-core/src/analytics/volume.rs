//! Message volume counts.

use super::AnalysisContext;
use crate::types::{ChatKind, ContentKind};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Volume metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VolumeStats {
    pub total_messages: u64,
    pub sent: u64,
    pub received: u64,
    /// Messages deleted by their sender; included in every other count
    pub deleted: u64,
    /// Every kind, zero counts included
    pub by_kind: BTreeMap<ContentKind, u64>,
    /// Chat identifier → message count
    pub per_chat: BTreeMap<String, u64>,
    pub distinct_chats: usize,
    pub direct_chats: usize,
    pub group_chats: usize,
    /// Distinct participants (incoming senders and direct counterparts)
    pub distinct_contacts: usize,
    /// Local calendar day with most messages; earliest wins ties
    pub most_active_day: Option<DayCount>,
}

/// Message count for one local calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: u64,
}

pub fn compute(ctx: &AnalysisContext<'_>) -> VolumeStats {
    let ds = ctx.dataset;

    let mut by_kind: BTreeMap<ContentKind, u64> =
        ContentKind::ALL.iter().map(|k| (*k, 0)).collect();
    let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    let mut sent = 0;
    let mut deleted = 0;

    for message in &ds.messages {
        *by_kind.entry(message.kind).or_insert(0) += 1;
        *per_day
            .entry(ctx.local(message.timestamp).date_naive())
            .or_insert(0) += 1;
        if message.is_outgoing() {
            sent += 1;
        }
        if message.deleted {
            deleted += 1;
        }
    }

    let per_chat = ds
        .chats
        .iter()
        .map(|c| (c.id.clone(), c.message_indices.len() as u64))
        .collect();

    let group_chats = ds
        .chats
        .iter()
        .filter(|c| c.kind == ChatKind::Group)
        .count();

    // days iterate in date order; ties keep the earlier day
    let most_active_day =
        per_day
            .into_iter()
            .fold(None, |best: Option<DayCount>, (date, count)| match best {
                Some(b) if b.count >= count => Some(b),
                _ => Some(DayCount { date, count }),
            });

    let total = ds.messages.len() as u64;
    VolumeStats {
        total_messages: total,
        sent,
        received: total - sent,
        deleted,
        by_kind,
        per_chat,
        distinct_chats: ds.chats.len(),
        direct_chats: ds.chats.len() - group_chats,
        group_chats,
        distinct_contacts: ds.participant_identifiers().len(),
        most_active_day,
    }
}
