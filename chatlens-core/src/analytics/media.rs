//! Media counts, sizes and top senders.

use super::ranking::rank_order;
use super::AnalysisContext;
use crate::types::{ContentKind, Sender};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Count and known bytes for one kind (or one sender).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindTotals {
    pub count: u64,
    /// Sum of sizes that are known
    pub bytes: u64,
    /// Items whose size is unknown
    pub unsized_items: u64,
}

impl KindTotals {
    fn add(&mut self, bytes: Option<u64>) {
        self.count += 1;
        match bytes {
            Some(b) => self.bytes = self.bytes.saturating_add(b),
            None => self.unsized_items += 1,
        }
    }
}

/// Media sent by one sender.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SenderMedia {
    pub sender: Sender,
    pub display_name: String,
    #[serde(flatten)]
    pub totals: KindTotals,
    pub by_kind: BTreeMap<ContentKind, u64>,
    pub last_sent: DateTime<Utc>,
}

/// Media metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MediaStats {
    #[serde(flatten)]
    pub totals: KindTotals,
    /// Media kinds that occur
    pub by_kind: BTreeMap<ContentKind, KindTotals>,
    /// Sender label (`me` or the raw identifier) → item count
    pub per_sender: BTreeMap<String, u64>,
    pub top_senders: Vec<SenderMedia>,
}

/// Key for [`MediaStats::per_sender`].
fn sender_label(sender: &Sender) -> String {
    match sender {
        Sender::Me => "me".to_string(),
        Sender::Participant(id) => id.clone(),
    }
}

pub fn compute(ctx: &AnalysisContext<'_>) -> MediaStats {
    let mut stats = MediaStats::default();
    let mut senders: HashMap<&Sender, SenderMedia> = HashMap::new();

    for (item, message) in ctx.dataset.media_messages() {
        stats.totals.add(item.byte_size);
        stats.by_kind.entry(item.kind).or_default().add(item.byte_size);

        let entry = senders
            .entry(&message.sender)
            .or_insert_with(|| SenderMedia {
                sender: message.sender.clone(),
                display_name: ctx.contacts.sender_name(&message.sender).to_string(),
                totals: KindTotals::default(),
                by_kind: BTreeMap::new(),
                last_sent: message.timestamp,
            });
        entry.totals.add(item.byte_size);
        *entry.by_kind.entry(item.kind).or_insert(0) += 1;
        // media is visited in time order
        entry.last_sent = message.timestamp;
    }

    stats.per_sender = senders
        .values()
        .map(|s| (sender_label(&s.sender), s.totals.count))
        .collect();

    let mut ranked: Vec<SenderMedia> = senders.into_values().collect();
    ranked.sort_by(|a, b| {
        rank_order(
            (a.totals.count, a.last_sent, a.sender.sort_key()),
            (b.totals.count, b.last_sent, b.sender.sort_key()),
        )
    });
    ranked.truncate(ctx.config.top_n);
    stats.top_senders = ranked;

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::testutil::DatasetBuilder;
    use crate::config::AnalysisConfig;
    use crate::contacts::ContactDirectory;

    #[test]
    fn test_media_totals_and_senders() {
        let a = "a@s.whatsapp.net";
        let b = "b@s.whatsapp.net";
        let ds = DatasetBuilder::new()
            .media(a, Some(a), 1, ContentKind::Photo, Some(1000))
            .media(a, Some(a), 2, ContentKind::Video, None)
            .media(a, None, 3, ContentKind::Photo, Some(500))
            .media("g@g.us", Some(b), 4, ContentKind::Sticker, Some(20))
            .media("g@g.us", Some(b), 5, ContentKind::Unknown, None)
            .msg(a, None, 6, "text is not media")
            .media(a, None, 7, ContentKind::System, None)
            .build();
        let contacts = ContactDirectory::empty();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&ds, &contacts, &config).unwrap();

        let stats = compute(&ctx);
        assert_eq!(stats.totals.count, 5);
        assert_eq!(stats.totals.bytes, 1520);
        assert_eq!(stats.totals.unsized_items, 2);
        assert_eq!(stats.by_kind[&ContentKind::Photo].count, 2);
        assert_eq!(stats.by_kind[&ContentKind::Photo].bytes, 1500);
        assert!(!stats.by_kind.contains_key(&ContentKind::Text));
        assert!(!stats.by_kind.contains_key(&ContentKind::System));

        assert_eq!(stats.per_sender["me"], 1);
        assert_eq!(stats.per_sender[a], 2);
        assert_eq!(stats.per_sender[b], 2);

        // a and b tie on count; b sent more recently
        let order: Vec<&str> = stats
            .top_senders
            .iter()
            .map(|s| s.display_name.as_str())
            .collect();
        assert_eq!(order, vec![b, a, "Me"]);
        assert_eq!(stats.top_senders[1].by_kind[&ContentKind::Video], 1);
    }

    #[test]
    fn test_byte_totals_saturate() {
        let mut totals = KindTotals::default();
        totals.add(Some(u64::MAX - 1));
        totals.add(Some(10));
        totals.add(None);
        assert_eq!(totals.count, 3);
        assert_eq!(totals.bytes, u64::MAX);
        assert_eq!(totals.unsized_items, 1);
    }

    #[test]
    fn test_top_senders_limit() {
        let mut builder = DatasetBuilder::new();
        let ids: Vec<String> = (0..5).map(|i| format!("{}@s.whatsapp.net", i)).collect();
        for (i, id) in ids.iter().enumerate() {
            builder = builder.media(id, Some(id), i as i64 + 1, ContentKind::Photo, None);
        }
        let ds = builder.build();
        let contacts = ContactDirectory::empty();
        let config = AnalysisConfig {
            top_n: 3,
            ..Default::default()
        };
        let ctx = AnalysisContext::new(&ds, &contacts, &config).unwrap();

        let stats = compute(&ctx);
        assert_eq!(stats.top_senders.len(), 3);
        assert_eq!(stats.per_sender.len(), 5);
    }
}
