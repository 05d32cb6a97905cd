//! Chat rankings (top contacts, top groups).

use super::AnalysisContext;
use crate::types::{Chat, ChatKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;

/// One ranked chat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRanking {
    pub chat_id: String,
    pub display_name: String,
    pub kind: ChatKind,
    pub resolved: bool,
    pub total: u64,
    pub sent: u64,
    pub received: u64,
    /// min(sent, received) / max(sent, received)
    pub balance: f64,
    pub first_message: DateTime<Utc>,
    pub last_message: DateTime<Utc>,
}

/// Balance between sent and received counts, in `[0, 1]`.
///
/// 1 when both sides are equal (and non-zero), 0 when either side is zero.
pub fn balance_score(sent: u64, received: u64) -> f64 {
    let (lo, hi) = if sent < received {
        (sent, received)
    } else {
        (received, sent)
    };
    if lo == 0 {
        0.0
    } else {
        lo as f64 / hi as f64
    }
}

/// Ordering shared by every chat and sender ranking: count desc, most recent
/// desc, identifier asc.
pub(crate) fn rank_order(
    a: (u64, DateTime<Utc>, &str),
    b: (u64, DateTime<Utc>, &str),
) -> Ordering {
    b.0.cmp(&a.0)
        .then_with(|| b.1.cmp(&a.1))
        .then_with(|| a.2.cmp(b.2))
}

/// Rank chats of `kind` (all chats for `None`) and keep the top `limit`.
pub fn rank_chats(
    ctx: &AnalysisContext<'_>,
    kind: Option<ChatKind>,
    limit: usize,
) -> Vec<ChatRanking> {
    let mut ranked: Vec<ChatRanking> = ctx
        .dataset
        .chats
        .iter()
        .filter(|c| kind.map_or(true, |k| c.kind == k))
        .filter_map(|c| rank_entry(ctx, c))
        .collect();

    ranked.sort_by(|a, b| {
        rank_order(
            (a.total, a.last_message, a.chat_id.as_str()),
            (b.total, b.last_message, b.chat_id.as_str()),
        )
    });
    ranked.truncate(limit);
    ranked
}

fn rank_entry(ctx: &AnalysisContext<'_>, chat: &Chat) -> Option<ChatRanking> {
    let mut messages = ctx.dataset.chat_messages(chat);
    let first = messages.next()?;

    let mut sent = u64::from(first.is_outgoing());
    let mut total = 1;
    let mut last = first;
    for message in messages {
        total += 1;
        if message.is_outgoing() {
            sent += 1;
        }
        last = message;
    }
    let received = total - sent;

    Some(ChatRanking {
        chat_id: chat.id.clone(),
        display_name: ctx.contacts.chat_name(chat).to_string(),
        kind: chat.kind,
        resolved: ctx.contacts.lookup(&chat.id).is_resolved(),
        total,
        sent,
        received,
        balance: balance_score(sent, received),
        first_message: first.timestamp,
        last_message: last.timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::testutil::DatasetBuilder;
    use crate::config::AnalysisConfig;
    use crate::contacts::{Contact, ContactDirectory};

    #[test]
    fn test_balance_score_bounds() {
        assert_eq!(balance_score(0, 0), 0.0);
        assert_eq!(balance_score(5, 0), 0.0);
        assert_eq!(balance_score(0, 5), 0.0);
        assert_eq!(balance_score(4, 4), 1.0);
        assert_eq!(balance_score(1, 4), 0.25);
        assert_eq!(balance_score(4, 1), 0.25);

        for sent in 0..20u64 {
            for received in 0..20u64 {
                let b = balance_score(sent, received);
                assert!((0.0..=1.0).contains(&b));
                assert_eq!(b == 1.0, sent == received && sent > 0);
            }
        }
    }

    #[test]
    fn test_rank_order_and_limit() {
        let ds = DatasetBuilder::new()
            // b: 2 messages, last at 50
            .msg("b@s.whatsapp.net", Some("b@s.whatsapp.net"), 10, "x")
            .msg("b@s.whatsapp.net", None, 50, "x")
            // a: 2 messages, last at 50 (tie with b on count and recency)
            .msg("a@s.whatsapp.net", None, 20, "x")
            .msg("a@s.whatsapp.net", Some("a@s.whatsapp.net"), 50, "x")
            // c: 2 messages, last at 60 (more recent)
            .msg("c@s.whatsapp.net", None, 30, "x")
            .msg("c@s.whatsapp.net", None, 60, "x")
            // d: 3 messages
            .msg("d@s.whatsapp.net", None, 1, "x")
            .msg("d@s.whatsapp.net", None, 2, "x")
            .msg("d@s.whatsapp.net", None, 3, "x")
            // group, excluded from contacts
            .msg("g@g.us", Some("a@s.whatsapp.net"), 100, "x")
            .build();
        let contacts = ContactDirectory::empty();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&ds, &contacts, &config).unwrap();

        let ranked = rank_chats(&ctx, Some(ChatKind::Direct), 10);
        let ids: Vec<&str> = ranked.iter().map(|r| r.chat_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "d@s.whatsapp.net",
                "c@s.whatsapp.net",
                "a@s.whatsapp.net",
                "b@s.whatsapp.net"
            ]
        );

        let top2 = rank_chats(&ctx, Some(ChatKind::Direct), 2);
        assert_eq!(top2.len(), 2);

        let groups = rank_chats(&ctx, Some(ChatKind::Group), 10);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].kind, ChatKind::Group);

        let all = rank_chats(&ctx, None, 10);
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn test_entry_counts_and_names() {
        let ds = DatasetBuilder::new()
            .msg("a@s.whatsapp.net", Some("a@s.whatsapp.net"), 10, "x")
            .msg("a@s.whatsapp.net", None, 20, "x")
            .msg("a@s.whatsapp.net", None, 30, "x")
            .msg("g@g.us", Some("a@s.whatsapp.net"), 40, "x")
            .subject("g@g.us", "Climbing")
            .build();
        let contacts = ContactDirectory::from_contacts([Contact {
            identifier: "a@s.whatsapp.net".to_string(),
            display_name: "Ada".to_string(),
            lid: None,
            status: None,
        }]);
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&ds, &contacts, &config).unwrap();

        let ranked = rank_chats(&ctx, None, 10);
        let ada = &ranked[0];
        assert_eq!(ada.display_name, "Ada");
        assert!(ada.resolved);
        assert_eq!((ada.total, ada.sent, ada.received), (3, 2, 1));
        assert_eq!(ada.balance, 0.5);
        assert_eq!(ada.first_message.timestamp(), 10);
        assert_eq!(ada.last_message.timestamp(), 30);

        assert_eq!(ranked[1].display_name, "Climbing");
    }
}
