//! Response times between senders.
//!
//! Within a chat, every adjacent pair of messages whose senders differ yields
//! one sample: the seconds between them. Consecutive messages from the same
//! sender produce nothing.

use super::{median_sorted, AnalysisContext};
use crate::types::Message;
use serde::Serialize;

/// Summary of a set of response samples, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseSummary {
    pub samples: usize,
    pub mean_secs: f64,
    pub median_secs: f64,
    pub min_secs: f64,
    pub max_secs: f64,
}

impl ResponseSummary {
    /// Summarize samples; `None` when there are none.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        let median = median_sorted(&sorted)?;
        let n = sorted.len();
        Some(Self {
            samples: n,
            mean_secs: sorted.iter().sum::<f64>() / n as f64,
            median_secs: median,
            min_secs: sorted[0],
            max_secs: sorted[n - 1],
        })
    }
}

/// Response summary for one chat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    pub chat_id: String,
    pub display_name: String,
    #[serde(flatten)]
    pub summary: ResponseSummary,
}

/// Response-time metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResponseTimeStats {
    /// Over every sample of every chat
    pub global: Option<ResponseSummary>,
    /// Chats with at least one sample, by identifier
    pub per_chat: Vec<ChatResponse>,
}

/// Sender-change deltas of a time-ordered message sequence, in seconds.
pub fn response_samples<'a>(messages: impl IntoIterator<Item = &'a Message>) -> Vec<f64> {
    let mut samples = Vec::new();
    let mut prev: Option<&Message> = None;
    for message in messages {
        if let Some(p) = prev {
            if p.sender != message.sender {
                let delta = message.timestamp - p.timestamp;
                samples.push(delta.num_milliseconds() as f64 / 1000.0);
            }
        }
        prev = Some(message);
    }
    samples
}

pub fn compute(ctx: &AnalysisContext<'_>) -> ResponseTimeStats {
    let mut all = Vec::new();
    let mut per_chat = Vec::new();

    // chats are stored in identifier order
    for chat in &ctx.dataset.chats {
        let samples = response_samples(ctx.dataset.chat_messages(chat));
        if let Some(summary) = ResponseSummary::from_samples(&samples) {
            per_chat.push(ChatResponse {
                chat_id: chat.id.clone(),
                display_name: ctx.contacts.chat_name(chat).to_string(),
                summary,
            });
            all.extend(samples);
        }
    }

    ResponseTimeStats {
        global: ResponseSummary::from_samples(&all),
        per_chat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::testutil::DatasetBuilder;
    use crate::config::AnalysisConfig;
    use crate::contacts::ContactDirectory;

    #[test]
    fn test_samples_only_on_sender_change() {
        // A@0, B@10, B@15, A@30
        let ds = DatasetBuilder::new()
            .msg("g@g.us", Some("a@s.whatsapp.net"), 0, "a")
            .msg("g@g.us", Some("b@s.whatsapp.net"), 10, "b")
            .msg("g@g.us", Some("b@s.whatsapp.net"), 15, "b again")
            .msg("g@g.us", Some("a@s.whatsapp.net"), 30, "a again")
            .build();
        let chat = &ds.chats[0];
        assert_eq!(response_samples(ds.chat_messages(chat)), vec![10.0, 15.0]);
    }

    #[test]
    fn test_owner_counts_as_sender() {
        let a = "a@s.whatsapp.net";
        let ds = DatasetBuilder::new()
            .msg(a, Some(a), 0, "q")
            .msg(a, None, 90, "reply")
            .msg(a, None, 100, "more")
            .msg(a, Some(a), 400, "ok")
            .build();
        let chat = &ds.chats[0];
        assert_eq!(response_samples(ds.chat_messages(chat)), vec![90.0, 300.0]);
    }

    #[test]
    fn test_summary() {
        let summary = ResponseSummary::from_samples(&[30.0, 10.0, 20.0, 100.0]).unwrap();
        assert_eq!(summary.samples, 4);
        assert_eq!(summary.mean_secs, 40.0);
        assert_eq!(summary.median_secs, 25.0);
        assert_eq!(summary.min_secs, 10.0);
        assert_eq!(summary.max_secs, 100.0);
        assert!(ResponseSummary::from_samples(&[]).is_none());
    }

    #[test]
    fn test_chats_without_samples_have_no_entry() {
        let ds = DatasetBuilder::new()
            .msg("a@s.whatsapp.net", None, 0, "talking")
            .msg("a@s.whatsapp.net", None, 5, "to myself")
            .msg("b@s.whatsapp.net", None, 0, "hi")
            .msg("b@s.whatsapp.net", Some("b@s.whatsapp.net"), 60, "hello")
            .build();
        let contacts = ContactDirectory::empty();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&ds, &contacts, &config).unwrap();

        let stats = compute(&ctx);
        assert_eq!(stats.per_chat.len(), 1);
        assert_eq!(stats.per_chat[0].chat_id, "b@s.whatsapp.net");
        let global = stats.global.unwrap();
        assert_eq!(global.samples, 1);
        assert_eq!(global.mean_secs, 60.0);
    }
}
