//! Word frequencies, message lengths and longest messages.

use super::{median_sorted, top_terms, AnalysisContext, TermCount};
use crate::types::{ContentKind, Message, Sender};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Words never counted. Extended by `analysis.extra_stop_words`.
const STOP_WORDS: &[&str] = &[
    // English
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "is", "it", "as", "was", "be", "are", "been", "being", "have", "has", "had", "do",
    "does", "did", "will", "would", "could", "should", "may", "might", "must", "can", "this",
    "that", "these", "those", "i", "you", "he", "she", "we", "they", "what", "which", "who",
    "when", "where", "why", "how", "all", "not", "just", "also", "now", "here", "there",
    "then", "about", "your", "my", "our", "their", "his", "her", "him", "them", "me", "us",
    "if", "its", "too", "very", "some", "any", "yes",
    // Turkish
    "bir", "bu", "şu", "ve", "veya", "ama", "fakat", "için", "ile", "mi", "mu", "mı", "mü",
    "da", "de", "ta", "te", "ki", "ne", "var", "yok", "ben", "sen", "o", "biz", "siz",
    "onlar",
];

/// Bodies this short (in characters) never enter the longest-messages list.
const LONGEST_MIN_EXCLUSIVE: usize = 10;

/// Text metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TextStats {
    /// Non-system messages with a non-blank body
    pub messages_with_text: u64,
    /// Words counted after filtering
    pub total_words: u64,
    pub distinct_words: usize,
    pub top_words: Vec<TermCount>,
    /// Body length in characters
    pub length: Option<LengthStats>,
    /// Longest bodies over ten characters, longest first
    pub longest: Vec<LongMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LengthStats {
    pub mean: f64,
    pub median: f64,
    pub min: usize,
    pub max: usize,
}

/// One entry of the longest-messages list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongMessage {
    pub message_id: i64,
    pub chat_id: String,
    pub chat_name: String,
    pub sender: Sender,
    pub sender_name: String,
    pub timestamp: DateTime<Utc>,
    pub length: usize,
    /// First `preview_chars` characters of the body
    pub preview: String,
    pub truncated: bool,
}

/// Stop-word filter: built-in list plus configured extras, case-folded.
pub struct StopWords {
    words: HashSet<String>,
}

impl StopWords {
    pub fn new(extra: &[String]) -> Self {
        let words = STOP_WORDS
            .iter()
            .map(|w| w.to_string())
            .chain(extra.iter().map(|w| w.trim().to_lowercase()))
            .collect();
        Self { words }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }
}

/// Case-folded words of `text`. Anything that is not alphanumeric separates
/// words.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// Body of a message, if it takes part in text analysis.
pub(crate) fn analysable_body(message: &Message) -> Option<&str> {
    if message.kind == ContentKind::System {
        return None;
    }
    message.body()
}

/// First `max_chars` characters of `text`, and whether anything was cut.
pub fn preview(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => (text[..cut].to_string(), true),
        None => (text.to_string(), false),
    }
}

pub fn compute(ctx: &AnalysisContext<'_>) -> TextStats {
    let config = ctx.config;
    let stop_words = StopWords::new(&config.extra_stop_words);

    let mut counts: HashMap<String, u64> = HashMap::new();
    let mut lengths: Vec<(usize, &Message)> = Vec::new();
    let mut total_words = 0u64;

    for message in &ctx.dataset.messages {
        let Some(body) = analysable_body(message) else {
            continue;
        };
        lengths.push((body.chars().count(), message));

        for word in tokenize(body) {
            if word.chars().count() >= config.min_word_length && !stop_words.contains(&word) {
                total_words += 1;
                *counts.entry(word).or_insert(0) += 1;
            }
        }
    }

    let length = if lengths.is_empty() {
        None
    } else {
        let mut sorted: Vec<f64> = lengths.iter().map(|(len, _)| *len as f64).collect();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        Some(LengthStats {
            mean: sorted.iter().sum::<f64>() / n as f64,
            median: median_sorted(&sorted).unwrap_or_default(),
            min: sorted[0] as usize,
            max: sorted[n - 1] as usize,
        })
    };

    // length desc, then oldest first (messages are already in time order)
    let mut candidates: Vec<&(usize, &Message)> = lengths
        .iter()
        .filter(|(len, _)| *len > LONGEST_MIN_EXCLUSIVE)
        .collect();
    candidates.sort_by(|a, b| b.0.cmp(&a.0));
    let longest = candidates
        .into_iter()
        .take(config.longest_limit)
        .map(|(len, message)| long_message(ctx, message, *len))
        .collect();

    let distinct_words = counts.len();
    TextStats {
        messages_with_text: lengths.len() as u64,
        total_words,
        distinct_words,
        top_words: top_terms(counts, config.word_limit),
        length,
        longest,
    }
}

fn long_message(ctx: &AnalysisContext<'_>, message: &Message, length: usize) -> LongMessage {
    let body = message.body().unwrap_or_default();
    let (preview, truncated) = preview(body, ctx.config.preview_chars);
    let chat_name = match ctx.dataset.chat(&message.chat_id) {
        Some(chat) => ctx.contacts.chat_name(chat).to_string(),
        None => message.chat_id.clone(),
    };

    LongMessage {
        message_id: message.id,
        chat_id: message.chat_id.clone(),
        chat_name,
        sender: message.sender.clone(),
        sender_name: ctx.contacts.sender_name(&message.sender).to_string(),
        timestamp: message.timestamp,
        length,
        preview,
        truncated,
    }
}
