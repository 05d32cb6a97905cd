//! Emoji frequencies.
//!
//! Counts emoji code points wherever they appear in a body. Joiners,
//! variation selectors and skin-tone modifiers are not counted on their own.

use super::{top_terms, AnalysisContext, TermCount};
use crate::types::ContentKind;
use serde::Serialize;
use std::collections::HashMap;

/// Code point ranges treated as emoji.
const EMOJI_RANGES: &[(u32, u32)] = &[
    (0x00A9, 0x00A9),   // ©
    (0x00AE, 0x00AE),   // ®
    (0x203C, 0x203C),
    (0x2049, 0x2049),
    (0x2122, 0x2122),
    (0x2139, 0x2139),
    (0x2194, 0x2199),
    (0x21A9, 0x21AA),
    (0x231A, 0x231B),
    (0x2328, 0x2328),
    (0x23CF, 0x23CF),
    (0x23E9, 0x23F3),
    (0x23F8, 0x23FA),
    (0x24C2, 0x24C2),
    (0x25AA, 0x25AB),
    (0x25B6, 0x25B6),
    (0x25C0, 0x25C0),
    (0x25FB, 0x25FE),
    (0x2600, 0x27BF),   // misc symbols, dingbats
    (0x2934, 0x2935),
    (0x2B05, 0x2B07),
    (0x2B1B, 0x2B1C),
    (0x2B50, 0x2B50),
    (0x2B55, 0x2B55),
    (0x3030, 0x3030),
    (0x303D, 0x303D),
    (0x3297, 0x3297),
    (0x3299, 0x3299),
    (0x1F004, 0x1F004),
    (0x1F0CF, 0x1F0CF),
    (0x1F170, 0x1F251), // enclosed alphanumerics and ideographs
    (0x1F300, 0x1F3FA), // pictographs (skin tones excluded)
    (0x1F400, 0x1F64F), // pictographs, emoticons
    (0x1F680, 0x1F6FF), // transport and map
    (0x1F7E0, 0x1F7F0),
    (0x1F900, 0x1F9FF), // supplemental symbols
    (0x1FA70, 0x1FAFF), // symbols and pictographs extended-A
];

/// Whether `c` counts as an emoji.
pub fn is_emoji(c: char) -> bool {
    let cp = c as u32;
    EMOJI_RANGES
        .binary_search_by(|(lo, hi)| {
            if *hi < cp {
                std::cmp::Ordering::Less
            } else if *lo > cp {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        })
        .is_ok()
}

/// Emoji metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EmojiStats {
    pub total: u64,
    pub distinct: usize,
    /// Messages containing at least one emoji
    pub messages_with_emoji: u64,
    pub top: Vec<TermCount>,
}

pub fn compute(ctx: &AnalysisContext<'_>) -> EmojiStats {
    let mut counts: HashMap<String, u64> = HashMap::new();
    let mut total = 0;
    let mut messages_with_emoji = 0;

    for message in &ctx.dataset.messages {
        if message.kind == ContentKind::System {
            continue;
        }
        let Some(body) = message.text.as_deref() else {
            continue;
        };

        let mut found = false;
        for c in body.chars().filter(|c| is_emoji(*c)) {
            total += 1;
            found = true;
            *counts.entry(c.to_string()).or_insert(0) += 1;
        }
        if found {
            messages_with_emoji += 1;
        }
    }

    EmojiStats {
        total,
        distinct: counts.len(),
        messages_with_emoji,
        top: top_terms(counts, ctx.config.emoji_limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::testutil::DatasetBuilder;
    use crate::config::AnalysisConfig;
    use crate::contacts::ContactDirectory;

    #[test]
    fn test_ranges_are_sorted() {
        for pair in EMOJI_RANGES.windows(2) {
            assert!(pair[0].1 < pair[1].0, "{:x?} overlaps {:x?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_is_emoji() {
        for c in ['😀', '❤', '👍', '🚀', '🤣', '🥲', '⭐', '☕'] {
            assert!(is_emoji(c), "{} should be an emoji", c);
        }
        for c in ['a', 'ş', '1', ' ', '!', '\u{200D}', '\u{FE0F}', '\u{1F3FB}'] {
            assert!(!is_emoji(c), "{:?} should not be an emoji", c);
        }
    }

    #[test]
    fn test_emoji_counts() {
        let a = "a@s.whatsapp.net";
        let ds = DatasetBuilder::new()
            .msg(a, None, 1, "great 😀😀 see you 👍")
            .msg(a, Some(a), 2, "no emoji here")
            .msg(a, Some(a), 3, "👍🏽 and 😀")
            .build();
        let contacts = ContactDirectory::empty();
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(&ds, &contacts, &config).unwrap();

        let stats = compute(&ctx);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.distinct, 2);
        assert_eq!(stats.messages_with_emoji, 2);
        assert_eq!(stats.top[0].term, "😀");
        assert_eq!(stats.top[0].count, 3);
        assert_eq!(stats.top[1].term, "👍");
    }
}
