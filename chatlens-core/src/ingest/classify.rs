//! Source type code → [`ContentKind`] classification table.

use crate::config::ClassificationConfig;
use crate::error::Result;
use crate::types::ContentKind;
use std::collections::BTreeMap;

/// Built-in classification of the source's `message_type` codes.
const DEFAULT_KINDS: &[(i64, ContentKind)] = &[
    (0, ContentKind::Text),
    (1, ContentKind::Photo),
    (2, ContentKind::Audio),
    (3, ContentKind::Video),
    (4, ContentKind::Contact),
    (5, ContentKind::Location),
    (7, ContentKind::Document),
    (8, ContentKind::Audio),
    (9, ContentKind::Document),
    (13, ContentKind::Gif),
    // voice note
    (14, ContentKind::Audio),
    (15, ContentKind::Photo),
    (20, ContentKind::Sticker),
    (26, ContentKind::Video),
    (42, ContentKind::Document),
    (43, ContentKind::Document),
];

/// Total mapping from source type codes to content kinds.
///
/// A missing code (NULL) is text. Codes not in the table are
/// [`ContentKind::Unknown`]; classification never fails.
#[derive(Debug, Clone, PartialEq)]
pub struct KindTable {
    kinds: BTreeMap<i64, ContentKind>,
}

impl Default for KindTable {
    fn default() -> Self {
        Self {
            kinds: DEFAULT_KINDS.iter().copied().collect(),
        }
    }
}

impl KindTable {
    /// Built-in table with overrides applied on top.
    pub fn with_overrides(overrides: impl IntoIterator<Item = (i64, ContentKind)>) -> Self {
        let mut table = Self::default();
        table.kinds.extend(overrides);
        table
    }

    /// Built-in table with the configured overrides.
    pub fn from_config(config: &ClassificationConfig) -> Result<Self> {
        Ok(Self::with_overrides(config.parsed_overrides()?))
    }

    pub fn classify(&self, code: Option<i64>) -> ContentKind {
        match code {
            None => ContentKind::Text,
            Some(code) => self
                .kinds
                .get(&code)
                .copied()
                .unwrap_or(ContentKind::Unknown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_classification() {
        let table = KindTable::default();
        assert_eq!(table.classify(None), ContentKind::Text);
        assert_eq!(table.classify(Some(0)), ContentKind::Text);
        assert_eq!(table.classify(Some(1)), ContentKind::Photo);
        assert_eq!(table.classify(Some(14)), ContentKind::Audio);
        assert_eq!(table.classify(Some(20)), ContentKind::Sticker);
        assert_eq!(table.classify(Some(13)), ContentKind::Gif);
    }

    #[test]
    fn test_unrecognized_code_is_unknown() {
        let table = KindTable::default();
        assert_eq!(table.classify(Some(999)), ContentKind::Unknown);
        assert_eq!(table.classify(Some(-1)), ContentKind::Unknown);
    }

    #[test]
    fn test_overrides_replace_and_extend() {
        let table = KindTable::with_overrides([(7, ContentKind::System), (99, ContentKind::Photo)]);
        assert_eq!(table.classify(Some(7)), ContentKind::System);
        assert_eq!(table.classify(Some(99)), ContentKind::Photo);
        assert_eq!(table.classify(Some(9)), ContentKind::Document);
    }

    #[test]
    fn test_from_config() {
        let mut config = ClassificationConfig::default();
        config
            .overrides
            .insert("11".to_string(), ContentKind::System);
        let table = KindTable::from_config(&config).unwrap();
        assert_eq!(table.classify(Some(11)), ContentKind::System);
        assert_eq!(table.kinds.len(), DEFAULT_KINDS.len() + 1);
    }
}
