//! Error types for chatlens-core

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stage, used to tag fatal errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Open,
    Detect,
    Map,
    Resolve,
    Aggregate,
    Report,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Open => "open",
            Stage::Detect => "schema detection",
            Stage::Map => "record mapping",
            Stage::Resolve => "contact resolution",
            Stage::Aggregate => "aggregation",
            Stage::Report => "report",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the chatlens-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Primary input file does not exist
    #[error("message database not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// No known schema generation matched the message database
    #[error("unsupported schema: no known table layout matched (tables: {})", tables.join(", "))]
    UnsupportedSchema { tables: Vec<String> },

    /// Contacts database absent or unreadable
    #[error("contacts database unavailable: {0}")]
    MissingAuxiliaryData(String),

    /// A fatal error, tagged with the stage that produced it
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Tag this error with the stage it came from.
    ///
    /// Already-tagged errors keep their original stage.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            Error::Stage { .. } => self,
            other => Error::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage this error was tagged with, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Result type alias for chatlens-core
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_tag_is_kept_once() {
        let err = Error::Config("bad".to_string())
            .in_stage(Stage::Detect)
            .in_stage(Stage::Report);
        assert_eq!(err.stage(), Some(Stage::Detect));
        assert_eq!(
            err.to_string(),
            "schema detection stage failed: configuration error: bad"
        );
    }

    #[test]
    fn test_unsupported_schema_lists_tables() {
        let err = Error::UnsupportedSchema {
            tables: vec!["foo".to_string(), "bar".to_string()],
        };
        assert!(err.to_string().contains("foo, bar"));
    }
}
