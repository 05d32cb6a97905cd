//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/chatlens/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/chatlens/` (~/.config/chatlens/)
//! - State/Logs: `$XDG_STATE_HOME/chatlens/` (~/.local/state/chatlens/)

use crate::error::{Error, Result};
use crate::types::ContentKind;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Aggregation settings
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Content-kind classification overrides
    #[serde(default)]
    pub classification: ClassificationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings consumed by the aggregator and report builder.
#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// Length of every contact/group/media ranking
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Number of words in the word-frequency list
    #[serde(default = "default_word_limit")]
    pub word_limit: usize,

    /// Number of emoji in the emoji-frequency list
    #[serde(default = "default_emoji_limit")]
    pub emoji_limit: usize,

    /// Number of entries in the longest-messages list
    #[serde(default = "default_longest_limit")]
    pub longest_limit: usize,

    /// Words shorter than this (in characters) are not counted
    #[serde(default = "default_min_word_length")]
    pub min_word_length: usize,

    /// Offset applied to timestamps before hour/day bucketing
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// Messages kept per chat in the conversation viewer
    #[serde(default = "default_conversation_limit")]
    pub conversation_limit: usize,

    /// Number of chats included in the conversation viewer
    #[serde(default = "default_conversation_chats")]
    pub conversation_chats: usize,

    /// Chats listed in the first-message and latest-message lists
    #[serde(default = "default_chat_edge_limit")]
    pub chat_edge_limit: usize,

    /// Characters kept in message previews
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    /// Stop words added to the built-in list
    #[serde(default)]
    pub extra_stop_words: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            word_limit: default_word_limit(),
            emoji_limit: default_emoji_limit(),
            longest_limit: default_longest_limit(),
            min_word_length: default_min_word_length(),
            utc_offset_minutes: 0,
            conversation_limit: default_conversation_limit(),
            conversation_chats: default_conversation_chats(),
            chat_edge_limit: default_chat_edge_limit(),
            preview_chars: default_preview_chars(),
            extra_stop_words: vec![],
        }
    }
}

impl AnalysisConfig {
    /// Validate ranges, returning an error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            return Err(Error::Config(
                "analysis.top_n must be at least 1".to_string(),
            ));
        }
        // chrono's FixedOffset only accepts offsets strictly inside one day
        if self.utc_offset_minutes.unsigned_abs() >= 24 * 60 {
            return Err(Error::Config(
                "analysis.utc_offset_minutes must be within +/- 1439".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_top_n() -> usize {
    10
}

fn default_word_limit() -> usize {
    50
}

fn default_emoji_limit() -> usize {
    30
}

fn default_longest_limit() -> usize {
    10
}

fn default_min_word_length() -> usize {
    3
}

fn default_conversation_limit() -> usize {
    200
}

fn default_conversation_chats() -> usize {
    15
}

fn default_chat_edge_limit() -> usize {
    50
}

fn default_preview_chars() -> usize {
    500
}

/// Overrides for the message-type classification table.
///
/// Keys are source type codes, values are canonical kind names:
///
/// ```toml
/// [classification.overrides]
/// "7" = "system"
/// "99" = "photo"
/// ```
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ClassificationConfig {
    #[serde(default)]
    pub overrides: BTreeMap<String, ContentKind>,
}

impl ClassificationConfig {
    /// Parse override keys into numeric type codes.
    pub fn parsed_overrides(&self) -> Result<Vec<(i64, ContentKind)>> {
        self.overrides
            .iter()
            .map(|(code, kind)| {
                code.trim()
                    .parse::<i64>()
                    .map(|c| (c, *kind))
                    .map_err(|_| {
                        Error::Config(format!(
                            "classification override key {:?} is not an integer type code",
                            code
                        ))
                    })
            })
            .collect()
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.analysis.validate()?;
        config.classification.parsed_overrides()?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/chatlens/config.toml` (~/.config/chatlens/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("chatlens").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/chatlens/` (~/.local/state/chatlens/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("chatlens")
    }

    /// Set XDG environment variables to their defaults if unset.
    ///
    /// Call once at startup, before any threads are spawned.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
