//! # chatlens-core
//!
//! Core library for chatlens, an offline analyzer for WhatsApp chat-history
//! databases.
//!
//! This library provides:
//! - Schema detection across several on-disk layouts
//! - Mapping into one canonical model of chats, messages and media
//! - Optional contact resolution against the contacts database
//! - Activity, contact, text, emoji, media and response-time analytics
//! - A serializable report model
//!
//! ## Architecture
//!
//! Data flows one way through five stages:
//! - **Detect:** classify the message database into a [`SchemaGeneration`]
//! - **Map:** extract a canonical [`Dataset`] with the matching strategy
//! - **Resolve:** build a [`ContactDirectory`] (empty without contacts)
//! - **Aggregate:** compute an [`AggregateResult`](analytics::AggregateResult)
//! - **Report:** assemble the [`Report`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use chatlens_core::{pipeline, Config, PipelineInput};
//!
//! let config = Config::load().expect("failed to load config");
//! let input = PipelineInput::new("msgstore.db").with_contacts("wa.db");
//! let report = pipeline::run(&input, &config).expect("analysis failed");
//! println!("{}", report.to_json(true).expect("serialize"));
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use contacts::{Contact, ContactDirectory, ContactRef, ContactsStatus};
pub use error::{Error, Result, Stage};
pub use ingest::SchemaGeneration;
pub use pipeline::PipelineInput;
pub use report::{DatasetStatus, Report};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod contacts;
pub mod error;
pub mod format;
pub mod ingest;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod types;
