//! Extraction strategy trait
//!
//! Each supported schema generation has a strategy implementing
//! [`ExtractionStrategy`]. The detector's tag selects one strategy per run.
//!
//! ## Rules for implementations
//!
//! 1. **Read-only**: strategies only issue `SELECT`s
//! 2. **Resilience**: a row that cannot be mapped is skipped and tallied in
//!    [`SkipTally`](crate::types::SkipTally), never returned as an error
//! 3. **Total classification**: type codes go through [`KindTable`]

use super::{KindTable, SchemaGeneration};
use crate::error::Result;
use crate::types::Dataset;
use rusqlite::Connection;

/// Maps one schema generation into the canonical [`Dataset`].
pub trait ExtractionStrategy {
    /// Which generation this strategy handles
    fn generation(&self) -> SchemaGeneration;

    /// Extract every chat, message and media item.
    ///
    /// Only fatal errors (a query that cannot run against the detected
    /// layout) return `Err`.
    fn extract(&self, conn: &Connection, kinds: &KindTable) -> Result<Dataset>;
}
