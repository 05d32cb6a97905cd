//! End-to-end pipeline: detect → map → resolve → aggregate → report.
//!
//! Database connections live only as long as the extraction stages need
//! them; aggregation and report assembly run on the immutable record set.
//! Fatal errors carry the [`Stage`] that produced them.

use crate::analytics;
use crate::config::Config;
use crate::contacts::{self, ContactDirectory, ContactsStatus};
use crate::error::{Result, Stage};
use crate::ingest::{self, strategies::strategy_for, KindTable};
use crate::report::{self, InputFile, Report, ReportInputs};
use crate::types::Dataset;
use std::path::{Path, PathBuf};

/// Input files of one run.
#[derive(Debug, Clone)]
pub struct PipelineInput {
    /// Message database (required)
    pub message_db: PathBuf,
    /// Contacts database (optional)
    pub contacts_db: Option<PathBuf>,
}

impl PipelineInput {
    pub fn new(message_db: impl Into<PathBuf>) -> Self {
        Self {
            message_db: message_db.into(),
            contacts_db: None,
        }
    }

    pub fn with_contacts(mut self, contacts_db: impl Into<PathBuf>) -> Self {
        self.contacts_db = Some(contacts_db.into());
        self
    }
}

/// Run the pipeline.
pub fn run(input: &PipelineInput, config: &Config) -> Result<Report> {
    run_with_progress(input, config, |_| {})
}

/// Run the pipeline, calling `on_stage` as each stage starts.
pub fn run_with_progress(
    input: &PipelineInput,
    config: &Config,
    mut on_stage: impl FnMut(Stage),
) -> Result<Report> {
    let kinds =
        KindTable::from_config(&config.classification).map_err(|e| e.in_stage(Stage::Map))?;

    on_stage(Stage::Open);
    tracing::info!(path = %input.message_db.display(), "Opening message database");
    let conn = ingest::open_read_only(&input.message_db).map_err(|e| e.in_stage(Stage::Open))?;
    let message_db =
        InputFile::identify(&input.message_db).map_err(|e| e.in_stage(Stage::Open))?;

    on_stage(Stage::Detect);
    let generation = ingest::detect(&conn).map_err(|e| e.in_stage(Stage::Detect))?;
    tracing::info!(generation = %generation, "Detected schema generation");

    on_stage(Stage::Map);
    let dataset = strategy_for(generation)
        .extract(&conn, &kinds)
        .map_err(|e| e.in_stage(Stage::Map))?;
    drop(conn);

    if dataset.is_empty() {
        tracing::warn!("No messages could be mapped; report will be empty");
    }

    on_stage(Stage::Resolve);
    let (contacts, contacts_status, contacts_db) =
        resolve_contacts(&dataset, input.contacts_db.as_deref());

    on_stage(Stage::Aggregate);
    let stats = analytics::aggregate(&dataset, &contacts, &config.analysis)
        .map_err(|e| e.in_stage(Stage::Aggregate))?;

    on_stage(Stage::Report);
    Ok(report::build(ReportInputs {
        dataset: &dataset,
        contacts: &contacts,
        contacts_status,
        stats,
        message_db,
        contacts_db,
        config: &config.analysis,
    }))
}

/// Resolve contacts, degrading to an empty directory on any failure.
fn resolve_contacts(
    dataset: &Dataset,
    path: Option<&Path>,
) -> (ContactDirectory, ContactsStatus, Option<InputFile>) {
    let Some(path) = path else {
        return (
            contacts::resolve(dataset, None).unwrap_or_default(),
            ContactsStatus::Absent,
            None,
        );
    };

    let degrade = |reason: String| {
        tracing::warn!(
            path = %path.display(),
            reason = %reason,
            "Contacts database unusable, using raw identifiers"
        );
        (
            ContactDirectory::empty(),
            ContactsStatus::Unreadable { reason },
        )
    };

    let conn = match ingest::open_read_only(path) {
        Ok(conn) => conn,
        Err(e) => {
            let (directory, status) = degrade(e.to_string());
            return (directory, status, None);
        }
    };
    let file = InputFile::identify(path).ok();

    let (directory, status) = match contacts::resolve(dataset, Some(&conn)) {
        Ok(directory) => {
            let status = ContactsStatus::Loaded {
                contacts: directory.len(),
            };
            (directory, status)
        }
        Err(e) => degrade(e.to_string()),
    };

    (directory, status, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rusqlite::Connection;

    fn message_db(dir: &Path) -> PathBuf {
        let path = dir.join("msgstore.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE messages (_id INTEGER PRIMARY KEY, key_remote_jid TEXT, key_from_me INTEGER,
                 data TEXT, timestamp INTEGER);
             INSERT INTO messages VALUES (1, 'a@s.whatsapp.net', 0, 'hi', 1000);
             INSERT INTO messages VALUES (2, 'a@s.whatsapp.net', 1, 'hello', 61000);",
        )
        .unwrap();
        path
    }

    #[test]
    fn test_run_without_contacts() {
        crate::logging::init_test();
        let dir = tempfile::tempdir().unwrap();
        let input = PipelineInput::new(message_db(dir.path()));

        let mut stages = Vec::new();
        let report = run_with_progress(&input, &Config::default(), |s| stages.push(s)).unwrap();

        assert_eq!(
            stages,
            vec![
                Stage::Open,
                Stage::Detect,
                Stage::Map,
                Stage::Resolve,
                Stage::Aggregate,
                Stage::Report
            ]
        );
        assert_eq!(report.stats.volume.total_messages, 2);
        assert_eq!(report.metadata.contacts_status, ContactsStatus::Absent);
        assert_eq!(
            report.stats.top_contacts[0].display_name,
            "a@s.whatsapp.net"
        );
    }

    #[test]
    fn test_missing_input_is_open_stage_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = PipelineInput::new(dir.path().join("nope.db"));
        let err = run(&input, &Config::default()).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Open));
    }

    #[test]
    fn test_unsupported_schema_is_detect_stage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE notes (id INTEGER)")
            .unwrap();

        let err = run(&PipelineInput::new(&path), &Config::default()).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Detect));
        match err {
            Error::Stage { source, .. } => {
                assert!(matches!(*source, Error::UnsupportedSchema { .. }))
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_unreadable_contacts_degrade() {
        crate::logging::init_test();
        let dir = tempfile::tempdir().unwrap();
        let contacts = dir.path().join("wa.db");
        std::fs::write(&contacts, "not a database ".repeat(64)).unwrap();

        let input = PipelineInput::new(message_db(dir.path())).with_contacts(&contacts);
        let report = run(&input, &Config::default()).unwrap();

        assert!(matches!(
            report.metadata.contacts_status,
            ContactsStatus::Unreadable { .. }
        ));
        assert_eq!(report.metadata.resolved_contacts, 0);
    }

    #[test]
    fn test_missing_contacts_file_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let input =
            PipelineInput::new(message_db(dir.path())).with_contacts(dir.path().join("none.db"));
        let report = run(&input, &Config::default()).unwrap();
        assert!(matches!(
            report.metadata.contacts_status,
            ContactsStatus::Unreadable { .. }
        ));
        assert!(report.metadata.contacts_db.is_none());
    }
}
