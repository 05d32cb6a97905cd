//! chatlens - analyze a WhatsApp chat-history database
//!
//! Reads the message database (and optionally the contacts database) in
//! read-only mode and writes a single JSON report.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Logs: $XDG_STATE_HOME/chatlens/chatlens.log.<date> (~/.local/state/chatlens/)
//! - Config: $XDG_CONFIG_HOME/chatlens/config.toml (~/.config/chatlens/config.toml)

use anyhow::{Context, Result};
use chatlens_core::format::{
    format_bytes, format_count, format_duration, format_hour, weekday_name,
};
use chatlens_core::{pipeline, Config, ContactsStatus, PipelineInput, Report, Stage};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "chatlens")]
#[command(about = "Analyze a WhatsApp chat-history database")]
#[command(version)]
struct Args {
    /// Message database (msgstore.db)
    message_db: PathBuf,

    /// Contacts database (wa.db) used to resolve names
    #[arg(short = 'w', long = "contacts")]
    contacts: Option<PathBuf>,

    /// Where to write the JSON report
    #[arg(short, long, default_value = "report.json")]
    output: PathBuf,

    /// Config file (defaults to the XDG config path)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the length of every ranking
    #[arg(long)]
    top: Option<usize>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,

    /// Suppress progress and summary output
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Ensure XDG environment variables are set before using core library
    Config::ensure_xdg_env();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    if let Some(top) = args.top {
        config.analysis.top_n = top;
        config.analysis.validate().context("invalid --top value")?;
    }

    let log_guard =
        chatlens_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("chatlens starting");

    let mut input = PipelineInput::new(&args.message_db);
    if let Some(contacts) = &args.contacts {
        input = input.with_contacts(contacts);
    }

    let pb = if args.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .context("invalid progress template")?,
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };

    let result = pipeline::run_with_progress(&input, &config, |stage| {
        pb.set_message(stage_message(stage));
    });
    pb.finish_and_clear();

    let report = result.context("analysis failed")?;

    let json = report
        .to_json(args.pretty)
        .context("failed to serialize report")?;
    write_atomically(&args.output, json.as_bytes())
        .with_context(|| format!("failed to write report to {}", args.output.display()))?;

    tracing::info!(
        output = %args.output.display(),
        messages = report.stats.volume.total_messages,
        "chatlens complete"
    );

    if !args.quiet {
        print_summary(&report, &args.output, log_guard.log_dir());
    }

    Ok(())
}

fn stage_message(stage: Stage) -> String {
    match stage {
        Stage::Open => "Opening databases...".to_string(),
        Stage::Detect => "Detecting schema...".to_string(),
        Stage::Map => "Reading messages...".to_string(),
        Stage::Resolve => "Resolving contacts...".to_string(),
        Stage::Aggregate => "Computing statistics...".to_string(),
        Stage::Report => "Building report...".to_string(),
    }
}

/// Write `contents` to a sibling temp file, then rename it over `path`.
fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .context("output path has no file name")?
        .to_string_lossy();
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    fs::write(&tmp, contents).with_context(|| format!("failed to write {}", tmp.display()))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("failed to move report into {}", path.display()));
    }
    Ok(())
}

fn print_summary(report: &Report, output: &Path, log_dir: &Path) {
    let meta = &report.metadata;
    let stats = &report.stats;
    let volume = &stats.volume;

    println!("Schema:   {}", meta.schema_generation);
    match &meta.contacts_status {
        ContactsStatus::Loaded { contacts } => println!("Contacts: {} resolved", contacts),
        ContactsStatus::Absent => println!("Contacts: none (raw identifiers)"),
        ContactsStatus::Unreadable { reason } => {
            println!("Contacts: unusable, using raw identifiers ({})", reason)
        }
    }

    println!();
    println!(
        "Messages: {} ({} sent, {} received)",
        format_count(volume.total_messages),
        format_count(volume.sent),
        format_count(volume.received)
    );
    println!(
        "Chats:    {} ({} direct, {} group)",
        volume.distinct_chats, volume.direct_chats, volume.group_chats
    );
    if volume.deleted > 0 {
        println!("Deleted:  {} message(s)", format_count(volume.deleted));
    }
    if meta.skipped.total > 0 {
        println!("Skipped:  {} row(s)", format_count(meta.skipped.total));
    }

    if let (Some(first), Some(last)) = (stats.activity.first_message, stats.activity.last_message)
    {
        println!(
            "Period:   {} to {} ({} days)",
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d"),
            stats.activity.span_days
        );
    }
    if let Some(hour) = stats.activity.peak_hour {
        println!("Peak:     {}", format_hour(hour));
    }
    if let Some(day) = stats.activity.busiest_day {
        println!("Busiest:  {}", weekday_name(day));
    }
    if let Some(global) = &stats.response_times.global {
        println!(
            "Replies:  median {}",
            format_duration(global.median_secs.round() as i64)
        );
    }
    if stats.media.totals.count > 0 {
        println!(
            "Media:    {} item(s), {}",
            format_count(stats.media.totals.count),
            format_bytes(stats.media.totals.bytes)
        );
    }

    if !stats.top_contacts.is_empty() {
        println!();
        println!("Top contacts:");
        for (i, chat) in stats.top_contacts.iter().enumerate() {
            println!(
                "  {:>2}. {} ({})",
                i + 1,
                chat.display_name,
                format_count(chat.total)
            );
        }
    }

    println!();
    println!("Report written to {}", output.display());
    println!("Logs in {}", log_dir.display());
}
