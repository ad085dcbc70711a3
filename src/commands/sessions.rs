//! `msgsift sessions`: reconstruct game sessions from a message export.

use std::io::{self, Write};

use anyhow::{Context, Result};
use chrono::DateTime;
use tracing::info;

use msgsift::assemble::{session_records, SessionRecord};
use msgsift::cli::{OutputFormat, SessionsArgs};
use msgsift::events::load_events;
use msgsift::registry::{AppRegistry, ChainedRegistry, FileRegistry, StaticRegistry};
use msgsift::store::{InsertSummary, RecordStore};
use msgsift::{Config, Reconstructor, TerminationOutcome};

pub fn handle(args: SessionsArgs) -> Result<()> {
    let config = Config::load()?;
    let events = load_events(&args.input)?;

    let mut options = config.reconstruct_options();
    if let Some(policy) = args.policy {
        options.policy = policy;
    }
    if args.sequential {
        options.parallel = false;
    }

    let registry = registry_for(&args, &config);
    let reconstructor = Reconstructor::new(registry.as_ref(), options)
        .context("Failed to load application registry")?;
    let report = reconstructor.run(&events)?;

    let skipped = report.failures.len();
    let excluded = report.excluded;
    let records = session_records(report.sessions);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.format {
        OutputFormat::Jsonl => write_jsonl(&mut out, &records)?,
        OutputFormat::Table => write_table(&mut out, &records)?,
    }
    out.flush()?;

    if let Some(path) = args.store.or(config.store.sessions_path) {
        let mut store = RecordStore::<SessionRecord>::open(&path)
            .with_context(|| format!("Failed to open store {:?}", path))?
            .with_batch_size(config.store.batch_size);
        let InsertSummary { inserted, ignored } = store.insert_or_ignore(&records)?;
        info!(inserted, ignored, "Stored sessions");

        let path = path.display();
        eprintln!("Stored {inserted} new session(s) in {path} ({ignored} already present)");
    }

    if skipped > 0 {
        eprintln!("Skipped {skipped} session(s) that could not be reconstructed");
    }
    if excluded > 0 {
        info!(excluded, "Messages without correlation id were ignored");
    }

    Ok(())
}

/// Flags replace the configured registry instead of adding to it.
fn registry_for(args: &SessionsArgs, config: &Config) -> Box<dyn AppRegistry> {
    if args.registry.is_none() && args.app_ids.is_empty() {
        return config.registry();
    }

    let mut sources: Vec<Box<dyn AppRegistry>> = Vec::new();
    if let Some(path) = &args.registry {
        sources.push(Box::new(FileRegistry::new(path)));
    }
    sources.push(Box::new(StaticRegistry::new(args.app_ids.clone())));
    Box::new(ChainedRegistry::new(sources))
}

fn write_jsonl<W: Write>(out: &mut W, records: &[SessionRecord]) -> Result<()> {
    for record in records {
        writeln!(out, "{}", serde_json::to_string(record)?)?;
    }
    Ok(())
}

fn write_table<W: Write>(out: &mut W, records: &[SessionRecord]) -> Result<()> {
    writeln!(
        out,
        "{:<24} {:<16} {:<16} {:<8} {:>6} {:>6}",
        "SESSION", "GAME", "STARTED", "OUTCOME", "OWN", "OPP"
    )?;
    for record in records {
        let outcome = TerminationOutcome::from_code(record.outcome)
            .map(|o| o.to_string())
            .unwrap_or_else(|| record.outcome.to_string());
        writeln!(
            out,
            "{:<24} {:<16} {:<16} {:<8} {:>6} {:>6}",
            truncate(&record.correlation_id, 24),
            truncate(&record.application_id, 16),
            format_timestamp(record.start_timestamp),
            outcome,
            score(record.own_score),
            score(record.opponent_score),
        )?;
    }
    Ok(())
}

fn format_timestamp(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| secs.to_string())
}

fn score(value: Option<i64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
