//! `msgsift bodies`: decode rich-text message bodies.

use std::io::{self, Write};

use anyhow::{Context, Result};

use msgsift::bodies::{extract_bodies, BodyRecord};
use msgsift::cli::BodiesArgs;
use msgsift::events::load_events;
use msgsift::store::{InsertSummary, RecordStore};
use msgsift::Config;

pub fn handle(args: BodiesArgs) -> Result<()> {
    let config = Config::load()?;
    let events = load_events(&args.input)?;
    let policy = args.policy.unwrap_or(config.reconstruct.failure_policy);

    let report = extract_bodies(&events, policy)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for record in &report.records {
        writeln!(out, "{}", serde_json::to_string(record)?)?;
    }
    out.flush()?;

    if let Some(path) = args.store.or(config.store.bodies_path) {
        let mut store = RecordStore::<BodyRecord>::open(&path)
            .with_context(|| format!("Failed to open store {:?}", path))?
            .with_batch_size(config.store.batch_size);
        let InsertSummary { inserted, ignored } = store.insert_or_ignore(&report.records)?;
        let path = path.display();
        eprintln!("Stored {inserted} new body record(s) in {path} ({ignored} already present)");
    }

    if !report.failed.is_empty() {
        eprintln!(
            "Skipped {} body record(s) that could not be decoded",
            report.failed.len()
        );
    }

    Ok(())
}
