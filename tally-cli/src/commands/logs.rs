//! Logs command - inspect the import event log

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use super::get_tally_dir;
use crate::output;
use tally_core::services::{EntryPoint, LogEntry, LoggingService};

/// Events written by the import pipeline, in report order
const IMPORT_EVENTS: [&str; 3] = ["import_completed", "import_failed", "import_encoding_fallback"];

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent events, newest first
    List {
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Only failed imports and other errors
        #[arg(long)]
        errors: bool,
        #[arg(long)]
        json: bool,
    },
    /// Delete events older than a number of days
    Clear {
        #[arg(long, default_value = "30")]
        older_than_days: u64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        #[arg(long)]
        json: bool,
    },
    /// Count events by kind
    Stats {
        #[arg(long)]
        json: bool,
    },
}

fn open_log() -> Result<LoggingService> {
    let tally_dir = get_tally_dir()?;
    std::fs::create_dir_all(&tally_dir)?;
    LoggingService::new(&tally_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

fn format_timestamp(timestamp_ms: i64) -> String {
    use chrono::{TimeZone, Utc};
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

/// First block of a batch id, enough to match `tally batches`
fn short_batch(entry: &LogEntry) -> String {
    entry
        .batch_id
        .as_deref()
        .map(|id| id.split('-').next().unwrap_or(id).to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Failure code for failed imports, the command name for CLI events
fn detail(entry: &LogEntry) -> String {
    if let Some(code) = &entry.error_details {
        return code.red().to_string();
    }
    entry.command.clone().unwrap_or_default()
}

pub fn run(command: LogsCommands) -> Result<()> {
    match command {
        LogsCommands::List { limit, errors, json } => {
            let log = open_log()?;
            let entries = if errors {
                log.get_errors(limit)?
            } else {
                log.get_recent(limit)?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }
            if entries.is_empty() {
                println!("No events logged.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Batch", "Encoding", "Event", "Detail", "Time"]);
            for entry in &entries {
                table.add_row(vec![
                    short_batch(entry),
                    entry.encoding.clone().unwrap_or_else(|| "-".to_string()),
                    entry.event.clone(),
                    detail(entry),
                    format_timestamp(entry.timestamp),
                ]);
            }
            println!("{}", table);

            if errors {
                for entry in &entries {
                    if let Some(message) = &entry.error_message {
                        println!("  {} {}", short_batch(entry).dimmed(), message);
                    }
                }
            }
        }
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => {
            let log = open_log()?;
            let cutoff_ms = chrono::Utc::now().timestamp_millis()
                - (older_than_days as i64 * 24 * 60 * 60 * 1000);

            if !force && !json {
                use dialoguer::Confirm;
                if !Confirm::new()
                    .with_prompt(format!("Delete events older than {} days?", older_than_days))
                    .default(false)
                    .interact()?
                {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let deleted = log.delete_before(cutoff_ms)?;
            if json {
                println!("{}", serde_json::json!({ "deleted": deleted }));
            } else {
                output::success(&format!("Deleted {} events", deleted));
            }
        }
        LogsCommands::Stats { json } => {
            let log = open_log()?;
            let by_event = log.count_by_event()?;
            let count_of = |name: &str| {
                by_event
                    .iter()
                    .find(|(event, _)| event == name)
                    .map(|(_, n)| *n)
                    .unwrap_or(0)
            };
            let db_path = log.db_path();
            let size_bytes = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

            if json {
                let events: serde_json::Map<String, serde_json::Value> = by_event
                    .iter()
                    .map(|(event, n)| (event.clone(), serde_json::json!(n)))
                    .collect();
                println!(
                    "{}",
                    serde_json::json!({
                        "total_entries": log.count()?,
                        "events": events,
                        "database_path": db_path.to_string_lossy(),
                        "database_size_bytes": size_bytes
                    })
                );
                return Ok(());
            }

            println!("{}", "Imports".bold());
            for event in IMPORT_EVENTS {
                println!("  {}: {}", event.trim_start_matches("import_"), count_of(event));
            }
            let other: u64 = by_event
                .iter()
                .filter(|(event, _)| !IMPORT_EVENTS.contains(&event.as_str()))
                .map(|(_, n)| n)
                .sum();
            println!("  other events: {}", other);
            println!();
            println!(
                "  {} ({})",
                db_path.display().to_string().dimmed(),
                output::format_size(size_bytes)
            );
        }
    }

    Ok(())
}
