//! Tally CLI - marketplace sales exports into a queryable store

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;
mod output;

use commands::{batches, import, logs};

/// Tally - import marketplace sales exports
#[derive(Parser)]
#[command(name = "tally", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a sales export (CSV)
    Import {
        /// Path to the export file
        file: PathBuf,
        /// Identity uploading the file (must be configured in settings.json)
        #[arg(long, short = 'u', env = "TALLY_USER")]
        user: String,
        /// Company the sales belong to
        #[arg(long, short = 'c')]
        company: Option<i64>,
        /// Validate and report without storing anything
        #[arg(long)]
        preview: bool,
        /// Unit price at which the medium band starts
        #[arg(long)]
        medium_from: Option<Decimal>,
        /// Unit price at which the high band starts
        #[arg(long)]
        high_from: Option<Decimal>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List committed import batches
    Batches {
        /// Number of batches to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Import {
            file,
            user,
            company,
            preview,
            medium_from,
            high_from,
            json,
        } => import::run(import::ImportArgs {
            file,
            user,
            company,
            preview,
            medium_from,
            high_from,
            json,
        }),
        Commands::Batches { limit, json } => batches::run(limit, json),
        Commands::Logs { command } => logs::run(command),
    }
}
