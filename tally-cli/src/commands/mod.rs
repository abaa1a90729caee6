//! CLI command implementations

pub mod batches;
pub mod import;
pub mod logs;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tally_core::services::{EntryPoint, LoggingService};
use tally_core::TallyContext;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<Arc<LoggingService>> {
    let tally_dir = get_tally_dir().ok()?;
    std::fs::create_dir_all(&tally_dir).ok()?;
    LoggingService::new(&tally_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
        .ok()
        .map(Arc::new)
}

/// Record that a command ran, ignoring any errors (logging should never break the app)
pub fn log_command(logger: &Option<Arc<LoggingService>>, command: &str) {
    if let Some(l) = logger {
        let _ = l.log_command(command);
    }
}

/// Get the tally directory from environment or default
pub fn get_tally_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("TALLY_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".tally"))
}

/// Get or create tally context
pub fn get_context(logger: Option<Arc<LoggingService>>) -> Result<TallyContext> {
    let tally_dir = get_tally_dir()?;

    std::fs::create_dir_all(&tally_dir)
        .with_context(|| format!("Failed to create tally directory: {:?}", tally_dir))?;

    let context = match logger {
        Some(logger) => TallyContext::with_logger(&tally_dir, logger),
        None => TallyContext::new(&tally_dir),
    };
    context.context("Failed to initialize tally context")
}
