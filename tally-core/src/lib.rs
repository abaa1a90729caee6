//! Tally Core - sales export ingestion
//!
//! This crate implements the ingestion pipeline following hexagonal architecture:
//!
//! - **domain**: Core entities (SaleRecord, ImportBatch, RowError, etc.)
//! - **ports**: Trait definitions for external dependencies (SalesRepository, IdentityDirectory)
//! - **services**: The pipeline stages and the ImportService that runs them
//! - **adapters**: Concrete implementations (DuckDB, configured identities)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::directory::StaticDirectory;
use adapters::duckdb::DuckDbRepository;
use config::{ColumnMapping, Config};
use services::{ImportService, LoggingService};

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{
    CompanyId, FileFailure, ImportBatch, ImportSummary, Role, RowError, RowErrorKind, SaleRecord,
    UploadedFile, Uploader,
};
pub use services::{PriceBands, UploadContext};

/// Main context for Tally operations
///
/// Opens the sales database, loads configuration and wires the import
/// service to its collaborators.
pub struct TallyContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub directory: Arc<StaticDirectory>,
    pub column_mapping: Arc<ColumnMapping>,
    pub import_service: ImportService,
}

impl TallyContext {
    pub fn new(tally_dir: &Path) -> Result<Self> {
        Self::build(tally_dir, None)
    }

    /// Same as `new`, with import outcomes written to the event log
    pub fn with_logger(tally_dir: &Path, logger: Arc<LoggingService>) -> Result<Self> {
        Self::build(tally_dir, Some(logger))
    }

    fn build(tally_dir: &Path, logger: Option<Arc<LoggingService>>) -> Result<Self> {
        let config = Config::load(tally_dir).context("Failed to load settings")?;

        let repository = Arc::new(DuckDbRepository::new(&tally_dir.join("tally.duckdb"))?);
        repository.ensure_schema()?;

        let directory = Arc::new(StaticDirectory::new(config.identities.clone()));
        let column_mapping = Arc::new(config.column_mapping()?);

        let mut import_service = ImportService::new(
            repository.clone(),
            directory.clone(),
            Arc::clone(&column_mapping),
            config.price_bands,
        );
        if let Some(logger) = logger {
            import_service = import_service.with_logger(logger);
        }

        Ok(Self {
            config,
            repository,
            directory,
            column_mapping,
            import_service,
        })
    }

    /// Uploader for a configured identity
    pub fn uploader(&self, identity: &str) -> Result<Uploader> {
        self.directory
            .uploader(identity)
            .with_context(|| format!("Unknown identity '{}', add it to settings.json", identity))
    }
}
