//! Result and error types for the core library

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::field::CanonicalField;
use super::identity::CompanyId;

/// Core library error type, for infrastructure failures
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<duckdb::Error> for Error {
    fn from(e: duckdb::Error) -> Self {
        Self::Database(e.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderProblem {
    Missing,
    Duplicate,
}

impl fmt::Display for HeaderProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderProblem::Missing => f.write_str("no column"),
            HeaderProblem::Duplicate => f.write_str("more than one column"),
        }
    }
}

/// A failure that invalidates the whole upload.
///
/// These are data in the import summary, not errors propagated to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileFailure {
    #[error("file is not tabular: {reason}")]
    UnparsableFile { reason: String },

    #[error("header has {problem} for '{field}'")]
    HeaderResolution {
        field: CanonicalField,
        problem: HeaderProblem,
    },

    #[error("batch from '{uploaded_by}' needs an explicit company: {reason}")]
    MissingAttribution { uploaded_by: String, reason: String },

    #[error("'{uploaded_by}' cannot upload for company {company_id}")]
    CompanyNotAccessible {
        uploaded_by: String,
        company_id: CompanyId,
    },

    #[error("storage write failed: {message}")]
    StorageWrite { message: String },
}

impl FileFailure {
    /// Short machine-readable name, used in event logs
    pub fn code(&self) -> &'static str {
        match self {
            FileFailure::UnparsableFile { .. } => "unparsable_file",
            FileFailure::HeaderResolution { .. } => "header_resolution",
            FileFailure::MissingAttribution { .. } => "missing_attribution",
            FileFailure::CompanyNotAccessible { .. } => "company_not_accessible",
            FileFailure::StorageWrite { .. } => "storage_write",
        }
    }
}
