//! Import summary returned to callers

use serde::Serialize;

use super::batch::{BatchStatus, ImportBatch};
use super::result::FileFailure;
use super::row_error::RowError;
use super::sale::SaleRecord;
use super::upload::{Delimiter, SourceMarketplace, TextEncoding};

/// File-level facts gathered while importing, for auditing degraded imports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub filename: String,
    pub size_bytes: usize,
    /// Truncated SHA-256 of the raw upload
    pub content_digest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<TextEncoding>,
    pub encoding_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<Delimiter>,
    pub source: SourceMarketplace,
    /// Header cells that matched no canonical field
    pub unmapped_columns: Vec<String>,
}

/// Result of one import run.
///
/// Whole-file problems land in `failure`; row problems land in `errors`.
/// A caller can tell "file rejected" from "file imported with bad rows" by
/// checking [`ImportSummary::is_rejected`] first.
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub batch: ImportBatch,
    pub diagnostics: Diagnostics,
    pub rows_read: usize,
    pub accepted_count: usize,
    pub rejected_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FileFailure>,
    pub errors: Vec<RowError>,
    pub records: Vec<SaleRecord>,
    /// Storage was not touched
    pub preview: bool,
}

impl ImportSummary {
    /// The whole upload was refused
    pub fn is_rejected(&self) -> bool {
        self.failure.is_some()
    }

    pub fn has_row_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn status(&self) -> BatchStatus {
        self.batch.status()
    }
}
