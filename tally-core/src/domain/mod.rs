//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod batch;
mod field;
mod identity;
mod row_error;
mod sale;
mod summary;
mod upload;
pub mod result;

pub use batch::{BatchCounts, BatchStatus, ImportBatch, PendingBatch};
pub use field::CanonicalField;
pub use identity::{CompanyId, Role, Uploader};
pub use result::{FileFailure, HeaderProblem};
pub use row_error::{RowError, RowErrorKind};
pub use sale::{Attribution, DerivedMetrics, OrderStatus, ParsedSale, PriceBand, SaleRecord};
pub use summary::{Diagnostics, ImportSummary};
pub use upload::{Delimiter, RawRow, SourceMarketplace, TextEncoding, UploadedFile};
