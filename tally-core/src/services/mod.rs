//! Service layer - the ingestion pipeline
//!
//! Each stage lives in its own module and is usable on its own;
//! `ImportService` runs them in order for one upload.

pub mod attribution;
pub mod batch;
pub mod delimiter;
pub mod encoding;
pub mod header;
pub mod import;
pub mod logging;
pub mod metrics;
pub mod migration;
pub mod row;

pub use attribution::resolve_attribution;
pub use batch::BatchWriter;
pub use delimiter::detect_delimiter;
pub use encoding::{resolve_encoding, DecodedText};
pub use header::{detect_source, normalize_header, HeaderMap};
pub use import::{ImportService, UploadContext};
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use metrics::{compute_metrics, PriceBands};
pub use migration::{MigrationResult, MigrationService};
pub use row::parse_row;
