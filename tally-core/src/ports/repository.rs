//! Repository port - sales storage abstraction

use crate::domain::result::Result;
use crate::domain::{ImportBatch, SaleRecord};

/// Storage for accepted sale records
///
/// The import pipeline hands every accepted record of a batch over in one
/// call. Implementations must be atomic: either the batch and all of its
/// records are committed, or nothing is.
pub trait SalesRepository: Send + Sync {
    /// Persist a finalized batch together with its records
    fn persist(&self, batch: &ImportBatch, records: &[SaleRecord]) -> Result<()>;
}
