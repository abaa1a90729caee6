//! Batch accumulation and finalization

use uuid::Uuid;

use crate::domain::{
    BatchCounts, BatchStatus, Diagnostics, FileFailure, ImportSummary, PendingBatch, RowError,
    SaleRecord,
};
use crate::ports::SalesRepository;

/// Collects the outcome of every row of one upload, in source order
pub struct BatchWriter {
    pending: PendingBatch,
    records: Vec<SaleRecord>,
    errors: Vec<RowError>,
}

impl BatchWriter {
    pub fn new(pending: PendingBatch) -> Self {
        Self {
            pending,
            records: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn batch_id(&self) -> Uuid {
        self.pending.id()
    }

    pub fn accept(&mut self, record: SaleRecord) {
        self.records.push(record);
    }

    pub fn reject(&mut self, error: RowError) {
        self.errors.push(error);
    }

    pub fn rows_read(&self) -> usize {
        self.records.len() + self.errors.len()
    }

    /// Close the batch after a whole-file failure. No records survive.
    pub fn reject_file(
        self,
        failure: FileFailure,
        diagnostics: Diagnostics,
        preview: bool,
    ) -> ImportSummary {
        let counts = BatchCounts {
            rows_read: self.rows_read(),
            accepted: 0,
            rejected: self.errors.len(),
        };
        ImportSummary {
            batch: self.pending.finalize(BatchStatus::Failed, counts),
            diagnostics,
            rows_read: counts.rows_read,
            accepted_count: 0,
            rejected_count: counts.rejected,
            failure: Some(failure),
            errors: self.errors,
            records: Vec::new(),
            preview,
        }
    }

    /// Close the batch and hand accepted records to storage.
    ///
    /// Storage is called once, and only when there is something to write and
    /// this is not a preview. A storage error fails the batch and drops its
    /// records; row errors are kept.
    pub fn finish(
        self,
        storage: &dyn SalesRepository,
        diagnostics: Diagnostics,
        preview: bool,
    ) -> ImportSummary {
        let counts = BatchCounts {
            rows_read: self.rows_read(),
            accepted: self.records.len(),
            rejected: self.errors.len(),
        };

        if self.records.is_empty() {
            return ImportSummary {
                batch: self.pending.finalize(BatchStatus::Failed, counts),
                diagnostics,
                rows_read: counts.rows_read,
                accepted_count: 0,
                rejected_count: counts.rejected,
                failure: None,
                errors: self.errors,
                records: Vec::new(),
                preview,
            };
        }

        let committed = self.pending.clone().finalize(BatchStatus::Completed, counts);
        if preview {
            return ImportSummary {
                batch: committed,
                diagnostics,
                rows_read: counts.rows_read,
                accepted_count: counts.accepted,
                rejected_count: counts.rejected,
                failure: None,
                errors: self.errors,
                records: self.records,
                preview,
            };
        }

        match storage.persist(&committed, &self.records) {
            Ok(()) => ImportSummary {
                batch: committed,
                diagnostics,
                rows_read: counts.rows_read,
                accepted_count: counts.accepted,
                rejected_count: counts.rejected,
                failure: None,
                errors: self.errors,
                records: self.records,
                preview,
            },
            Err(e) => {
                let counts = BatchCounts {
                    accepted: 0,
                    ..counts
                };
                ImportSummary {
                    batch: self.pending.finalize(BatchStatus::Failed, counts),
                    diagnostics,
                    rows_read: counts.rows_read,
                    accepted_count: 0,
                    rejected_count: counts.rejected,
                    failure: Some(FileFailure::StorageWrite {
                        message: e.to_string(),
                    }),
                    errors: self.errors,
                    records: Vec::new(),
                    preview,
                }
            }
        }
    }
}
