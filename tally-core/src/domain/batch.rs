//! Import batch lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identity::CompanyId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Pending,
    Completed,
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
        }
    }
}

/// Row counts frozen when a batch is finalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchCounts {
    pub rows_read: usize,
    pub accepted: usize,
    pub rejected: usize,
}

/// A batch that is still being processed
#[derive(Debug, Clone)]
pub struct PendingBatch {
    id: Uuid,
    uploaded_by: String,
    company_id: Option<CompanyId>,
    filename: String,
    content_digest: String,
    started_at: DateTime<Utc>,
}

impl PendingBatch {
    /// Open a batch for one upload event
    pub fn open(uploaded_by: impl Into<String>, company_id: Option<CompanyId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            uploaded_by: uploaded_by.into(),
            company_id,
            filename: String::new(),
            content_digest: String::new(),
            started_at: Utc::now(),
        }
    }

    /// Record which upload the batch came from
    pub fn with_source(mut self, filename: impl Into<String>, content_digest: impl Into<String>) -> Self {
        self.filename = filename.into();
        self.content_digest = content_digest.into();
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Freeze the batch. The result has no mutating API.
    pub fn finalize(self, status: BatchStatus, counts: BatchCounts) -> ImportBatch {
        debug_assert!(status != BatchStatus::Pending, "batches finalize as completed or failed");
        ImportBatch {
            id: self.id,
            uploaded_by: self.uploaded_by,
            company_id: self.company_id,
            filename: self.filename,
            content_digest: self.content_digest,
            status,
            counts,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// A finalized upload event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportBatch {
    id: Uuid,
    uploaded_by: String,
    company_id: Option<CompanyId>,
    filename: String,
    content_digest: String,
    status: BatchStatus,
    counts: BatchCounts,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl ImportBatch {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn uploaded_by(&self) -> &str {
        &self.uploaded_by
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_digest(&self) -> &str {
        &self.content_digest
    }

    pub fn status(&self) -> BatchStatus {
        self.status
    }

    pub fn counts(&self) -> BatchCounts {
        self.counts
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }
}
