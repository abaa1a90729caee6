//! Import service - sales export ingestion
//!
//! One call turns the bytes of an uploaded export into an `ImportSummary`:
//! attribution, decoding, delimiter detection, header resolution, row
//! parsing, derived metrics and finally the batch write.

use std::sync::Arc;

use csv::{ReaderBuilder, StringRecord};
use sha2::{Digest, Sha256};

use super::attribution::resolve_attribution;
use super::batch::BatchWriter;
use super::delimiter::detect_delimiter;
use super::encoding::resolve_encoding;
use super::header::{detect_source, HeaderMap};
use super::logging::{LogEvent, LoggingService};
use super::metrics::{compute_metrics, PriceBands};
use super::row::parse_row;
use crate::config::ColumnMapping;
use crate::domain::{
    CompanyId, Diagnostics, FileFailure, ImportSummary, PendingBatch, RawRow, SaleRecord,
    SourceMarketplace, UploadedFile, Uploader,
};
use crate::ports::{IdentityDirectory, SalesRepository};

/// Who is uploading, for which company, and how
#[derive(Debug, Clone)]
pub struct UploadContext {
    pub uploader: Uploader,
    pub company_id: Option<CompanyId>,
    /// Overrides the service's configured thresholds
    pub price_bands: Option<PriceBands>,
    /// Run the whole pipeline but skip the storage write
    pub preview: bool,
}

impl UploadContext {
    pub fn new(uploader: Uploader) -> Self {
        Self {
            uploader,
            company_id: None,
            price_bands: None,
            preview: false,
        }
    }

    pub fn with_company(mut self, company_id: CompanyId) -> Self {
        self.company_id = Some(company_id);
        self
    }

    pub fn with_price_bands(mut self, bands: PriceBands) -> Self {
        self.price_bands = Some(bands);
        self
    }

    pub fn preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }
}

/// Import service for sales exports
///
/// Holds no per-import state; one instance serves concurrent imports.
pub struct ImportService {
    repository: Arc<dyn SalesRepository>,
    directory: Arc<dyn IdentityDirectory>,
    mapping: Arc<ColumnMapping>,
    price_bands: PriceBands,
    logger: Option<Arc<LoggingService>>,
}

impl ImportService {
    pub fn new(
        repository: Arc<dyn SalesRepository>,
        directory: Arc<dyn IdentityDirectory>,
        mapping: Arc<ColumnMapping>,
        price_bands: PriceBands,
    ) -> Self {
        Self {
            repository,
            directory,
            mapping,
            price_bands,
            logger: None,
        }
    }

    /// Attach an event log. Logging failures never affect an import.
    pub fn with_logger(mut self, logger: Arc<LoggingService>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Run one upload through the pipeline.
    ///
    /// Never fails: whole-file problems end up in `ImportSummary::failure`,
    /// per-row problems in `ImportSummary::errors`.
    pub fn import(&self, upload: UploadedFile, ctx: &UploadContext) -> ImportSummary {
        let digest = content_digest(&upload.bytes);
        let mut diagnostics = Diagnostics {
            filename: upload.filename.clone(),
            size_bytes: upload.size(),
            content_digest: digest.clone(),
            encoding: None,
            encoding_fallback: false,
            delimiter: None,
            source: SourceMarketplace::Unknown,
            unmapped_columns: Vec::new(),
        };

        // The batch carries its company, so attribution comes first
        let attribution = match resolve_attribution(&ctx.uploader, ctx.company_id, self.directory.as_ref()) {
            Ok(attribution) => attribution,
            Err(failure) => {
                let pending = PendingBatch::open(ctx.uploader.id.clone(), None)
                    .with_source(&upload.filename, &digest);
                let summary = BatchWriter::new(pending).reject_file(failure, diagnostics, ctx.preview);
                self.log_outcome(&summary);
                return summary;
            }
        };

        let pending = PendingBatch::open(ctx.uploader.id.clone(), Some(attribution.company_id))
            .with_source(&upload.filename, &digest);
        let mut writer = BatchWriter::new(pending);

        let decoded = resolve_encoding(&upload.bytes);
        diagnostics.encoding = Some(decoded.encoding);
        diagnostics.encoding_fallback = decoded.encoding.is_fallback();
        if decoded.encoding.is_fallback() {
            self.log(
                LogEvent::new("import_encoding_fallback")
                    .with_batch(writer.batch_id())
                    .with_encoding(decoded.encoding.label()),
            );
        }

        let delimiter = match detect_delimiter(&decoded.text) {
            Ok(delimiter) => delimiter,
            Err(failure) => return self.reject(writer, failure, diagnostics, ctx.preview),
        };
        diagnostics.delimiter = Some(delimiter);

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter.as_byte())
            .from_reader(decoded.text.as_bytes());
        let mut records = reader.records().map(|r| r.map(|record| raw_row(&record)));

        let header = loop {
            match records.next() {
                Some(Ok(row)) if row.is_blank() => continue,
                Some(Ok(row)) => break row,
                Some(Err(e)) => {
                    let failure = FileFailure::UnparsableFile { reason: e.to_string() };
                    return self.reject(writer, failure, diagnostics, ctx.preview);
                }
                None => {
                    let failure = FileFailure::UnparsableFile {
                        reason: "file has no header row".to_string(),
                    };
                    return self.reject(writer, failure, diagnostics, ctx.preview);
                }
            }
        };

        diagnostics.source = detect_source(&header.cells);
        let headers = match HeaderMap::resolve(&header.cells, &self.mapping) {
            Ok(headers) => headers,
            Err(failure) => return self.reject(writer, failure, diagnostics, ctx.preview),
        };
        diagnostics.unmapped_columns = headers.unmapped_columns(&header.cells);

        let bands = ctx.price_bands.as_ref().unwrap_or(&self.price_bands);

        for result in records {
            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    let failure = FileFailure::UnparsableFile { reason: e.to_string() };
                    return self.reject(writer, failure, diagnostics, ctx.preview);
                }
            };
            if row.is_blank() {
                continue;
            }

            match parse_row(&row, &headers) {
                Ok(sale) => {
                    let metrics = compute_metrics(&sale, bands);
                    let record = SaleRecord::new(writer.batch_id(), sale, metrics, attribution.clone());
                    writer.accept(record);
                }
                Err(error) => writer.reject(error),
            }
        }

        let summary = writer.finish(self.repository.as_ref(), diagnostics, ctx.preview);
        self.log_outcome(&summary);
        summary
    }

    fn reject(
        &self,
        writer: BatchWriter,
        failure: FileFailure,
        diagnostics: Diagnostics,
        preview: bool,
    ) -> ImportSummary {
        let summary = writer.reject_file(failure, diagnostics, preview);
        self.log_outcome(&summary);
        summary
    }

    fn log_outcome(&self, summary: &ImportSummary) {
        let mut event = if summary.accepted_count > 0 {
            LogEvent::new("import_completed")
        } else {
            let (message, code) = match &summary.failure {
                Some(failure) => (failure.to_string(), failure.code()),
                None => ("no rows were accepted".to_string(), "no_accepted_rows"),
            };
            LogEvent::new("import_failed")
                .with_error(message)
                .with_error_details(code)
        };
        event = event.with_batch(summary.batch.id());
        if let Some(encoding) = summary.diagnostics.encoding {
            event = event.with_encoding(encoding.label());
        }
        self.log(event);
    }

    fn log(&self, event: LogEvent) {
        if let Some(logger) = &self.logger {
            let _ = logger.log(event);
        }
    }
}

fn raw_row(record: &StringRecord) -> RawRow {
    let line = record.position().map(|p| p.line()).unwrap_or_default();
    RawRow::new(line, record.iter().map(str::to_string).collect())
}

/// First 16 hex characters of the SHA-256 of the upload
fn content_digest(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    hex::encode(&hash[..8])
}
