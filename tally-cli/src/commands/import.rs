//! Import command - load a sales export

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use rust_decimal::Decimal;

use super::{get_context, get_logger, log_command};
use crate::output;
use tally_core::domain::BatchStatus;
use tally_core::{CompanyId, ImportSummary, PriceBands, UploadContext, UploadedFile};

/// Largest export accepted, checked before the file is read
const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Rows shown in the preview table
const PREVIEW_ROWS: usize = 10;

/// Row errors listed in the text report
const ERRORS_SHOWN: usize = 20;

pub struct ImportArgs {
    pub file: PathBuf,
    pub user: String,
    pub company: Option<i64>,
    pub preview: bool,
    pub medium_from: Option<Decimal>,
    pub high_from: Option<Decimal>,
    pub json: bool,
}

pub fn run(args: ImportArgs) -> Result<()> {
    let logger = get_logger();
    log_command(&logger, "import");

    let size = std::fs::metadata(&args.file)
        .with_context(|| format!("Cannot read {}", args.file.display()))?
        .len();
    if size > MAX_UPLOAD_BYTES {
        bail!(
            "{} is {}, the limit is {}",
            args.file.display(),
            output::format_size(size),
            output::format_size(MAX_UPLOAD_BYTES)
        );
    }

    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let filename = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.file.display().to_string());

    let ctx = get_context(logger)?;
    let uploader = ctx.uploader(&args.user)?;

    let mut upload = UploadContext::new(uploader).preview(args.preview);
    if let Some(company) = args.company {
        upload = upload.with_company(CompanyId(company));
    }
    if args.medium_from.is_some() || args.high_from.is_some() {
        let defaults = ctx.config.price_bands;
        let bands = PriceBands::new(
            args.medium_from.unwrap_or(defaults.medium_from()),
            args.high_from.unwrap_or(defaults.high_from()),
        )?;
        upload = upload.with_price_bands(bands);
    }

    let summary = ctx
        .import_service
        .import(UploadedFile::new(filename, bytes), &upload);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_report(&summary);
    }

    if let Some(reason) = rejection(&summary) {
        bail!("Import rejected: {}", reason);
    }
    Ok(())
}

/// Why the command should exit non-zero, if it should
fn rejection(summary: &ImportSummary) -> Option<String> {
    match &summary.failure {
        Some(failure) => Some(failure.to_string()),
        None if summary.status() == BatchStatus::Failed => {
            Some(format!("none of {} rows could be accepted", summary.rows_read))
        }
        None => None,
    }
}

fn print_report(summary: &ImportSummary) {
    let diagnostics = &summary.diagnostics;

    if summary.preview {
        output::warning("PREVIEW MODE - Nothing stored");
        println!();
    }

    if let Some(encoding) = diagnostics.encoding {
        let line = format!("  Encoding: {}", encoding.label());
        if diagnostics.encoding_fallback {
            output::warning(&format!("{} (not UTF-8, check accented text)", line));
        } else {
            println!("{}", line);
        }
    }
    if let Some(delimiter) = diagnostics.delimiter {
        println!("  Delimiter: {}", delimiter.label());
    }
    println!("  Source: {:?}", diagnostics.source);
    if !diagnostics.unmapped_columns.is_empty() {
        println!(
            "  Ignored columns: {}",
            diagnostics.unmapped_columns.join(", ").dimmed()
        );
    }
    println!();

    if summary.preview && !summary.records.is_empty() {
        let mut table = output::create_table();
        table.set_header(vec!["Line", "Date", "SKU", "Qty", "Price", "Cost", "Profit", "Margin", "Band"]);

        for record in summary.records.iter().take(PREVIEW_ROWS) {
            let sale = &record.sale;
            let metrics = &record.metrics;
            table.add_row(vec![
                sale.line.to_string(),
                sale.sale_date.to_string(),
                sale.product_sku.clone(),
                sale.quantity.to_string(),
                sale.unit_price.to_string(),
                sale.unit_cost.to_string(),
                metrics.profit.to_string(),
                metrics
                    .margin
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                metrics.price_band.as_str().to_string(),
            ]);
        }

        println!("{}", table);
        if summary.records.len() > PREVIEW_ROWS {
            println!("... and {} more", summary.records.len() - PREVIEW_ROWS);
        }
        println!();
    }

    if let Some(failure) = &summary.failure {
        output::error(&format!("Import failed: {}", failure));
    } else if summary.accepted_count == 0 {
        output::error("Import failed: no row could be accepted");
    } else if summary.preview {
        output::info("Preview complete");
    } else {
        output::success("Import complete");
    }

    println!();
    println!("  Batch: {}", summary.batch.id());
    println!("  Rows read: {}", summary.rows_read);
    println!("  Accepted: {}", summary.accepted_count);
    println!("  Rejected: {}", summary.rejected_count);

    if summary.has_row_errors() {
        println!();
        println!("{}", "Rejected rows:".red().bold());
        for error in summary.errors.iter().take(ERRORS_SHOWN) {
            println!("  {}", error);
        }
        if summary.errors.len() > ERRORS_SHOWN {
            println!("  ... and {} more", summary.errors.len() - ERRORS_SHOWN);
        }
    }
}
