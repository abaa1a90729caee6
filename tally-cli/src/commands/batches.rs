//! Batches command - list committed imports

use anyhow::Result;

use super::{get_context, get_logger, log_command};
use crate::output;

pub fn run(limit: usize, json: bool) -> Result<()> {
    let logger = get_logger();
    log_command(&logger, "batches");

    let ctx = get_context(None)?;
    let batches = ctx.repository.list_batches(limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&batches)?);
        return Ok(());
    }

    if batches.is_empty() {
        println!("No batches imported yet.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec![
        "Finished", "Batch", "File", "Uploaded by", "Company", "Accepted", "Rejected",
    ]);

    for batch in &batches {
        table.add_row(vec![
            batch.finished_at.format("%Y-%m-%d %H:%M").to_string(),
            batch.batch_id.chars().take(8).collect(),
            batch.filename.clone(),
            batch.uploaded_by.clone(),
            batch.company_id.to_string(),
            batch.accepted_count.to_string(),
            batch.rejected_count.to_string(),
        ]);
    }

    println!("{}", table);
    println!("  Stored sales: {}", ctx.repository.count_sales(None)?);

    Ok(())
}
