//! DuckDB repository implementation

use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use duckdb::{params, Connection, Row};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::result::Error;
use crate::domain::{
    Attribution, CompanyId, DerivedMetrics, ImportBatch, OrderStatus, ParsedSale, PriceBand,
    SaleRecord,
};
use crate::ports::SalesRepository;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// TIMESTAMP columns hold UTC; written with microseconds, read back leniently
const TIMESTAMP_WRITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const TIMESTAMP_READ_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const SALE_COLUMNS: &str = "batch_id, line, company_id, uploaded_by, sale_date::VARCHAR, \
     product_sku, product_name, quantity, unit_price::VARCHAR, unit_cost::VARCHAR, \
     margin::VARCHAR, profit::VARCHAR, price_band, order_number, order_status, \
     buyer_state, buyer_city";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// A committed batch as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredBatch {
    pub batch_id: String,
    pub uploaded_by: String,
    pub company_id: i64,
    pub status: String,
    pub rows_read: i64,
    pub accepted_count: i64,
    pub rejected_count: i64,
    pub filename: String,
    pub content_digest: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// DuckDB-backed sales storage
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
}

impl DuckDbRepository {
    /// Open (or create) the sales database.
    ///
    /// Retries with exponential backoff when the file is locked by another
    /// process, e.g. two imports started at the same time.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[tally] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES)))
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off; nothing here needs extensions
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_with_flags(db_path, config)
            .with_context(|| format!("Failed to open {}", db_path.display()))?;
        Ok(conn)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Write a batch row and all of its sales in one transaction
    fn write_batch(&self, batch: &ImportBatch, records: &[SaleRecord]) -> Result<()> {
        let company_id = batch
            .company_id()
            .ok_or_else(|| anyhow!("batch {} has no company", batch.id()))?;
        let counts = batch.counts();

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO sys_import_batches (
                batch_id, uploaded_by, company_id, status, rows_read, accepted_count,
                rejected_count, filename, content_digest, started_at, finished_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                batch.id().to_string(),
                batch.uploaded_by(),
                company_id.0,
                batch.status().as_str(),
                counts.rows_read as i64,
                counts.accepted as i64,
                counts.rejected as i64,
                batch.filename(),
                batch.content_digest(),
                batch.started_at().format(TIMESTAMP_WRITE_FORMAT).to_string(),
                batch.finished_at().format(TIMESTAMP_WRITE_FORMAT).to_string(),
            ],
        )
        .context("Failed to insert import batch")?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO sys_sales (
                    batch_id, line, company_id, uploaded_by, sale_date, product_sku,
                    product_name, quantity, unit_price, unit_cost, margin, profit,
                    price_band, order_number, order_status, buyer_state, buyer_city
                 ) VALUES (
                    ?, ?, ?, ?, CAST(? AS DATE), ?, ?, ?,
                    CAST(? AS DECIMAL(18, 2)), CAST(? AS DECIMAL(18, 2)),
                    CAST(? AS DECIMAL(38, 6)), CAST(? AS DECIMAL(38, 2)),
                    ?, ?, ?, ?, ?
                 )",
            )?;

            for record in records {
                let sale = &record.sale;
                stmt.execute(params![
                    record.batch_id.to_string(),
                    sale.line as i64,
                    record.attribution.company_id.0,
                    &record.attribution.uploaded_by,
                    sale.sale_date.to_string(),
                    &sale.product_sku,
                    &sale.product_name,
                    sale.quantity,
                    sale.unit_price.to_string(),
                    sale.unit_cost.to_string(),
                    record.metrics.margin.map(|m| m.to_string()),
                    record.metrics.profit.to_string(),
                    record.metrics.price_band.as_str(),
                    &sale.order_number,
                    sale.order_status.as_str(),
                    &sale.buyer_state,
                    &sale.buyer_city,
                ])
                .with_context(|| format!("Failed to insert sale from line {}", sale.line))?;
            }
        }

        tx.commit().context("Failed to commit import batch")?;
        Ok(())
    }

    /// Most recently finished batches first
    pub fn list_batches(&self, limit: usize) -> Result<Vec<StoredBatch>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT batch_id, uploaded_by, company_id, status, rows_read, accepted_count,
                    rejected_count, filename, content_digest,
                    started_at::VARCHAR, finished_at::VARCHAR
             FROM sys_import_batches
             ORDER BY finished_at DESC
             LIMIT ?",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let batch = StoredBatch {
                batch_id: row.get(0)?,
                uploaded_by: row.get(1)?,
                company_id: row.get(2)?,
                status: row.get(3)?,
                rows_read: row.get(4)?,
                accepted_count: row.get(5)?,
                rejected_count: row.get(6)?,
                filename: row.get(7)?,
                content_digest: row.get(8)?,
                started_at: DateTime::<Utc>::MIN_UTC,
                finished_at: DateTime::<Utc>::MIN_UTC,
            };
            Ok((batch, row.get::<_, String>(9)?, row.get::<_, String>(10)?))
        })?;

        let mut batches = Vec::new();
        for row in rows {
            let (mut batch, started, finished) = row?;
            batch.started_at = parse_timestamp(&started)?;
            batch.finished_at = parse_timestamp(&finished)?;
            batches.push(batch);
        }
        Ok(batches)
    }

    /// Number of stored sales, optionally for one batch
    pub fn count_sales(&self, batch_id: Option<Uuid>) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = match batch_id {
            Some(id) => conn.query_row(
                "SELECT COUNT(*) FROM sys_sales WHERE batch_id = ?",
                [id.to_string()],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM sys_sales", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    /// Stored sales of one batch in source line order
    pub fn get_sales(&self, batch_id: Uuid) -> Result<Vec<SaleRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_sales WHERE batch_id = ? ORDER BY line",
            SALE_COLUMNS
        ))?;

        let rows = stmt.query_map([batch_id.to_string()], read_sale_columns)?;
        let mut sales = Vec::new();
        for row in rows {
            sales.push(row?.into_record()?);
        }
        Ok(sales)
    }
}

impl SalesRepository for DuckDbRepository {
    fn persist(&self, batch: &ImportBatch, records: &[SaleRecord]) -> crate::domain::result::Result<()> {
        self.write_batch(batch, records)
            .map_err(|e| Error::database(format!("{:#}", e)))
    }
}

/// Sale row as text, before parsing back into domain types
struct SaleColumns {
    batch_id: String,
    line: i64,
    company_id: i64,
    uploaded_by: String,
    sale_date: String,
    product_sku: String,
    product_name: String,
    quantity: u32,
    unit_price: String,
    unit_cost: String,
    margin: Option<String>,
    profit: String,
    price_band: String,
    order_number: Option<String>,
    order_status: String,
    buyer_state: Option<String>,
    buyer_city: Option<String>,
}

fn read_sale_columns(row: &Row<'_>) -> duckdb::Result<SaleColumns> {
    Ok(SaleColumns {
        batch_id: row.get(0)?,
        line: row.get(1)?,
        company_id: row.get(2)?,
        uploaded_by: row.get(3)?,
        sale_date: row.get(4)?,
        product_sku: row.get(5)?,
        product_name: row.get(6)?,
        quantity: row.get(7)?,
        unit_price: row.get(8)?,
        unit_cost: row.get(9)?,
        margin: row.get(10)?,
        profit: row.get(11)?,
        price_band: row.get(12)?,
        order_number: row.get(13)?,
        order_status: row.get(14)?,
        buyer_state: row.get(15)?,
        buyer_city: row.get(16)?,
    })
}

impl SaleColumns {
    fn into_record(self) -> Result<SaleRecord> {
        let order_status = match self.order_status.as_str() {
            "paid" => OrderStatus::Paid,
            "shipped" => OrderStatus::Shipped,
            "delivered" => OrderStatus::Delivered,
            "cancelled" => OrderStatus::Cancelled,
            other => return Err(anyhow!("Unknown order status in storage: {}", other)),
        };
        let price_band = PriceBand::parse(&self.price_band)
            .ok_or_else(|| anyhow!("Unknown price band in storage: {}", self.price_band))?;

        Ok(SaleRecord::new(
            Uuid::parse_str(&self.batch_id).context("Invalid batch id in storage")?,
            ParsedSale {
                line: self.line as u64,
                sale_date: NaiveDate::parse_from_str(&self.sale_date, "%Y-%m-%d")
                    .context("Invalid sale date in storage")?,
                product_sku: self.product_sku,
                quantity: self.quantity,
                unit_price: parse_decimal(&self.unit_price)?,
                unit_cost: parse_decimal(&self.unit_cost)?,
                product_name: self.product_name,
                order_number: self.order_number,
                order_status,
                buyer_state: self.buyer_state,
                buyer_city: self.buyer_city,
            },
            DerivedMetrics {
                margin: self.margin.as_deref().map(parse_decimal).transpose()?,
                profit: parse_decimal(&self.profit)?,
                price_band,
            },
            Attribution {
                company_id: CompanyId(self.company_id),
                uploaded_by: self.uploaded_by,
            },
        ))
    }
}

fn parse_decimal(s: &str) -> Result<Decimal> {
    Decimal::from_str(s).with_context(|| format!("Invalid decimal in storage: {}", s))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_READ_FORMAT)
        .map(|naive| naive.and_utc())
        .with_context(|| format!("Invalid timestamp in storage: {}", s))
}
