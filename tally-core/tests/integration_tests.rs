//! Integration tests for tally-core imports
//!
//! These run whole uploads through `ImportService` against a real DuckDB
//! file. Identity lookups and storage faults are faked at the trait level.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rust_decimal::Decimal;
use tempfile::TempDir;

use tally_core::adapters::directory::StaticDirectory;
use tally_core::adapters::duckdb::DuckDbRepository;
use tally_core::config::{ColumnMapping, IdentityEntry};
use tally_core::domain::result::{Error, Result};
use tally_core::domain::{
    BatchStatus, CanonicalField, CompanyId, FileFailure, HeaderProblem, ImportBatch, PriceBand,
    Role, RowErrorKind, SaleRecord, TextEncoding, UploadedFile, Uploader,
};
use tally_core::ports::SalesRepository;
use tally_core::services::{
    EntryPoint, ImportService, LoggingService, PriceBands, UploadContext,
};
use tally_core::TallyContext;

// ============================================================================
// Test Helpers
// ============================================================================

const SCENARIO: &str = "Data;SKU;Qtde;Preço;Custo\n\
                        01/03/2024;ABC1;10;50,00;30,00\n\
                        02/03/2024;ABC2;-1;20,00;25,00\n";

fn create_test_repo(temp_dir: &TempDir) -> Arc<DuckDbRepository> {
    let repo = DuckDbRepository::new(&temp_dir.path().join("test.duckdb"))
        .expect("Failed to create repository");
    repo.ensure_schema().expect("Failed to initialize schema");
    Arc::new(repo)
}

fn create_directory() -> Arc<StaticDirectory> {
    let mut identities = BTreeMap::new();
    identities.insert(
        "ana".to_string(),
        IdentityEntry {
            role: Role::Client,
            companies: [CompanyId(3)].into_iter().collect(),
        },
    );
    identities.insert(
        "gil".to_string(),
        IdentityEntry {
            role: Role::Manager,
            companies: [CompanyId(3), CompanyId(4)].into_iter().collect(),
        },
    );
    Arc::new(StaticDirectory::new(identities))
}

fn create_service(repository: Arc<dyn SalesRepository>) -> ImportService {
    ImportService::new(
        repository,
        create_directory(),
        Arc::new(ColumnMapping::default()),
        PriceBands::default(),
    )
}

fn client_upload() -> UploadContext {
    UploadContext::new(Uploader::new("ana", Role::Client))
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// Storage that always fails
struct FailingRepository;

impl SalesRepository for FailingRepository {
    fn persist(&self, _batch: &ImportBatch, _records: &[SaleRecord]) -> Result<()> {
        Err(Error::database("IO Error: disk full"))
    }
}

/// Directory that cannot be reached
struct OfflineDirectory;

impl tally_core::ports::IdentityDirectory for OfflineDirectory {
    fn resolve_companies_for(&self, _identity: &str) -> Result<BTreeSet<CompanyId>> {
        Err(Error::database("connection refused"))
    }
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[test]
fn test_semicolon_export_with_one_bad_row() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let service = create_service(repo.clone());

    let summary = service.import(UploadedFile::new("vendas.csv", SCENARIO), &client_upload());

    assert_eq!(summary.status(), BatchStatus::Completed);
    assert_eq!(summary.accepted_count, 1);
    assert_eq!(summary.rejected_count, 1);
    assert!(!summary.is_rejected());
    assert!(summary.has_row_errors());

    let record = &summary.records[0];
    assert_eq!(record.metrics.profit, dec("200.00"));
    assert_eq!(record.metrics.margin, Some(dec("0.4")));
    assert_eq!(record.metrics.price_band, PriceBand::Medium);
    assert_eq!(record.attribution.company_id, CompanyId(3));
    assert_eq!(record.attribution.uploaded_by, "ana");

    let error = &summary.errors[0];
    assert_eq!(error.line, 3);
    assert_eq!(error.field, Some(CanonicalField::Quantity));
    assert_eq!(error.kind, RowErrorKind::NegativeValue);
    assert_eq!(error.raw_value, "-1");

    let batch_id = summary.batch.id();
    assert_eq!(repo.count_sales(Some(batch_id)).unwrap(), 1);
    assert_eq!(repo.get_sales(batch_id).unwrap(), summary.records);
}

#[test]
fn test_manager_without_company_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let service = create_service(repo.clone());

    let valid = "Data;SKU;Qtde;Preço;Custo\n01/03/2024;ABC1;10;50,00;30,00\n";
    let summary = service.import(
        UploadedFile::new("vendas.csv", valid),
        &UploadContext::new(Uploader::new("gil", Role::Manager)),
    );

    assert!(summary.is_rejected());
    assert!(matches!(summary.failure, Some(FileFailure::MissingAttribution { .. })));
    assert_eq!(summary.status(), BatchStatus::Failed);
    assert_eq!(summary.accepted_count, 0);
    assert!(summary.records.is_empty());
    assert_eq!(summary.batch.company_id(), None);
    assert_eq!(repo.count_sales(None).unwrap(), 0);
}

#[test]
fn test_manager_with_explicit_company() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let service = create_service(repo.clone());

    let ctx = UploadContext::new(Uploader::new("gil", Role::Manager)).with_company(CompanyId(4));
    let summary = service.import(UploadedFile::new("vendas.csv", SCENARIO), &ctx);

    assert_eq!(summary.status(), BatchStatus::Completed);
    assert_eq!(summary.records[0].attribution.company_id, CompanyId(4));
    assert_eq!(repo.list_batches(5).unwrap()[0].company_id, 4);
}

#[test]
fn test_company_outside_scope_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let service = create_service(create_test_repo(&temp_dir));

    let summary = service.import(
        UploadedFile::new("vendas.csv", SCENARIO),
        &client_upload().with_company(CompanyId(4)),
    );

    assert!(matches!(
        summary.failure,
        Some(FileFailure::CompanyNotAccessible { company_id: CompanyId(4), .. })
    ));
}

#[test]
fn test_offline_directory_rejects_file() {
    let temp_dir = TempDir::new().unwrap();
    let service = ImportService::new(
        create_test_repo(&temp_dir),
        Arc::new(OfflineDirectory),
        Arc::new(ColumnMapping::default()),
        PriceBands::default(),
    );

    let summary = service.import(UploadedFile::new("vendas.csv", SCENARIO), &client_upload());
    assert!(matches!(summary.failure, Some(FileFailure::MissingAttribution { .. })));
}

// ============================================================================
// Whole-file failures
// ============================================================================

#[test]
fn test_missing_cost_column_rejects_file() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let service = create_service(repo.clone());

    let text = "Data;SKU;Qtde;Preço\n01/03/2024;ABC1;10;50,00\n";
    let summary = service.import(UploadedFile::new("vendas.csv", text), &client_upload());

    assert_eq!(
        summary.failure,
        Some(FileFailure::HeaderResolution {
            field: CanonicalField::UnitCost,
            problem: HeaderProblem::Missing,
        })
    );
    assert!(summary.errors.is_empty());
    assert_eq!(summary.rows_read, 0);
    assert_eq!(repo.count_sales(None).unwrap(), 0);
}

#[test]
fn test_duplicate_column_rejects_file() {
    let temp_dir = TempDir::new().unwrap();
    let service = create_service(create_test_repo(&temp_dir));

    let text = "Data,SKU,Qtde,Price,Custo,Preço\n01/03/2024,ABC1,10,50.00,30.00,50.00\n";
    let summary = service.import(UploadedFile::new("vendas.csv", text), &client_upload());

    assert_eq!(
        summary.failure,
        Some(FileFailure::HeaderResolution {
            field: CanonicalField::UnitPrice,
            problem: HeaderProblem::Duplicate,
        })
    );
}

#[test]
fn test_single_column_file_is_unparsable() {
    let temp_dir = TempDir::new().unwrap();
    let service = create_service(create_test_repo(&temp_dir));

    let summary = service.import(
        UploadedFile::new("notas.txt", "uma linha\noutra linha\n"),
        &client_upload(),
    );

    assert!(matches!(summary.failure, Some(FileFailure::UnparsableFile { .. })));
    assert_eq!(summary.diagnostics.delimiter, None);
}

#[test]
fn test_storage_failure_fails_batch_and_keeps_row_errors() {
    let service = create_service(Arc::new(FailingRepository));

    let summary = service.import(UploadedFile::new("vendas.csv", SCENARIO), &client_upload());

    assert_eq!(summary.status(), BatchStatus::Failed);
    assert_eq!(summary.accepted_count, 0);
    assert!(summary.records.is_empty());
    assert_eq!(summary.errors.len(), 1);
    match &summary.failure {
        Some(FileFailure::StorageWrite { message }) => assert!(message.contains("disk full")),
        other => panic!("expected storage failure, got {:?}", other),
    }
}

// ============================================================================
// Row handling
// ============================================================================

#[test]
fn test_row_outcomes_partition_data_rows() {
    let temp_dir = TempDir::new().unwrap();
    let service = create_service(create_test_repo(&temp_dir));

    let text = "Data;SKU;Qtde;Preço;Custo\n\
                01/03/2024;A1;1;10,00;5,00\n\
                02/03/2024;A2;dez;10,00;5,00\n\
                03/03/2024;;1;10,00;5,00\n\
                04/03/2024;A4;1;10,00;5,00;extra\n\
                05/03/2024;A5;2;199,99;100,00\n";
    let summary = service.import(UploadedFile::new("vendas.csv", text), &client_upload());

    assert_eq!(summary.rows_read, 5);
    assert_eq!(summary.accepted_count + summary.rejected_count, summary.rows_read);
    assert_eq!(summary.accepted_count, 2);

    let kinds: Vec<_> = summary.errors.iter().map(|e| (e.line, e.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            (3, RowErrorKind::TypeCoercionFailure),
            (4, RowErrorKind::MissingRequiredField),
            (5, RowErrorKind::ColumnCountMismatch),
        ]
    );

    let lines: Vec<u64> = summary.records.iter().map(|r| r.sale.line).collect();
    assert_eq!(lines, vec![2, 6]);
}

#[test]
fn test_extreme_margin_is_stored() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let service = create_service(repo.clone());

    let text = format!("{}01/03/2024;BRINDE;1;0,01;150000,00\n", SCENARIO);
    let summary = service.import(UploadedFile::new("vendas.csv", text), &client_upload());

    assert_eq!(summary.failure, None);
    assert_eq!(summary.status(), BatchStatus::Completed);
    assert_eq!(summary.accepted_count, 2);

    let stored = repo.get_sales(summary.batch.id()).unwrap();
    assert_eq!(stored.len(), 2);
    let gift = stored.iter().find(|r| r.sale.product_sku == "BRINDE").unwrap();
    assert_eq!(gift.metrics.margin, Some(dec("-14999999")));
    assert_eq!(gift.metrics.profit, dec("-149999.99"));
}

#[test]
fn test_windows_1252_export_is_decoded() {
    let temp_dir = TempDir::new().unwrap();
    let service = create_service(create_test_repo(&temp_dir));

    let mut bytes = b"Data;SKU;Qtde;Pre\xE7o;Custo;Descri\xE7\xE3o\n".to_vec();
    bytes.extend_from_slice(b"01/03/2024;ABC1;2;R$ 1.250,00;900,00;Cal\xE7a jeans\n");
    let summary = service.import(UploadedFile::new("legado.csv", bytes), &client_upload());

    assert_eq!(summary.diagnostics.encoding, Some(TextEncoding::Windows1252));
    assert!(summary.diagnostics.encoding_fallback);
    assert_eq!(summary.accepted_count, 1);
    assert_eq!(summary.records[0].sale.product_name, "Calça jeans");
    assert_eq!(summary.records[0].sale.unit_price, dec("1250.00"));
    assert_eq!(summary.records[0].metrics.price_band, PriceBand::High);
}

#[test]
fn test_mercado_livre_export() {
    let temp_dir = TempDir::new().unwrap();
    let service = create_service(create_test_repo(&temp_dir));

    let text = "N.º de venda;Data da venda;Descrição do status;SKU;Título do anúncio;Unidades;\
                Preço unitário de venda do anúncio (BRL);Custo;Tarifa de venda e impostos (BRL)\n\
                2000001;31 de outubro de 2025 23:59 hs.;Entregue;CAM-01;Camiseta;2;89,90;40,00;-12,00\n";
    let summary = service.import(UploadedFile::new("ml.csv", text), &client_upload());

    assert_eq!(summary.accepted_count, 1);
    assert_eq!(
        summary.diagnostics.source,
        tally_core::domain::SourceMarketplace::MercadoLivre
    );
    assert_eq!(
        summary.diagnostics.unmapped_columns,
        vec!["Tarifa de venda e impostos (BRL)".to_string()]
    );
    let sale = &summary.records[0].sale;
    assert_eq!(sale.order_number.as_deref(), Some("2000001"));
    assert_eq!(sale.order_status, tally_core::domain::OrderStatus::Delivered);
}

#[test]
fn test_preview_skips_storage() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let service = create_service(repo.clone());

    let summary = service.import(
        UploadedFile::new("vendas.csv", SCENARIO),
        &client_upload().preview(true),
    );

    assert!(summary.preview);
    assert_eq!(summary.accepted_count, 1);
    assert_eq!(repo.count_sales(None).unwrap(), 0);
    assert!(repo.list_batches(10).unwrap().is_empty());
}

#[test]
fn test_same_bytes_give_same_outcome() {
    let temp_dir = TempDir::new().unwrap();
    let service = create_service(create_test_repo(&temp_dir));

    let first = service.import(UploadedFile::new("vendas.csv", SCENARIO), &client_upload());
    let second = service.import(UploadedFile::new("vendas.csv", SCENARIO), &client_upload());

    assert_ne!(first.batch.id(), second.batch.id());
    assert_eq!(first.errors, second.errors);
    assert_eq!(first.diagnostics, second.diagnostics);
    let strip = |records: &[SaleRecord]| -> Vec<_> {
        records
            .iter()
            .map(|r| (r.sale.clone(), r.metrics.clone(), r.attribution.clone()))
            .collect()
    };
    assert_eq!(strip(&first.records), strip(&second.records));
}

// ============================================================================
// Context wiring
// ============================================================================

#[test]
fn test_context_from_settings_with_logger() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("settings.json"),
        r#"{
            "import": { "extraAliases": { "unit_cost": ["custo medio"] } },
            "identities": { "ana": { "role": "cliente", "companies": [3] } }
        }"#,
    )
    .unwrap();

    let logger = Arc::new(LoggingService::new(temp_dir.path(), EntryPoint::Library, "test").unwrap());
    let context = TallyContext::with_logger(temp_dir.path(), logger.clone()).unwrap();
    let uploader = context.uploader("ana").unwrap();
    assert!(context.uploader("zoe").is_err());

    let text = "Data;SKU;Qtde;Preço;Custo Médio\n01/03/2024;ABC1;10;50,00;30,00\n";
    let summary = context
        .import_service
        .import(UploadedFile::new("vendas.csv", text), &UploadContext::new(uploader));

    assert_eq!(summary.accepted_count, 1);
    assert_eq!(context.repository.count_sales(None).unwrap(), 1);

    let entries = logger.get_recent(10).unwrap();
    assert_eq!(entries[0].event, "import_completed");
    assert_eq!(entries[0].batch_id, Some(summary.batch.id().to_string()));
}
