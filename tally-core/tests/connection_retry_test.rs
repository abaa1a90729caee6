//! Tests for opening the sales database repeatedly
//!
//! Run with: cargo test --test connection_retry_test -- --nocapture

use std::time::Instant;
use tempfile::TempDir;

use tally_core::adapters::duckdb::DuckDbRepository;

/// Open and close the same file several times, re-running migrations each time
#[test]
fn test_sequential_connections() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test_sequential.duckdb");

    for i in 0..5 {
        let start = Instant::now();
        let repo = DuckDbRepository::new(&db_path).unwrap();
        let result = repo.run_migrations().unwrap();
        println!("Connection {}: opened in {:?}", i, start.elapsed());

        if i == 0 {
            assert!(!result.applied.is_empty());
        } else {
            assert!(result.applied.is_empty());
        }
        // Connection dropped at end of loop
    }
}

/// A fresh file starts with no batches and no sales
#[test]
fn test_fresh_database_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let repo = DuckDbRepository::new(&temp_dir.path().join("fresh.duckdb")).unwrap();
    repo.ensure_schema().unwrap();

    assert_eq!(repo.count_sales(None).unwrap(), 0);
    assert!(repo.list_batches(10).unwrap().is_empty());
}

/// Opening a path inside a missing directory fails without retrying forever
#[test]
fn test_unreachable_path_fails() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("missing").join("nested").join("x.duckdb");

    let start = Instant::now();
    assert!(DuckDbRepository::new(&db_path).is_err());
    println!("Failed after {:?}", start.elapsed());
}
