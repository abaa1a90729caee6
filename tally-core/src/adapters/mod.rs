//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the SalesRepository port
//! - Configuration-backed table for the IdentityDirectory port

pub mod directory;
pub mod duckdb;
