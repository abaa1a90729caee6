//! Log database migrations, embedded with include_str!
//!
//! Same layout as `migrations`, applied to logs.duckdb.

pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_sys_logs.sql", include_str!("001_sys_logs.sql")),
];
