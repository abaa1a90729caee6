//! Sales database migrations, embedded with include_str!
//!
//! Each entry is (file name, SQL). Entries are applied in this order and
//! recorded in sys_migrations.

/// Add new files as NNN_description.sql and append them here.
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_import_batches.sql", include_str!("001_import_batches.sql")),
    ("002_sales.sql", include_str!("002_sales.sql")),
];
