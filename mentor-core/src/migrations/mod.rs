//! Database migrations - embedded SQL files
//!
//! Two databases are managed: `mentor.duckdb` (journey progress and
//! assessments) and `logs.duckdb` (event log). Each has its own ordered
//! list of migrations, compiled in with include_str!.

/// A named migration: (filename, sql_content)
pub type Migration = (&'static str, &'static str);

/// Name of the bootstrap migration that creates `sys_migrations`
pub const BOOTSTRAP_MIGRATION: &str = "000_migrations.sql";

/// Migrations for the progress database.
///
/// When adding a migration, create `progress/NNN_description.sql` and
/// append it here in order.
pub const MIGRATIONS: &[Migration] = &[
    (BOOTSTRAP_MIGRATION, include_str!("progress/000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("progress/001_initial_schema.sql")),
];

/// Migrations for the log database.
pub const LOG_MIGRATIONS: &[Migration] = &[
    (BOOTSTRAP_MIGRATION, include_str!("logs/000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("logs/001_initial_schema.sql")),
];
