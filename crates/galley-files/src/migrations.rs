//! File-store schema migrations, applied through the core runner.

use rusqlite::Connection;

use crate::schema;

/// Latest schema version understood by this crate.
pub const LATEST_SCHEMA_VERSION: u32 = 2;

const MIGRATIONS: &[(u32, &str)] = &[
    (1, schema::MIGRATION_V1_SQL),
    (2, schema::MIGRATION_V2_SQL),
];

/// Apply all pending file-store migrations.
///
/// # Errors
///
/// Returns an error if any migration fails.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
    let version = galley_core::db::migrations::migrate(conn, MIGRATIONS)?;
    tracing::debug!(version, "file store schema up to date");
    Ok(version)
}
