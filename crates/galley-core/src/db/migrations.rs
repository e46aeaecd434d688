//! `user_version`-keyed schema migration runner.
//!
//! The core owns no tables; concrete entity crates hand their versioned
//! SQL batches to [`migrate`]. Each pending migration applies inside its
//! own transaction, so a failure leaves the store at the last fully
//! applied version.

use rusqlite::{Connection, types::Type};

/// Read `PRAGMA user_version` and convert it to a Rust `u32`.
///
/// # Errors
///
/// Returns an error if querying SQLite fails or the version value cannot
/// be represented as `u32`.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(version).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(error))
    })
}

/// Apply all pending migrations in ascending version order.
///
/// Migrations are idempotent because each entry only runs when
/// `version > user_version`, and migration SQL uses `IF NOT EXISTS` for
/// DDL safety. Returns the schema version after the run.
///
/// # Errors
///
/// Returns an error if any migration fails; already-applied versions are
/// kept.
pub fn migrate(conn: &mut Connection, migrations: &[(u32, &str)]) -> rusqlite::Result<u32> {
    let mut current = current_schema_version(conn)?;

    for (version, sql) in migrations {
        if *version <= current {
            continue;
        }

        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", i64::from(*version))?;
        tx.commit()?;
        current = *version;
    }

    Ok(current)
}
