//! SQLite store utilities.
//!
//! Runtime defaults are intentionally conservative:
//! - `journal_mode = WAL` (configurable) to allow concurrent readers
//!   while a writer appends
//! - a configurable busy timeout to reduce transient lock failures under
//!   contention
//! - `foreign_keys = ON` so the workflow's referential integrity holds at
//!   the storage layer
//!
//! Schema lives with the concrete entity crates; callers run their
//! migrations through [`migrations::migrate`] after opening.

pub mod migrations;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

use crate::config::StoreConfig;

/// Open (or create) the store database and apply runtime pragmas.
///
/// # Errors
///
/// Returns an error if opening or configuring the database fails.
pub fn open_store(path: &Path, config: &StoreConfig) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create store directory {}", parent.display()))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("open store database {}", path.display()))?;
    configure_connection(&conn, config).context("configure sqlite pragmas")?;
    Ok(conn)
}

/// Open a private in-memory store with the same pragmas, minus the
/// journal mode (an in-memory database has no WAL).
///
/// # Errors
///
/// Returns an error if opening or configuring the database fails.
pub fn open_in_memory(config: &StoreConfig) -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory store")?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("enable foreign keys")?;
    conn.busy_timeout(config.busy_timeout())
        .context("set busy timeout")?;
    Ok(conn)
}

fn configure_connection(conn: &Connection, config: &StoreConfig) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String = conn.query_row(
        &format!("PRAGMA journal_mode = {}", config.journal_mode.as_pragma()),
        [],
        |row| row.get(0),
    )?;
    conn.busy_timeout(config.busy_timeout())?;
    Ok(())
}
