//! Bulk reference rewiring between two rows of the same versioned table.
//!
//! On publish and discard, everything that referenced the draft row must
//! end up referencing the live row instead. Each registered inbound
//! reference gets one bulk `UPDATE`; the whole sweep runs on the caller's
//! transaction, so any failure rolls the transition back.

use rusqlite::{Connection, params};
use tracing::debug;

use crate::entity::{EntityId, EntityType, VERSION_LINK_COLUMN};
use crate::error::{WorkflowError, is_unique_violation};
use crate::registry::RelationRegistry;

/// Identity of one row referencing an entity, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferencingRow {
    pub table: &'static str,
    pub column: &'static str,
    pub rowid: i64,
}

/// Repoint every registered reference from `from` onto `to`.
///
/// Both rows must belong to `ty`'s table. The versioned table's own
/// draft→live link column is skipped even if registered: it is a
/// structural column of the workflow, not a data reference.
///
/// Returns the total number of rewritten rows across all referencing
/// tables.
///
/// # Errors
///
/// Returns [`WorkflowError::ConflictingUniqueReference`] when the bulk
/// update would break a unique index on a referencing table (distinct rows
/// referencing both `from` and `to`); any other storage failure propagates
/// unchanged. Either way the caller's transaction is expected to roll
/// back, leaving no reference half-moved.
pub fn rewrite_references(
    conn: &Connection,
    registry: &RelationRegistry,
    ty: &EntityType,
    from: EntityId,
    to: EntityId,
) -> Result<usize, WorkflowError> {
    let mut total = 0;
    for reference in registry.related_fields(ty.table) {
        if reference.table == ty.table && reference.column == VERSION_LINK_COLUMN {
            continue;
        }
        let sql = format!(
            "UPDATE {table} SET {column} = ?1 WHERE {column} = ?2",
            table = reference.table,
            column = reference.column,
        );
        let changed = conn.execute(&sql, params![to, from]).map_err(|err| {
            if is_unique_violation(&err) {
                WorkflowError::ConflictingUniqueReference {
                    table: reference.table,
                    column: reference.column,
                }
            } else {
                WorkflowError::Storage(err)
            }
        })?;
        if changed > 0 {
            debug!(
                table = reference.table,
                column = reference.column,
                changed,
                %from,
                %to,
                "rewrote references"
            );
        }
        total += changed;
    }
    Ok(total)
}

/// Enumerate every row currently referencing `id` through a registered
/// inbound reference.
///
/// # Errors
///
/// Returns a storage failure if any lookup fails.
pub fn referencing_rows(
    conn: &Connection,
    registry: &RelationRegistry,
    ty: &EntityType,
    id: EntityId,
) -> Result<Vec<ReferencingRow>, WorkflowError> {
    let mut rows = Vec::new();
    for reference in registry.related_fields(ty.table) {
        let sql = format!(
            "SELECT rowid FROM {table} WHERE {column} = ?1 ORDER BY rowid",
            table = reference.table,
            column = reference.column,
        );
        let mut stmt = conn.prepare(&sql)?;
        let rowids = stmt
            .query_map(params![id], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        rows.extend(rowids.into_iter().map(|rowid| ReferencingRow {
            table: reference.table,
            column: reference.column,
            rowid,
        }));
    }
    Ok(rows)
}
