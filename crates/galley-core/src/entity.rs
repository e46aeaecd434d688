//! Versioned-entity model: identity, table descriptors, and the
//! draft/live version state carried by every versioned row.
//!
//! A versioned table owns five versioning columns (`id`, `is_live`,
//! `live_id`, `published_at_us`, `deletion_requested`) next to its data
//! columns. The draft→live link lives only on the draft row; the live
//! side's "draft" accessor is a lookup over the `UNIQUE(live_id)` index,
//! never a stored back-pointer.

use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::WorkflowError;

/// SQLite projection handle used throughout the crate.
pub type Db = Connection;

/// Column holding the draft→live link on versioned tables.
pub const VERSION_LINK_COLUMN: &str = "live_id";

/// Columns owned by the versioning workflow, excluded from field copies.
pub const VERSION_COLUMNS: &[&str] = &[
    "id",
    "is_live",
    VERSION_LINK_COLUMN,
    "published_at_us",
    "deletion_requested",
];

/// Opaque row identity, assigned by the storage layer at insert time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EntityId(pub i64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl rusqlite::ToSql for EntityId {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl rusqlite::types::FromSql for EntityId {
    fn column_result(
        value: rusqlite::types::ValueRef<'_>,
    ) -> rusqlite::types::FromSqlResult<Self> {
        i64::column_result(value).map(Self)
    }
}

/// Static description of a versioned entity table.
///
/// `data_columns` lists every column copied between a live row and its
/// draft; the versioning columns in [`VERSION_COLUMNS`] are always
/// excluded from the copy and must not appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityType {
    /// Table holding the entity rows.
    pub table: &'static str,
    /// Columns copied field-for-field between draft and live rows.
    pub data_columns: &'static [&'static str],
}

impl EntityType {
    /// Whether the descriptor keeps data and versioning columns disjoint.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.data_columns
            .iter()
            .all(|column| !VERSION_COLUMNS.contains(column))
    }
}

/// Extension points implemented by concrete versioned entity types.
///
/// The defaults are no-ops; concrete types plug in business rules
/// (auxiliary related-data copies, publish validation).
pub trait Versioned {
    /// Table descriptor for this entity type.
    fn entity_type() -> &'static EntityType;

    /// Copy auxiliary related rows from `from` onto `to` after a field
    /// copy. Runs on the transition's transaction.
    ///
    /// # Errors
    ///
    /// Implementations return storage failures, which abort the enclosing
    /// transition.
    fn copy_relations(
        conn: &Connection,
        from: EntityId,
        to: EntityId,
    ) -> Result<(), WorkflowError> {
        let _ = (conn, from, to);
        Ok(())
    }

    /// Validate that `draft` is ready to publish.
    ///
    /// # Errors
    ///
    /// Implementations return [`WorkflowError::PublishRejected`] with a
    /// user-facing reason; the publish transaction rolls back.
    fn can_publish(conn: &Connection, draft: EntityId) -> Result<(), WorkflowError> {
        let _ = (conn, draft);
        Ok(())
    }
}

/// The versioning columns of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionState {
    pub id: EntityId,
    /// True = the published version; false = a draft.
    pub is_live: bool,
    /// Set only on drafts: the live record this draft replaces on publish.
    pub live_id: Option<EntityId>,
    /// Microsecond timestamp of the moment this row became live.
    pub published_at_us: Option<i64>,
    /// Two-phase deletion flag; only meaningful while live.
    pub deletion_requested: bool,
}

impl VersionState {
    #[must_use]
    pub const fn is_draft(&self) -> bool {
        !self.is_live
    }

    /// Live rows are published; a draft counts as published once it has a
    /// live counterpart.
    #[must_use]
    pub const fn is_published(&self) -> bool {
        self.is_live || self.live_id.is_some()
    }

    #[must_use]
    pub const fn has_pending_deletion_request(&self) -> bool {
        self.is_live && self.deletion_requested
    }

    /// Short state label used in precondition-violation messages.
    #[must_use]
    pub const fn describe(&self) -> &'static str {
        if self.is_live {
            if self.deletion_requested {
                "live with a pending deletion request"
            } else {
                "live"
            }
        } else if self.live_id.is_some() {
            "a draft"
        } else {
            "an orphan draft"
        }
    }
}

/// Status flag snapshot handed to the action derivation and to UI layers.
///
/// `has_pending_changes` is recomputed from the store on every snapshot;
/// nothing here is cached per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFlags {
    pub is_live: bool,
    pub is_published: bool,
    pub deletion_requested: bool,
    pub has_pending_changes: bool,
}

impl StatusFlags {
    #[must_use]
    pub const fn is_draft(&self) -> bool {
        !self.is_live
    }
}

/// Load the versioning columns of a row, if the row exists.
///
/// # Errors
///
/// Returns a storage failure if the query fails.
pub fn load(
    conn: &Connection,
    ty: &EntityType,
    id: EntityId,
) -> Result<Option<VersionState>, WorkflowError> {
    let sql = format!(
        "SELECT id, is_live, live_id, published_at_us, deletion_requested \
         FROM {} WHERE id = ?1",
        ty.table
    );
    let state = conn
        .query_row(&sql, params![id], |row| {
            Ok(VersionState {
                id: row.get(0)?,
                is_live: row.get(1)?,
                live_id: row.get(2)?,
                published_at_us: row.get(3)?,
                deletion_requested: row.get(4)?,
            })
        })
        .optional()?;
    Ok(state)
}

/// Load a row's version state, failing with [`WorkflowError::NotFound`]
/// when the row does not exist.
///
/// # Errors
///
/// Returns `NotFound` for a missing row, or a storage failure.
pub fn require(
    conn: &Connection,
    ty: &EntityType,
    id: EntityId,
) -> Result<VersionState, WorkflowError> {
    load(conn, ty, id)?.ok_or(WorkflowError::NotFound {
        table: ty.table,
        id,
    })
}

/// The draft currently linked to `live`, if any.
///
/// At most one row can match thanks to the `UNIQUE(live_id)` index.
///
/// # Errors
///
/// Returns a storage failure if the query fails.
pub fn draft_of(
    conn: &Connection,
    ty: &EntityType,
    live: EntityId,
) -> Result<Option<EntityId>, WorkflowError> {
    let sql = format!("SELECT id FROM {} WHERE live_id = ?1", ty.table);
    let id = conn
        .query_row(&sql, params![live], |row| row.get(0))
        .optional()?;
    Ok(id)
}

/// The live counterpart of `state`: the row itself when live, its linked
/// live record when a published draft, `None` for an orphan draft.
///
/// "No live version yet" is an expected case, not a failure.
///
/// # Errors
///
/// Returns a storage failure if the lookup fails.
pub fn get_live(
    conn: &Connection,
    ty: &EntityType,
    state: &VersionState,
) -> Result<Option<VersionState>, WorkflowError> {
    if state.is_live {
        return Ok(Some(*state));
    }
    match state.live_id {
        Some(live_id) => load(conn, ty, live_id),
        None => Ok(None),
    }
}

/// Whether the entity is a draft or a live record with a linked draft.
///
/// Always a fresh query; never cached across transitions.
///
/// # Errors
///
/// Returns a storage failure if the lookup fails.
pub fn has_pending_changes(
    conn: &Connection,
    ty: &EntityType,
    state: &VersionState,
) -> Result<bool, WorkflowError> {
    if state.is_draft() {
        return Ok(true);
    }
    Ok(draft_of(conn, ty, state.id)?.is_some())
}

/// Snapshot the derived status flags for one row.
///
/// # Errors
///
/// Returns a storage failure if the pending-changes lookup fails.
pub fn status(
    conn: &Connection,
    ty: &EntityType,
    state: &VersionState,
) -> Result<StatusFlags, WorkflowError> {
    Ok(StatusFlags {
        is_live: state.is_live,
        is_published: state.is_published(),
        deletion_requested: state.deletion_requested,
        has_pending_changes: has_pending_changes(conn, ty, state)?,
    })
}

fn list_ids(conn: &Connection, sql: &str) -> Result<Vec<EntityId>, WorkflowError> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<EntityId>>>()?;
    Ok(ids)
}

/// All live rows of a type, in id order.
///
/// # Errors
///
/// Returns a storage failure if the query fails.
pub fn list_live(conn: &Connection, ty: &EntityType) -> Result<Vec<EntityId>, WorkflowError> {
    list_ids(
        conn,
        &format!("SELECT id FROM {} WHERE is_live = 1 ORDER BY id", ty.table),
    )
}

/// All draft rows of a type, in id order.
///
/// # Errors
///
/// Returns a storage failure if the query fails.
pub fn list_drafts(conn: &Connection, ty: &EntityType) -> Result<Vec<EntityId>, WorkflowError> {
    list_ids(
        conn,
        &format!("SELECT id FROM {} WHERE is_live = 0 ORDER BY id", ty.table),
    )
}

/// Live rows awaiting deletion confirmation, in id order.
///
/// # Errors
///
/// Returns a storage failure if the query fails.
pub fn list_pending_deletion(
    conn: &Connection,
    ty: &EntityType,
) -> Result<Vec<EntityId>, WorkflowError> {
    list_ids(
        conn,
        &format!(
            "SELECT id FROM {} WHERE is_live = 1 AND deletion_requested = 1 ORDER BY id",
            ty.table
        ),
    )
}

/// Drafts plus live rows that currently have a draft, in id order.
///
/// # Errors
///
/// Returns a storage failure if the query fails.
pub fn list_pending_changes(
    conn: &Connection,
    ty: &EntityType,
) -> Result<Vec<EntityId>, WorkflowError> {
    list_ids(
        conn,
        &format!(
            "SELECT id FROM {t} WHERE is_live = 0 \
             OR id IN (SELECT live_id FROM {t} WHERE live_id IS NOT NULL) \
             ORDER BY id",
            t = ty.table
        ),
    )
}
