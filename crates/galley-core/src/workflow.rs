//! The draft/live state machine.
//!
//! Each transition runs inside one SQLite transaction created here: every
//! mutation it performs (field copies, relation hooks, reference
//! rewiring, row deletion) commits together or not at all. Transitions
//! begin by loading the entity and checking the required starting state;
//! a violation is a typed precondition error, never silently corrected.
//!
//! Transitions are intentionally not idempotent: invoking one twice
//! without a state change in between fails the second time, either on the
//! precondition check or on the `UNIQUE(live_id)` constraint.

use chrono::Utc;
use rusqlite::{Connection, params};
use tracing::info;

use crate::entity::{self, EntityId, EntityType, VersionState, Versioned};
use crate::error::{WorkflowError, is_unique_violation};
use crate::registry::RelationRegistry;
use crate::rewrite::rewrite_references;

/// Workflow handle over a borrowed connection and relation registry.
///
/// Create one per request with [`Workflow::new`], then invoke transitions
/// for any registered [`Versioned`] type.
pub struct Workflow<'conn> {
    conn: &'conn mut Connection,
    registry: &'conn RelationRegistry,
}

fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

fn invalid_state(
    operation: &'static str,
    required: &'static str,
    state: &VersionState,
) -> WorkflowError {
    WorkflowError::InvalidState {
        operation,
        required,
        actual: state.describe(),
        id: state.id,
    }
}

fn delete_row(conn: &Connection, ty: &EntityType, id: EntityId) -> Result<(), WorkflowError> {
    let sql = format!("DELETE FROM {} WHERE id = ?1", ty.table);
    conn.execute(&sql, params![id])?;
    Ok(())
}

fn set_deletion_requested(
    conn: &Connection,
    ty: &EntityType,
    id: EntityId,
    requested: bool,
) -> Result<(), WorkflowError> {
    let sql = format!(
        "UPDATE {} SET deletion_requested = ?1 WHERE id = ?2",
        ty.table
    );
    conn.execute(&sql, params![requested, id])?;
    Ok(())
}

/// Overwrite `to`'s data columns with `from`'s and refresh the publication
/// timestamp, in one statement.
fn copy_fields(
    conn: &Connection,
    ty: &EntityType,
    from: EntityId,
    to: EntityId,
    now_us: i64,
) -> Result<(), WorkflowError> {
    let mut sets: Vec<String> = ty
        .data_columns
        .iter()
        .map(|column| format!("{column} = src.{column}"))
        .collect();
    sets.push("published_at_us = ?3".to_owned());
    let sql = format!(
        "UPDATE {table} SET {sets} \
         FROM (SELECT * FROM {table} WHERE id = ?1) AS src \
         WHERE {table}.id = ?2",
        table = ty.table,
        sets = sets.join(", "),
    );
    conn.execute(&sql, params![from, to, now_us])?;
    Ok(())
}

impl<'conn> Workflow<'conn> {
    #[must_use]
    pub fn new(conn: &'conn mut Connection, registry: &'conn RelationRegistry) -> Self {
        Self { conn, registry }
    }

    /// Create a draft of a live record.
    ///
    /// A pending deletion request is discarded first: draft creation and a
    /// deletion request are mutually exclusive. The draft is a
    /// field-for-field copy of the live row excluding identity and
    /// versioning columns, linked back through `live_id`. The concrete
    /// type's `copy_relations` hook runs after the insert.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::InvalidState`] if the entity is not live
    /// - [`WorkflowError::DuplicateDraft`] if a draft already exists
    ///   (callers are expected to check `has_pending_changes` first)
    /// - storage failures propagate, rolling back the transaction
    pub fn create_draft<T: Versioned>(
        &mut self,
        live: EntityId,
    ) -> Result<VersionState, WorkflowError> {
        let ty = T::entity_type();
        let tx = self.conn.transaction()?;

        let state = entity::require(&tx, ty, live)?;
        if !state.is_live {
            return Err(invalid_state("create_draft", "live", &state));
        }
        if state.has_pending_deletion_request() {
            set_deletion_requested(&tx, ty, live, false)?;
        }

        let columns = ty
            .data_columns
            .iter()
            .map(|column| format!(", {column}"))
            .collect::<String>();
        let sql = format!(
            "INSERT INTO {table} (is_live, live_id, published_at_us, deletion_requested{columns}) \
             SELECT 0, id, NULL, 0{columns} FROM {table} WHERE id = ?1",
            table = ty.table,
        );
        tx.execute(&sql, params![live]).map_err(|err| {
            if is_unique_violation(&err) {
                WorkflowError::DuplicateDraft { live }
            } else {
                WorkflowError::Storage(err)
            }
        })?;
        let draft_id = EntityId(tx.last_insert_rowid());
        T::copy_relations(&tx, live, draft_id)?;
        let draft = entity::require(&tx, ty, draft_id)?;

        tx.commit()?;
        info!(table = ty.table, %live, draft = %draft_id, "created draft");
        Ok(draft)
    }

    /// Delete a draft, first rewiring any references it accumulated onto
    /// its live counterpart.
    ///
    /// An orphan draft has no rewrite target; its row is deleted outright
    /// and any remaining references surface as foreign-key failures from
    /// the storage layer.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::InvalidState`] if the entity is live
    /// - rewrite and storage failures propagate, rolling back
    pub fn discard_draft<T: Versioned>(&mut self, draft: EntityId) -> Result<(), WorkflowError> {
        let ty = T::entity_type();
        let registry = self.registry;
        let tx = self.conn.transaction()?;

        let state = entity::require(&tx, ty, draft)?;
        if state.is_live {
            return Err(invalid_state("discard_draft", "draft", &state));
        }
        let rewired = match state.live_id {
            Some(live) => rewrite_references(&tx, registry, ty, draft, live)?,
            None => 0,
        };
        delete_row(&tx, ty, draft)?;

        tx.commit()?;
        info!(table = ty.table, %draft, rewired, "discarded draft");
        Ok(())
    }

    /// Make a draft's data authoritative.
    ///
    /// With `validate`, the concrete type's `can_publish` hook runs first;
    /// a rejection rolls the transaction back with no state change.
    ///
    /// Without an existing live record the draft is promoted in place:
    /// identity is preserved, so existing references need no rewiring.
    /// With an existing live record, the draft's data columns are copied
    /// onto the live row (running `copy_relations`), references to the
    /// draft are rewired onto the live row, and the draft is deleted.
    ///
    /// Returns the now-authoritative live record.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::InvalidState`] if the entity is not a draft
    /// - [`WorkflowError::PublishRejected`] from the validation hook
    /// - [`WorkflowError::ConflictingUniqueReference`] if rewiring would
    ///   break a unique index on a referencing table
    /// - storage failures propagate, rolling back
    pub fn publish<T: Versioned>(
        &mut self,
        draft: EntityId,
        validate: bool,
    ) -> Result<VersionState, WorkflowError> {
        let ty = T::entity_type();
        let registry = self.registry;
        let tx = self.conn.transaction()?;

        let state = entity::require(&tx, ty, draft)?;
        if state.is_live {
            return Err(invalid_state("publish", "draft", &state));
        }
        if validate {
            T::can_publish(&tx, draft)?;
        }

        let now_us = now_micros();
        let (live, rewired) = match state.live_id {
            None => {
                let sql = format!(
                    "UPDATE {} SET is_live = 1, published_at_us = ?1 WHERE id = ?2",
                    ty.table
                );
                tx.execute(&sql, params![now_us, draft])?;
                (entity::require(&tx, ty, draft)?, 0)
            }
            Some(live_id) => {
                copy_fields(&tx, ty, draft, live_id, now_us)?;
                T::copy_relations(&tx, draft, live_id)?;
                let rewired = rewrite_references(&tx, registry, ty, draft, live_id)?;
                delete_row(&tx, ty, draft)?;
                (entity::require(&tx, ty, live_id)?, rewired)
            }
        };

        tx.commit()?;
        info!(table = ty.table, %draft, live = %live.id, rewired, "published");
        Ok(live)
    }

    /// First phase of deletion: flag the live record for removal.
    ///
    /// Invoked on a draft, the request is delegated to its live
    /// counterpart. A pending draft is deleted (deletion takes priority
    /// over pending edits), with its references rewired onto the live row
    /// first. Returns the flagged live record.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::InvalidState`] on an orphan draft (nothing
    ///   published to delete)
    /// - rewrite and storage failures propagate, rolling back
    pub fn request_deletion<T: Versioned>(
        &mut self,
        id: EntityId,
    ) -> Result<VersionState, WorkflowError> {
        let ty = T::entity_type();
        let registry = self.registry;
        let tx = self.conn.transaction()?;

        let state = entity::require(&tx, ty, id)?;
        let live_id = if state.is_live {
            state.id
        } else {
            state
                .live_id
                .ok_or_else(|| invalid_state("request_deletion", "published", &state))?
        };

        set_deletion_requested(&tx, ty, live_id, true)?;
        if let Some(draft) = entity::draft_of(&tx, ty, live_id)? {
            rewrite_references(&tx, registry, ty, draft, live_id)?;
            delete_row(&tx, ty, draft)?;
        }
        let live = entity::require(&tx, ty, live_id)?;

        tx.commit()?;
        info!(table = ty.table, live = %live_id, "deletion requested");
        Ok(live)
    }

    /// Cancel a pending deletion request. Calling it when no request is
    /// pending leaves the record unchanged.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::InvalidState`] if the entity is not live
    /// - storage failures propagate, rolling back
    pub fn discard_requested_deletion<T: Versioned>(
        &mut self,
        live: EntityId,
    ) -> Result<(), WorkflowError> {
        let ty = T::entity_type();
        let tx = self.conn.transaction()?;

        let state = entity::require(&tx, ty, live)?;
        if !state.is_live {
            return Err(invalid_state("discard_requested_deletion", "live", &state));
        }
        set_deletion_requested(&tx, ty, live, false)?;

        tx.commit()?;
        info!(table = ty.table, %live, "deletion request discarded");
        Ok(())
    }

    /// Second phase of deletion: permanently remove the live record.
    ///
    /// Consumes the version state: after this call the row no longer
    /// exists, and neither does the in-memory handle to it.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::InvalidState`] unless a deletion request is
    ///   pending on the current row
    /// - storage failures (including foreign keys still referencing the
    ///   row) propagate, rolling back
    pub fn publish_deletion<T: Versioned>(
        &mut self,
        state: VersionState,
    ) -> Result<(), WorkflowError> {
        let ty = T::entity_type();
        let tx = self.conn.transaction()?;

        let current = entity::require(&tx, ty, state.id)?;
        if !current.has_pending_deletion_request() {
            return Err(invalid_state(
                "publish_deletion",
                "live with a pending deletion request",
                &current,
            ));
        }
        delete_row(&tx, ty, current.id)?;

        tx.commit()?;
        info!(table = ty.table, live = %current.id, "deletion published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Workflow;
    use crate::entity::{self, EntityId, EntityType, Versioned};
    use crate::error::WorkflowError;
    use crate::registry::{InboundRef, RelationRegistry};
    use rusqlite::{Connection, OptionalExtension, params};

    const NOTE_TYPE: EntityType = EntityType {
        table: "notes",
        data_columns: &["title", "body"],
    };

    struct NoteEntity;

    impl Versioned for NoteEntity {
        fn entity_type() -> &'static EntityType {
            &NOTE_TYPE
        }

        fn copy_relations(
            conn: &Connection,
            from: EntityId,
            to: EntityId,
        ) -> Result<(), WorkflowError> {
            conn.execute("DELETE FROM note_tags WHERE note_id = ?1", params![to])?;
            conn.execute(
                "INSERT INTO note_tags (note_id, tag) \
                 SELECT ?2, tag FROM note_tags WHERE note_id = ?1",
                params![from, to],
            )?;
            Ok(())
        }

        fn can_publish(conn: &Connection, draft: EntityId) -> Result<(), WorkflowError> {
            let title: String = conn.query_row(
                "SELECT title FROM notes WHERE id = ?1",
                params![draft],
                |row| row.get(0),
            )?;
            if title.trim().is_empty() {
                return Err(WorkflowError::PublishRejected {
                    draft,
                    reason: "title must not be empty".to_owned(),
                });
            }
            Ok(())
        }
    }

    fn note_store() -> (Connection, RelationRegistry) {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.pragma_update(None, "foreign_keys", "ON")
            .expect("enable foreign keys");
        conn.execute_batch(
            "CREATE TABLE notes (
                id INTEGER PRIMARY KEY,
                is_live INTEGER NOT NULL DEFAULT 0,
                live_id INTEGER UNIQUE REFERENCES notes(id),
                published_at_us INTEGER,
                deletion_requested INTEGER NOT NULL DEFAULT 0,
                title TEXT NOT NULL,
                body TEXT
            );
            CREATE TABLE note_tags (
                note_id INTEGER NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
                tag TEXT NOT NULL,
                PRIMARY KEY (note_id, tag)
            );
            CREATE TABLE note_pins (
                id INTEGER PRIMARY KEY,
                board TEXT NOT NULL,
                note_id INTEGER NOT NULL REFERENCES notes(id)
            );",
        )
        .expect("create schema");

        let mut registry = RelationRegistry::new();
        registry.register(
            "notes",
            InboundRef {
                table: "note_pins",
                column: "note_id",
            },
        );
        (conn, registry)
    }

    fn insert_live(conn: &Connection, title: &str, body: &str) -> EntityId {
        conn.execute(
            "INSERT INTO notes (is_live, published_at_us, title, body) \
             VALUES (1, 100, ?1, ?2)",
            params![title, body],
        )
        .expect("insert live note");
        EntityId(conn.last_insert_rowid())
    }

    fn insert_orphan_draft(conn: &Connection, title: &str) -> EntityId {
        conn.execute(
            "INSERT INTO notes (is_live, title) VALUES (0, ?1)",
            params![title],
        )
        .expect("insert orphan draft");
        EntityId(conn.last_insert_rowid())
    }

    fn title_of(conn: &Connection, id: EntityId) -> String {
        conn.query_row("SELECT title FROM notes WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .expect("title")
    }

    fn tags_of(conn: &Connection, id: EntityId) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT tag FROM note_tags WHERE note_id = ?1 ORDER BY tag")
            .expect("prepare");
        stmt.query_map(params![id], |row| row.get(0))
            .expect("query")
            .collect::<rusqlite::Result<Vec<String>>>()
            .expect("collect")
    }

    fn pin_note(conn: &Connection, board: &str, id: EntityId) {
        conn.execute(
            "INSERT INTO note_pins (board, note_id) VALUES (?1, ?2)",
            params![board, id],
        )
        .expect("pin note");
    }

    fn pinned_note(conn: &Connection, board: &str) -> EntityId {
        conn.query_row(
            "SELECT note_id FROM note_pins WHERE board = ?1",
            params![board],
            |row| row.get(0),
        )
        .expect("pinned note")
    }

    #[test]
    fn create_draft_copies_fields_and_relations() {
        let (mut conn, registry) = note_store();
        let live = insert_live(&conn, "published", "original body");
        conn.execute(
            "INSERT INTO note_tags (note_id, tag) VALUES (?1, 'archive')",
            params![live],
        )
        .expect("tag live");

        let draft = Workflow::new(&mut conn, &registry)
            .create_draft::<NoteEntity>(live)
            .expect("create draft");

        assert!(draft.is_draft());
        assert_eq!(draft.live_id, Some(live));
        assert_eq!(draft.published_at_us, None);
        assert!(!draft.deletion_requested);
        assert_eq!(title_of(&conn, draft.id), "published");
        assert_eq!(tags_of(&conn, draft.id), vec!["archive".to_owned()]);

        let live_state = entity::require(&conn, &NOTE_TYPE, live).expect("require");
        assert!(entity::has_pending_changes(&conn, &NOTE_TYPE, &live_state).expect("query"));
        assert_eq!(
            entity::draft_of(&conn, &NOTE_TYPE, live).expect("draft_of"),
            Some(draft.id)
        );
    }

    #[test]
    fn second_create_draft_fails_with_duplicate() {
        let (mut conn, registry) = note_store();
        let live = insert_live(&conn, "published", "");

        Workflow::new(&mut conn, &registry)
            .create_draft::<NoteEntity>(live)
            .expect("first draft");
        let err = Workflow::new(&mut conn, &registry)
            .create_draft::<NoteEntity>(live)
            .expect_err("second draft must fail");
        assert!(matches!(err, WorkflowError::DuplicateDraft { live: l } if l == live));

        let drafts = entity::list_drafts(&conn, &NOTE_TYPE).expect("drafts");
        assert_eq!(drafts.len(), 1);
    }

    #[test]
    fn create_draft_on_draft_is_a_precondition_error() {
        let (mut conn, registry) = note_store();
        let orphan = insert_orphan_draft(&conn, "new");

        let err = Workflow::new(&mut conn, &registry)
            .create_draft::<NoteEntity>(orphan)
            .expect_err("drafts cannot have drafts");
        assert!(matches!(
            err,
            WorkflowError::InvalidState {
                operation: "create_draft",
                required: "live",
                ..
            }
        ));
    }

    #[test]
    fn create_draft_discards_pending_deletion_request() {
        let (mut conn, registry) = note_store();
        let live = insert_live(&conn, "published", "");
        conn.execute(
            "UPDATE notes SET deletion_requested = 1 WHERE id = ?1",
            params![live],
        )
        .expect("flag deletion");

        Workflow::new(&mut conn, &registry)
            .create_draft::<NoteEntity>(live)
            .expect("create draft");

        let state = entity::require(&conn, &NOTE_TYPE, live).expect("require");
        assert!(!state.deletion_requested);
    }

    #[test]
    fn publish_orphan_draft_promotes_in_place() {
        let (mut conn, registry) = note_store();
        let orphan = insert_orphan_draft(&conn, "brand new");
        pin_note(&conn, "inbox", orphan);

        let live = Workflow::new(&mut conn, &registry)
            .publish::<NoteEntity>(orphan, true)
            .expect("publish");

        assert_eq!(live.id, orphan);
        assert!(live.is_live);
        assert!(live.published_at_us.is_some());
        // Identity preserved: the pin still points at the same row.
        assert_eq!(pinned_note(&conn, "inbox"), orphan);
    }

    #[test]
    fn publish_with_live_copies_rewires_and_deletes_draft() {
        let (mut conn, registry) = note_store();
        let live = insert_live(&conn, "old title", "old body");
        pin_note(&conn, "stable", live);

        let draft = Workflow::new(&mut conn, &registry)
            .create_draft::<NoteEntity>(live)
            .expect("create draft");
        conn.execute(
            "UPDATE notes SET title = 'new title', body = 'new body' WHERE id = ?1",
            params![draft.id],
        )
        .expect("edit draft");
        conn.execute(
            "INSERT INTO note_tags (note_id, tag) VALUES (?1, 'edited')",
            params![draft.id],
        )
        .expect("tag draft");
        pin_note(&conn, "review", draft.id);

        let published = Workflow::new(&mut conn, &registry)
            .publish::<NoteEntity>(draft.id, true)
            .expect("publish");

        assert_eq!(published.id, live);
        assert!(published.is_live);
        assert_eq!(title_of(&conn, live), "new title");
        assert_eq!(tags_of(&conn, live), vec!["edited".to_owned()]);
        // The draft row is gone and both pins now point at the live row.
        assert!(entity::load(&conn, &NOTE_TYPE, draft.id)
            .expect("load")
            .is_none());
        assert_eq!(pinned_note(&conn, "stable"), live);
        assert_eq!(pinned_note(&conn, "review"), live);

        let state = entity::require(&conn, &NOTE_TYPE, live).expect("require");
        assert!(!entity::has_pending_changes(&conn, &NOTE_TYPE, &state).expect("query"));
    }

    #[test]
    fn publish_validation_failure_rolls_back() {
        let (mut conn, registry) = note_store();
        let live = insert_live(&conn, "kept", "kept body");
        let draft = Workflow::new(&mut conn, &registry)
            .create_draft::<NoteEntity>(live)
            .expect("create draft");
        conn.execute(
            "UPDATE notes SET title = '  ' WHERE id = ?1",
            params![draft.id],
        )
        .expect("blank out title");

        let err = Workflow::new(&mut conn, &registry)
            .publish::<NoteEntity>(draft.id, true)
            .expect_err("validation must reject");
        assert!(matches!(err, WorkflowError::PublishRejected { .. }));

        // Nothing changed: draft still present, live untouched.
        assert!(entity::load(&conn, &NOTE_TYPE, draft.id)
            .expect("load")
            .is_some());
        assert_eq!(title_of(&conn, live), "kept");

        // Skipping validation publishes the same draft.
        Workflow::new(&mut conn, &registry)
            .publish::<NoteEntity>(draft.id, false)
            .expect("unvalidated publish");
        assert_eq!(title_of(&conn, live), "  ");
    }

    #[test]
    fn publish_on_live_is_a_precondition_error() {
        let (mut conn, registry) = note_store();
        let live = insert_live(&conn, "published", "");

        let err = Workflow::new(&mut conn, &registry)
            .publish::<NoteEntity>(live, true)
            .expect_err("live records cannot be published");
        assert!(matches!(
            err,
            WorkflowError::InvalidState {
                operation: "publish",
                required: "draft",
                ..
            }
        ));
    }

    #[test]
    fn discard_draft_rewires_then_deletes() {
        let (mut conn, registry) = note_store();
        let live = insert_live(&conn, "published", "");
        let draft = Workflow::new(&mut conn, &registry)
            .create_draft::<NoteEntity>(live)
            .expect("create draft");
        pin_note(&conn, "stray", draft.id);

        Workflow::new(&mut conn, &registry)
            .discard_draft::<NoteEntity>(draft.id)
            .expect("discard draft");

        assert!(entity::load(&conn, &NOTE_TYPE, draft.id)
            .expect("load")
            .is_none());
        assert_eq!(pinned_note(&conn, "stray"), live);

        let state = entity::require(&conn, &NOTE_TYPE, live).expect("require");
        assert!(!entity::has_pending_changes(&conn, &NOTE_TYPE, &state).expect("query"));
    }

    #[test]
    fn discard_orphan_draft_just_deletes() {
        let (mut conn, registry) = note_store();
        let orphan = insert_orphan_draft(&conn, "scratch");

        Workflow::new(&mut conn, &registry)
            .discard_draft::<NoteEntity>(orphan)
            .expect("discard orphan");
        assert!(entity::load(&conn, &NOTE_TYPE, orphan)
            .expect("load")
            .is_none());
    }

    #[test]
    fn request_deletion_flags_live_and_drops_draft() {
        let (mut conn, registry) = note_store();
        let live = insert_live(&conn, "published", "");
        let draft = Workflow::new(&mut conn, &registry)
            .create_draft::<NoteEntity>(live)
            .expect("create draft");

        let flagged = Workflow::new(&mut conn, &registry)
            .request_deletion::<NoteEntity>(live)
            .expect("request deletion");

        assert_eq!(flagged.id, live);
        assert!(flagged.has_pending_deletion_request());
        assert!(entity::load(&conn, &NOTE_TYPE, draft.id)
            .expect("load")
            .is_none());
    }

    #[test]
    fn request_deletion_on_draft_delegates_to_live() {
        let (mut conn, registry) = note_store();
        let live = insert_live(&conn, "published", "");
        let draft = Workflow::new(&mut conn, &registry)
            .create_draft::<NoteEntity>(live)
            .expect("create draft");

        let flagged = Workflow::new(&mut conn, &registry)
            .request_deletion::<NoteEntity>(draft.id)
            .expect("request deletion via draft");

        assert_eq!(flagged.id, live);
        assert!(flagged.has_pending_deletion_request());
    }

    #[test]
    fn request_deletion_on_orphan_draft_fails() {
        let (mut conn, registry) = note_store();
        let orphan = insert_orphan_draft(&conn, "unpublished");

        let err = Workflow::new(&mut conn, &registry)
            .request_deletion::<NoteEntity>(orphan)
            .expect_err("nothing published to delete");
        assert!(matches!(
            err,
            WorkflowError::InvalidState {
                operation: "request_deletion",
                required: "published",
                ..
            }
        ));
    }

    #[test]
    fn deletion_request_roundtrip() {
        let (mut conn, registry) = note_store();
        let live = insert_live(&conn, "published", "");

        Workflow::new(&mut conn, &registry)
            .request_deletion::<NoteEntity>(live)
            .expect("request");
        Workflow::new(&mut conn, &registry)
            .discard_requested_deletion::<NoteEntity>(live)
            .expect("discard request");

        let state = entity::require(&conn, &NOTE_TYPE, live).expect("require");
        assert!(!state.deletion_requested);

        let flagged = Workflow::new(&mut conn, &registry)
            .request_deletion::<NoteEntity>(live)
            .expect("request again");
        Workflow::new(&mut conn, &registry)
            .publish_deletion::<NoteEntity>(flagged)
            .expect("publish deletion");

        assert!(entity::load(&conn, &NOTE_TYPE, live).expect("load").is_none());
    }

    #[test]
    fn publish_deletion_without_request_fails() {
        let (mut conn, registry) = note_store();
        let live = insert_live(&conn, "published", "");
        let state = entity::require(&conn, &NOTE_TYPE, live).expect("require");

        let err = Workflow::new(&mut conn, &registry)
            .publish_deletion::<NoteEntity>(state)
            .expect_err("no deletion request pending");
        assert!(matches!(
            err,
            WorkflowError::InvalidState {
                operation: "publish_deletion",
                ..
            }
        ));
        assert!(entity::load(&conn, &NOTE_TYPE, live).expect("load").is_some());
    }

    #[test]
    fn transitions_reject_missing_rows() {
        let (mut conn, registry) = note_store();
        let missing = EntityId(404);

        let err = Workflow::new(&mut conn, &registry)
            .create_draft::<NoteEntity>(missing)
            .expect_err("missing row");
        assert!(matches!(err, WorkflowError::NotFound { .. }));

        let gone: Option<i64> = conn
            .query_row("SELECT id FROM notes WHERE id = 404", [], |row| row.get(0))
            .optional()
            .expect("query");
        assert!(gone.is_none());
    }
}
