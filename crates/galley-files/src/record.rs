//! File-record model: row mapping and store helpers.

use chrono::Utc;
use galley_core::entity::{self, EntityId, VersionState};
use galley_core::error::WorkflowError;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::FILE_TYPE;

/// The data columns of a file row, draft and live alike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileFields {
    pub folder_id: Option<i64>,
    pub name: String,
    pub original_filename: Option<String>,
    pub description: Option<String>,
    pub owner: Option<String>,
    /// Hex digest of the stored content; publishing requires one.
    pub sha1: Option<String>,
    pub size_bytes: i64,
    pub mime_type: Option<String>,
    pub is_public: bool,
    pub uploaded_at_us: i64,
}

impl Default for FileFields {
    fn default() -> Self {
        Self {
            folder_id: None,
            name: String::new(),
            original_filename: None,
            description: None,
            owner: None,
            sha1: None,
            size_bytes: 0,
            mime_type: None,
            is_public: false,
            uploaded_at_us: 0,
        }
    }
}

/// One file row: versioning columns plus data columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub state: VersionState,
    pub fields: FileFields,
}

impl FileRecord {
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.state.id
    }
}

fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

fn insert(
    conn: &Connection,
    fields: &FileFields,
    is_live: bool,
    published_at_us: Option<i64>,
) -> Result<EntityId, WorkflowError> {
    conn.execute(
        "INSERT INTO files (
            is_live, published_at_us, folder_id, name, original_filename,
            description, owner, sha1, size_bytes, mime_type, is_public,
            uploaded_at_us
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            is_live,
            published_at_us,
            fields.folder_id,
            fields.name,
            fields.original_filename,
            fields.description,
            fields.owner,
            fields.sha1,
            fields.size_bytes,
            fields.mime_type,
            fields.is_public,
            fields.uploaded_at_us,
        ],
    )?;
    Ok(EntityId(conn.last_insert_rowid()))
}

/// Insert newly uploaded content as an orphan draft, to be edited and
/// then published.
///
/// # Errors
///
/// Returns a storage failure if the insert fails.
pub fn insert_draft(conn: &Connection, fields: &FileFields) -> Result<EntityId, WorkflowError> {
    insert(conn, fields, false, None)
}

/// Insert content directly as a live record, published now.
///
/// # Errors
///
/// Returns a storage failure if the insert fails.
pub fn insert_live(conn: &Connection, fields: &FileFields) -> Result<EntityId, WorkflowError> {
    insert(conn, fields, true, Some(now_micros()))
}

/// Load a full file row, if it exists.
///
/// # Errors
///
/// Returns a storage failure if the query fails.
pub fn load(conn: &Connection, id: EntityId) -> Result<Option<FileRecord>, WorkflowError> {
    let record = conn
        .query_row(
            "SELECT id, is_live, live_id, published_at_us, deletion_requested,
                    folder_id, name, original_filename, description, owner,
                    sha1, size_bytes, mime_type, is_public, uploaded_at_us
             FROM files WHERE id = ?1",
            params![id],
            |row| {
                Ok(FileRecord {
                    state: VersionState {
                        id: row.get(0)?,
                        is_live: row.get(1)?,
                        live_id: row.get(2)?,
                        published_at_us: row.get(3)?,
                        deletion_requested: row.get(4)?,
                    },
                    fields: FileFields {
                        folder_id: row.get(5)?,
                        name: row.get(6)?,
                        original_filename: row.get(7)?,
                        description: row.get(8)?,
                        owner: row.get(9)?,
                        sha1: row.get(10)?,
                        size_bytes: row.get(11)?,
                        mime_type: row.get(12)?,
                        is_public: row.get(13)?,
                        uploaded_at_us: row.get(14)?,
                    },
                })
            },
        )
        .optional()?;
    Ok(record)
}

/// Overwrite a row's data columns, typically while editing a draft.
///
/// # Errors
///
/// Returns [`WorkflowError::NotFound`] when the row does not exist, or a
/// storage failure.
pub fn update_fields(
    conn: &Connection,
    id: EntityId,
    fields: &FileFields,
) -> Result<(), WorkflowError> {
    let changed = conn.execute(
        "UPDATE files SET
            folder_id = ?2, name = ?3, original_filename = ?4,
            description = ?5, owner = ?6, sha1 = ?7, size_bytes = ?8,
            mime_type = ?9, is_public = ?10, uploaded_at_us = ?11
         WHERE id = ?1",
        params![
            id,
            fields.folder_id,
            fields.name,
            fields.original_filename,
            fields.description,
            fields.owner,
            fields.sha1,
            fields.size_bytes,
            fields.mime_type,
            fields.is_public,
            fields.uploaded_at_us,
        ],
    )?;
    if changed == 0 {
        return Err(WorkflowError::NotFound {
            table: FILE_TYPE.table,
            id,
        });
    }
    Ok(())
}

/// Attach a label to a file row. Duplicates are ignored.
///
/// # Errors
///
/// Returns a storage failure if the insert fails.
pub fn add_label(conn: &Connection, file: EntityId, label: &str) -> Result<(), WorkflowError> {
    conn.execute(
        "INSERT OR IGNORE INTO file_labels (file_id, label) VALUES (?1, ?2)",
        params![file, label],
    )?;
    Ok(())
}

/// Labels attached to a file row, sorted.
///
/// # Errors
///
/// Returns a storage failure if the query fails.
pub fn labels(conn: &Connection, file: EntityId) -> Result<Vec<String>, WorkflowError> {
    let mut stmt =
        conn.prepare("SELECT label FROM file_labels WHERE file_id = ?1 ORDER BY label")?;
    let labels = stmt
        .query_map(params![file], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(labels)
}

/// Put a file on a named clipboard; returns the clipboard item id.
///
/// # Errors
///
/// Returns a storage failure if the insert fails.
pub fn add_to_clipboard(
    conn: &Connection,
    clipboard: &str,
    file: EntityId,
) -> Result<i64, WorkflowError> {
    conn.execute(
        "INSERT INTO clipboard_items (clipboard, file_id, added_at_us) VALUES (?1, ?2, ?3)",
        params![clipboard, file, now_micros()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Files on a named clipboard, in insertion order.
///
/// # Errors
///
/// Returns a storage failure if the query fails.
pub fn clipboard_files(
    conn: &Connection,
    clipboard: &str,
) -> Result<Vec<EntityId>, WorkflowError> {
    let mut stmt = conn
        .prepare("SELECT file_id FROM clipboard_items WHERE clipboard = ?1 ORDER BY id")?;
    let files = stmt
        .query_map(params![clipboard], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<EntityId>>>()?;
    Ok(files)
}

/// Create a share link for a file. Each file carries at most one link.
///
/// # Errors
///
/// Returns a storage failure (including the unique-link violation) if the
/// insert fails.
pub fn create_share_link(
    conn: &Connection,
    token: &str,
    file: EntityId,
) -> Result<i64, WorkflowError> {
    conn.execute(
        "INSERT INTO share_links (token, file_id, created_at_us) VALUES (?1, ?2, ?3)",
        params![token, file, now_micros()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Resolve a share token to the file it points at.
///
/// # Errors
///
/// Returns a storage failure if the query fails.
pub fn shared_file(conn: &Connection, token: &str) -> Result<Option<EntityId>, WorkflowError> {
    let file = conn
        .query_row(
            "SELECT file_id FROM share_links WHERE token = ?1",
            params![token],
            |row| row.get(0),
        )
        .optional()?;
    Ok(file)
}

/// All live file rows, in id order.
///
/// # Errors
///
/// Returns a storage failure if the query fails.
pub fn live_files(conn: &Connection) -> Result<Vec<EntityId>, WorkflowError> {
    entity::list_live(conn, &FILE_TYPE)
}

/// All draft file rows, in id order.
///
/// # Errors
///
/// Returns a storage failure if the query fails.
pub fn draft_files(conn: &Connection) -> Result<Vec<EntityId>, WorkflowError> {
    entity::list_drafts(conn, &FILE_TYPE)
}

/// Live file rows awaiting deletion confirmation, in id order.
///
/// # Errors
///
/// Returns a storage failure if the query fails.
pub fn files_pending_deletion(conn: &Connection) -> Result<Vec<EntityId>, WorkflowError> {
    entity::list_pending_deletion(conn, &FILE_TYPE)
}

/// Drafts plus live rows with a draft, in id order.
///
/// # Errors
///
/// Returns a storage failure if the query fails.
pub fn files_pending_changes(conn: &Connection) -> Result<Vec<EntityId>, WorkflowError> {
    entity::list_pending_changes(conn, &FILE_TYPE)
}

#[cfg(test)]
mod tests {
    use super::{
        FileFields, add_label, add_to_clipboard, clipboard_files, insert_draft, insert_live,
        labels, load, shared_file, update_fields,
    };
    use crate::migrations;
    use galley_core::entity::EntityId;
    use galley_core::error::WorkflowError;
    use rusqlite::Connection;

    fn file_conn() -> Connection {
        let mut conn = Connection::open_in_memory().expect("open in-memory db");
        conn.pragma_update(None, "foreign_keys", "ON")
            .expect("enable foreign keys");
        migrations::migrate(&mut conn).expect("migrate");
        conn
    }

    fn sample_fields(name: &str) -> FileFields {
        FileFields {
            name: name.to_owned(),
            original_filename: Some(format!("{name}.orig")),
            sha1: Some("da39a3ee5e6b4b0d3255bfef95601890afd80709".to_owned()),
            size_bytes: 1_024,
            mime_type: Some("application/pdf".to_owned()),
            uploaded_at_us: 42,
            ..FileFields::default()
        }
    }

    #[test]
    fn insert_and_load_roundtrip() {
        let conn = file_conn();
        let fields = sample_fields("report.pdf");

        let live = insert_live(&conn, &fields).expect("insert live");
        let record = load(&conn, live).expect("load").expect("row exists");
        assert!(record.state.is_live);
        assert!(record.state.published_at_us.is_some());
        assert_eq!(record.fields, fields);

        let draft = insert_draft(&conn, &fields).expect("insert draft");
        let record = load(&conn, draft).expect("load").expect("row exists");
        assert!(record.state.is_draft());
        assert_eq!(record.state.live_id, None);
        assert_eq!(record.state.published_at_us, None);
    }

    #[test]
    fn update_fields_replaces_data_columns() {
        let conn = file_conn();
        let live = insert_live(&conn, &sample_fields("old.pdf")).expect("insert");

        let mut fields = sample_fields("new.pdf");
        fields.description = Some("revised".to_owned());
        update_fields(&conn, live, &fields).expect("update");

        let record = load(&conn, live).expect("load").expect("row exists");
        assert_eq!(record.fields.name, "new.pdf");
        assert_eq!(record.fields.description.as_deref(), Some("revised"));

        let err = update_fields(&conn, EntityId(404), &fields).expect_err("missing row");
        assert!(matches!(err, WorkflowError::NotFound { .. }));
    }

    #[test]
    fn labels_are_deduplicated_and_sorted() {
        let conn = file_conn();
        let live = insert_live(&conn, &sample_fields("tagged.pdf")).expect("insert");

        add_label(&conn, live, "quarterly").expect("label");
        add_label(&conn, live, "finance").expect("label");
        add_label(&conn, live, "quarterly").expect("duplicate label");

        assert_eq!(
            labels(&conn, live).expect("labels"),
            vec!["finance".to_owned(), "quarterly".to_owned()]
        );
    }

    #[test]
    fn clipboard_and_share_lookups() {
        let conn = file_conn();
        let a = insert_live(&conn, &sample_fields("a.pdf")).expect("insert");
        let b = insert_live(&conn, &sample_fields("b.pdf")).expect("insert");

        add_to_clipboard(&conn, "review", a).expect("clip a");
        add_to_clipboard(&conn, "review", b).expect("clip b");
        assert_eq!(clipboard_files(&conn, "review").expect("clipboard"), vec![a, b]);
        assert!(clipboard_files(&conn, "empty").expect("clipboard").is_empty());

        super::create_share_link(&conn, "tok-a", a).expect("share");
        assert_eq!(shared_file(&conn, "tok-a").expect("lookup"), Some(a));
        assert_eq!(shared_file(&conn, "tok-b").expect("lookup"), None);
    }
}
