#![forbid(unsafe_code)]
//! galley-files library.
//!
//! The reference concrete entity type for the galley versioning
//! workflow: uploaded file records. This crate owns the file-store
//! schema, the row model, and the workflow hooks (label copies between
//! versions, publish validation), while every transition runs through
//! [`galley_core::Workflow`].
//!
//! # Conventions
//!
//! - **Errors**: store operations return `galley_core::WorkflowError`.
//! - **Logging**: use `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod migrations;
pub mod record;
pub mod schema;

use galley_core::entity::{EntityId, EntityType, Versioned};
use galley_core::error::WorkflowError;
use galley_core::registry::{InboundRef, RelationRegistry};
use rusqlite::Connection;

pub use record::{FileFields, FileRecord};

/// Table descriptor for versioned file records.
pub const FILE_TYPE: EntityType = EntityType {
    table: "files",
    data_columns: &[
        "folder_id",
        "name",
        "original_filename",
        "description",
        "owner",
        "sha1",
        "size_bytes",
        "mime_type",
        "is_public",
        "uploaded_at_us",
    ],
};

/// Marker type wiring file records into the versioning workflow.
pub struct FileEntity;

impl Versioned for FileEntity {
    fn entity_type() -> &'static EntityType {
        &FILE_TYPE
    }

    /// Labels travel with the content: the recipient's labels are
    /// replaced by a copy of the source row's.
    fn copy_relations(
        conn: &Connection,
        from: EntityId,
        to: EntityId,
    ) -> Result<(), WorkflowError> {
        conn.execute(
            "DELETE FROM file_labels WHERE file_id = ?1",
            rusqlite::params![to],
        )?;
        conn.execute(
            "INSERT INTO file_labels (file_id, label) \
             SELECT ?2, label FROM file_labels WHERE file_id = ?1",
            rusqlite::params![from, to],
        )?;
        Ok(())
    }

    /// A draft is publishable once it has a name and a content checksum.
    fn can_publish(conn: &Connection, draft: EntityId) -> Result<(), WorkflowError> {
        let record = record::load(conn, draft)?.ok_or(WorkflowError::NotFound {
            table: FILE_TYPE.table,
            id: draft,
        })?;
        if record.fields.name.trim().is_empty() {
            return Err(WorkflowError::PublishRejected {
                draft,
                reason: "file name must not be empty".to_owned(),
            });
        }
        if record.fields.sha1.is_none() {
            return Err(WorkflowError::PublishRejected {
                draft,
                reason: "file has no content checksum".to_owned(),
            });
        }
        Ok(())
    }
}

/// The inbound references subject to rewiring for the file schema.
///
/// The draft→live link on `files` itself is structural and is not
/// registered.
#[must_use]
pub fn relation_registry() -> RelationRegistry {
    let mut registry = RelationRegistry::new();
    registry.register(
        FILE_TYPE.table,
        InboundRef {
            table: "clipboard_items",
            column: "file_id",
        },
    );
    registry.register(
        FILE_TYPE.table,
        InboundRef {
            table: "share_links",
            column: "file_id",
        },
    );
    registry
}
