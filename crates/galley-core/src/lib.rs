#![forbid(unsafe_code)]
//! galley-core library.
//!
//! Draft/live version state machine, relation rewiring, and store
//! plumbing. Content rows live in ordinary SQLite tables carrying five
//! versioning columns next to their data; concrete entity types describe
//! their table through an [`EntityType`] and plug business rules in via
//! the [`Versioned`] hooks.
//!
//! # Conventions
//!
//! - **Errors**: workflow operations return [`WorkflowError`]; store
//!   plumbing uses `anyhow::Result` with context.
//! - **Logging**: use `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod actions;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod registry;
pub mod rewrite;
pub mod workflow;

pub use actions::{
    Action, ActionInfo, Actor, Authorizer, RequireElevated, available_actions,
};
pub use config::{GalleyConfig, JournalMode, StoreConfig, load_config};
pub use entity::{
    EntityId, EntityType, StatusFlags, VERSION_COLUMNS, VERSION_LINK_COLUMN, VersionState,
    Versioned,
};
pub use error::{ErrorCode, WorkflowError};
pub use registry::{InboundRef, RelationRegistry};
pub use rewrite::{ReferencingRow, referencing_rows, rewrite_references};
pub use workflow::Workflow;
