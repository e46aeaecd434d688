//! Workflow error taxonomy.
//!
//! Every failure class from the versioning workflow maps to a stable
//! machine-readable [`ErrorCode`] so callers (and agents driving the
//! workflow) can branch without parsing messages:
//!
//! - precondition violations are programming-error class and never
//!   silently corrected
//! - publish validation failures are recoverable and user-facing
//! - constraint violations surface from the storage layer after the
//!   enclosing transaction has rolled back

use std::fmt;

use crate::entity::EntityId;

/// Machine-readable error codes for the versioning workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotFound,
    InvalidState,
    DuplicateDraft,
    PublishRejected,
    ConflictingUniqueReference,
    StorageFailure,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotFound => "E1001",
            Self::InvalidState => "E2001",
            Self::DuplicateDraft => "E2002",
            Self::PublishRejected => "E2003",
            Self::ConflictingUniqueReference => "E2004",
            Self::StorageFailure => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotFound => "Entity not found",
            Self::InvalidState => "Transition precondition violated",
            Self::DuplicateDraft => "A draft already exists for this live record",
            Self::PublishRejected => "Draft failed publish validation",
            Self::ConflictingUniqueReference => "Reference rewrite violates a unique constraint",
            Self::StorageFailure => "Storage layer failure",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotFound => None,
            Self::InvalidState => {
                Some("Check status()/available_actions() before invoking a transition.")
            }
            Self::DuplicateDraft => Some("Publish or discard the existing draft first."),
            Self::PublishRejected => Some("Fix the draft contents and publish again."),
            Self::ConflictingUniqueReference => {
                Some("Remove one of the rows referencing the draft/live pair, then retry.")
            }
            Self::StorageFailure => Some("Inspect the underlying SQLite error."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Error returned by workflow transitions and relation rewiring.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The entity a transition was pointed at does not exist.
    #[error("no row with id {id} in {table}")]
    NotFound { table: &'static str, id: EntityId },

    /// A transition was invoked on an entity outside its required state.
    #[error("{operation} requires a {required} record, but {id} is {actual}")]
    InvalidState {
        operation: &'static str,
        required: &'static str,
        actual: &'static str,
        id: EntityId,
    },

    /// A second draft was requested for a live record that already has one.
    #[error("live record {live} already has a draft")]
    DuplicateDraft { live: EntityId },

    /// The concrete type's publish validation rejected the draft.
    #[error("draft {draft} cannot be published: {reason}")]
    PublishRejected { draft: EntityId, reason: String },

    /// Bulk reference rewiring would break a unique index on a referencing
    /// table because distinct rows reference both the draft and the live
    /// record. The rewrite is rejected, never merged.
    #[error("rewiring references on {table}.{column} would violate a unique constraint")]
    ConflictingUniqueReference {
        table: &'static str,
        column: &'static str,
    },

    /// Any other storage-layer failure, propagated unchanged.
    #[error(transparent)]
    Storage(#[from] rusqlite::Error),
}

impl WorkflowError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::InvalidState { .. } => ErrorCode::InvalidState,
            Self::DuplicateDraft { .. } => ErrorCode::DuplicateDraft,
            Self::PublishRejected { .. } => ErrorCode::PublishRejected,
            Self::ConflictingUniqueReference { .. } => ErrorCode::ConflictingUniqueReference,
            Self::Storage(_) => ErrorCode::StorageFailure,
        }
    }
}

/// Whether a rusqlite error is a `UNIQUE` (or primary-key) constraint hit.
///
/// Transitions use this to turn the `UNIQUE(live_id)` loser of a concurrent
/// `create_draft` race into [`WorkflowError::DuplicateDraft`], and the
/// rewriter uses it to detect the conflicting-reference case.
#[must_use]
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}
