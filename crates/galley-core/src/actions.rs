//! Derivation of the workflow actions available on an entity.
//!
//! Pure computation over a [`StatusFlags`] snapshot: no storage access,
//! no mutation. The result is an ordered action → metadata map a UI layer
//! can render as buttons, with per-action authorization resolved through
//! a pluggable [`Authorizer`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fmt, str::FromStr};

use crate::entity::StatusFlags;

/// The six workflow transitions, as rendered to UI layers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CreateDraft,
    DiscardDraft,
    Publish,
    RequestDeletion,
    DiscardRequestedDeletion,
    PublishDeletion,
}

impl Action {
    const fn as_str(self) -> &'static str {
        match self {
            Self::CreateDraft => "create_draft",
            Self::DiscardDraft => "discard_draft",
            Self::Publish => "publish",
            Self::RequestDeletion => "request_deletion",
            Self::DiscardRequestedDeletion => "discard_requested_deletion",
            Self::PublishDeletion => "publish_deletion",
        }
    }

    /// Button label for UI layers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CreateDraft => "Create and edit draft",
            Self::DiscardDraft => "Discard draft",
            Self::Publish => "Publish",
            Self::RequestDeletion => "Request deletion",
            Self::DiscardRequestedDeletion => "Discard requested deletion",
            Self::PublishDeletion => "Publish deletion",
        }
    }

    /// Publishing-class actions make content (or its removal) authoritative
    /// and are gated through the [`Authorizer`].
    #[must_use]
    pub const fn requires_publish_permission(self) -> bool {
        matches!(self, Self::Publish | Self::PublishDeletion)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an action name from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseActionError {
    pub got: String,
}

impl fmt::Display for ParseActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid action: '{}'", self.got)
    }
}

impl std::error::Error for ParseActionError {}

impl FromStr for Action {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create_draft" => Ok(Self::CreateDraft),
            "discard_draft" => Ok(Self::DiscardDraft),
            "publish" => Ok(Self::Publish),
            "request_deletion" => Ok(Self::RequestDeletion),
            "discard_requested_deletion" => Ok(Self::DiscardRequestedDeletion),
            "publish_deletion" => Ok(Self::PublishDeletion),
            _ => Err(ParseActionError { got: s.to_string() }),
        }
    }
}

/// The identity invoking or viewing the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub name: String,
    /// Elevated actors pass the default publish gate.
    pub elevated: bool,
}

impl Actor {
    #[must_use]
    pub fn new(name: impl Into<String>, elevated: bool) -> Self {
        Self {
            name: name.into(),
            elevated,
        }
    }
}

/// Pluggable authorization predicate for publishing-class actions.
pub trait Authorizer {
    fn can_publish(&self, actor: &Actor) -> bool;
}

/// Default gate: publishing-class actions require an elevated actor.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequireElevated;

impl Authorizer for RequireElevated {
    fn can_publish(&self, actor: &Actor) -> bool {
        actor.elevated
    }
}

/// Per-action metadata handed to UI layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionInfo {
    /// Whether the viewing actor may invoke the action.
    pub authorized: bool,
    /// Button label for rendering.
    pub label: &'static str,
}

/// Compute the actions available for an entity in the given state.
///
/// Rule table:
/// - a pending deletion request offers its confirm/cancel pair
/// - a draft with pending changes offers `publish`
/// - a draft of an existing live record additionally offers
///   `discard_draft` (an orphan draft is removed through ordinary
///   deletion, not this workflow)
/// - a live record without pending changes offers `create_draft`
/// - a live record without a deletion request offers `request_deletion`
#[must_use]
pub fn available_actions(
    flags: StatusFlags,
    actor: &Actor,
    authorizer: &dyn Authorizer,
) -> BTreeMap<Action, ActionInfo> {
    let mut actions = BTreeMap::new();
    let mut offer = |action: Action| {
        let authorized =
            !action.requires_publish_permission() || authorizer.can_publish(actor);
        actions.insert(
            action,
            ActionInfo {
                authorized,
                label: action.label(),
            },
        );
    };

    if flags.deletion_requested {
        offer(Action::DiscardRequestedDeletion);
        offer(Action::PublishDeletion);
    }
    if flags.is_draft() && flags.has_pending_changes {
        offer(Action::Publish);
    }
    if flags.is_draft() && flags.has_pending_changes && flags.is_published {
        offer(Action::DiscardDraft);
    }
    if flags.is_live && !flags.has_pending_changes {
        offer(Action::CreateDraft);
    }
    if flags.is_live && !flags.deletion_requested {
        offer(Action::RequestDeletion);
    }
    actions
}
