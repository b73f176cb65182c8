//! # Moderation
//!
//! Approval-state rules applied to an outgoing update payload.
//!
//! States are `Pending`, `Published` and `Rejected`. Admins may move an entry
//! between any two states. The one automatic transition is
//! `Rejected -> Pending`: when a non-admin edits the content of a rejected
//! entry it goes back into the review queue and loses its rejection reason.

use crate::models::{ApprovalStatus, Entry, EntryPatch};

/// What the requesting user is allowed to do with an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorRights {
    pub is_owner: bool,
    pub is_admin: bool,
}

/// Override forced onto the payload by the auto-reversion rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusOverride {
    pub approval_status: ApprovalStatus,
    pub rejection_reason: Option<String>,
}

/// How the approval status moved as a result of an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransition {
    Unchanged,
    /// The caller set a new status.
    Explicit,
    /// A rejected entry was resubmitted for review by a content edit.
    Resubmitted,
}

impl StatusTransition {
    pub fn changed(&self) -> bool {
        !matches!(self, StatusTransition::Unchanged)
    }
}

/// Pure auto-reversion rule.
pub fn auto_revert(
    content_changed: bool,
    editor_is_admin: bool,
    current: ApprovalStatus,
) -> Option<StatusOverride> {
    if content_changed && !editor_is_admin && current == ApprovalStatus::Rejected {
        Some(StatusOverride {
            approval_status: ApprovalStatus::Pending,
            rejection_reason: None,
        })
    } else {
        None
    }
}

/// Drops an explicit status unless the caller owns the entry or is an admin.
pub fn permitted_status(
    requested: Option<ApprovalStatus>,
    rights: EditorRights,
) -> Option<ApprovalStatus> {
    requested.filter(|_| rights.is_owner || rights.is_admin)
}

/// Rewrites the moderation fields of `patch` in place.
pub fn apply(patch: &mut EntryPatch, current: &Entry, rights: EditorRights) -> StatusTransition {
    let content_changed = patch.changes_content(current);

    patch.approval_status = permitted_status(patch.approval_status, rights);
    if !rights.is_admin && patch.rejection_reason.take().is_some() {
        tracing::debug!(entry_id = %current.id, "dropping rejection reason set by non-admin");
    }

    if let Some(forced) = auto_revert(content_changed, rights.is_admin, current.approval_status) {
        patch.approval_status = Some(forced.approval_status);
        patch.rejection_reason = Some(forced.rejection_reason);
        return StatusTransition::Resubmitted;
    }

    match patch.approval_status {
        Some(status) => {
            // A reason is stale once the entry leaves the rejected state.
            if status != ApprovalStatus::Rejected && patch.rejection_reason.is_none() {
                patch.rejection_reason = Some(None);
            }
            if status != current.approval_status {
                StatusTransition::Explicit
            } else {
                StatusTransition::Unchanged
            }
        }
        None => StatusTransition::Unchanged,
    }
}
