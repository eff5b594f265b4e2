//! Sync status transition table.
//!
//! Conflicts always go back through `pending` before a list can reach
//! `synced` again. Moving to `none` is allowed from every status.

use crate::model::list::SyncStatus;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rejected `(from, to, action)` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: SyncStatus,
    pub to: SyncStatus,
    /// Caller-supplied label, kept only for diagnostics.
    pub action: String,
}

impl Display for TransitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid sync transition from `{}` to `{}` (action: {})",
            self.from, self.to, self.action
        )
    }
}

impl Error for TransitionError {}

/// Whether the table allows moving from `from` to `to`.
pub fn is_transition_allowed(from: SyncStatus, to: SyncStatus) -> bool {
    use SyncStatus::{Conflict, None, Pending, Synced};

    matches!(
        (from, to),
        (_, None)
            | (None, Pending)
            | (Pending, Synced)
            | (Pending, Conflict)
            | (Synced, Conflict)
            | (Synced, Pending)
            | (Conflict, Pending)
    )
}

/// Checks one requested transition. `action` never affects the outcome.
pub fn validate_transition(
    from: SyncStatus,
    to: SyncStatus,
    action: &str,
) -> Result<(), TransitionError> {
    if is_transition_allowed(from, to) {
        return Ok(());
    }
    Err(TransitionError {
        from,
        to,
        action: action.to_string(),
    })
}

/// Statuses reachable from `from`, in declaration order.
pub fn allowed_targets(from: SyncStatus) -> Vec<SyncStatus> {
    SyncStatus::ALL
        .into_iter()
        .filter(|to| is_transition_allowed(from, *to))
        .collect()
}
