//! Sync conflict domain model.
//!
//! # Responsibility
//! - Record one divergence between local and remote data for a list or item.
//! - Carry the resolution stamp once an operator settles it.
//!
//! # Invariants
//! - `list_id` is never nil; `conflict_type` is never blank.
//! - Both payloads are present (non-null JSON).
//! - `resolved_at` and `resolution` are set together and only once.

use crate::model::list::ListId;
use crate::model::now_epoch_ms;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a sync conflict.
pub type ConflictId = Uuid;

/// Identifier of a list item referenced by an item-level conflict.
pub type ItemId = Uuid;

/// Conflict type used when a remote edit diverges from a local item edit.
pub const CONFLICT_TYPE_ITEM_UPDATE: &str = "item_update";

/// Entity-level invariant violations on a conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictValidationError {
    MissingListId,
    BlankConflictType,
    MissingLocalData,
    MissingRemoteData,
    /// `resolved_at` and `resolution` disagree on whether the conflict is
    /// settled, or the stored resolution is blank.
    InconsistentResolution,
}

impl Display for ConflictValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingListId => write!(f, "conflict list id is required"),
            Self::BlankConflictType => write!(f, "conflict type must not be blank"),
            Self::MissingLocalData => write!(f, "conflict local data is required"),
            Self::MissingRemoteData => write!(f, "conflict remote data is required"),
            Self::InconsistentResolution => {
                write!(f, "conflict resolution and resolved_at must be set together")
            }
        }
    }
}

impl Error for ConflictValidationError {}

/// Recorded divergence awaiting (or past) operator resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConflict {
    pub id: ConflictId,
    pub list_id: ListId,
    /// `None` for list-level conflicts.
    pub item_id: Option<ItemId>,
    /// Serialized as `type` to match external schema naming.
    #[serde(rename = "type")]
    pub conflict_type: String,
    pub local_data: Value,
    pub remote_data: Value,
    /// Caller-defined label such as `use_local`; opaque to the core.
    pub resolution: Option<String>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds. `None` while unresolved.
    pub resolved_at: Option<i64>,
}

impl SyncConflict {
    /// Creates an unresolved list-level conflict stamped with the current time.
    pub fn new(
        list_id: ListId,
        conflict_type: impl Into<String>,
        local_data: Value,
        remote_data: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            list_id,
            item_id: None,
            conflict_type: conflict_type.into(),
            local_data,
            remote_data,
            resolution: None,
            created_at: now_epoch_ms(),
            resolved_at: None,
        }
    }

    /// Narrows the conflict to one list item.
    pub fn for_item(mut self, item_id: ItemId) -> Self {
        self.item_id = Some(item_id);
        self
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }

    pub fn validate(&self) -> Result<(), ConflictValidationError> {
        if self.list_id.is_nil() {
            return Err(ConflictValidationError::MissingListId);
        }
        if self.conflict_type.trim().is_empty() {
            return Err(ConflictValidationError::BlankConflictType);
        }
        if self.local_data.is_null() {
            return Err(ConflictValidationError::MissingLocalData);
        }
        if self.remote_data.is_null() {
            return Err(ConflictValidationError::MissingRemoteData);
        }
        match (&self.resolution, self.resolved_at) {
            (None, None) => {}
            (Some(resolution), Some(_)) if !resolution.trim().is_empty() => {}
            _ => return Err(ConflictValidationError::InconsistentResolution),
        }
        Ok(())
    }
}
