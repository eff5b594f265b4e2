//! Typed errors returned by sync service operations.

use crate::model::conflict::{ConflictId, ConflictValidationError};
use crate::model::list::{ListId, ListValidationError, SyncConfigError, SyncSource, SyncStatus};
use crate::repo::sync_repo::RepoError;
use crate::sync::transition::TransitionError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type SyncResult<T> = Result<T, SyncError>;

/// Errors from configure/disable/update-status/conflict operations.
#[derive(Debug)]
pub enum SyncError {
    /// Target list does not exist.
    NotFound(ListId),
    /// List is not mirrored to any source.
    SyncDisabled(ListId),
    /// List is already mirrored; disable it before reconfiguring.
    SyncAlreadyEnabled {
        list_id: ListId,
        status: SyncStatus,
    },
    /// Source name is blank, `none` or not a recognized external source.
    InvalidSyncSource(String),
    /// Recognized source given without an external record id.
    MissingSyncId(SyncSource),
    /// Entity about to be persisted failed validation.
    InvalidSyncConfig(String),
    InvalidSyncTransition(TransitionError),
    ConflictNotFound(ConflictId),
    ConflictAlreadyResolved(ConflictId),
    /// Resolution label is blank.
    InvalidResolution,
    /// Stored row moved underneath both write attempts.
    ConcurrentModification {
        entity: &'static str,
        id: Uuid,
    },
    ExternalSourceUnavailable(String),
    ExternalSourceTimeout(String),
    ExternalSource(String),
    /// Storage-level failure below the persistence port.
    Repo(RepoError),
}

impl SyncError {
    /// Stable snake_case code for logs and callers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::SyncDisabled(_) => "sync_disabled",
            Self::SyncAlreadyEnabled { .. } => "sync_already_enabled",
            Self::InvalidSyncSource(_) => "invalid_sync_source",
            Self::MissingSyncId(_) => "missing_sync_id",
            Self::InvalidSyncConfig(_) => "invalid_sync_config",
            Self::InvalidSyncTransition(_) => "invalid_sync_transition",
            Self::ConflictNotFound(_) => "conflict_not_found",
            Self::ConflictAlreadyResolved(_) => "conflict_already_resolved",
            Self::InvalidResolution => "invalid_resolution",
            Self::ConcurrentModification { .. } => "concurrent_modification",
            Self::ExternalSourceUnavailable(_) => "external_source_unavailable",
            Self::ExternalSourceTimeout(_) => "external_source_timeout",
            Self::ExternalSource(_) => "external_source_error",
            Self::Repo(_) => "storage_error",
        }
    }

    /// Whether both write attempts lost a race against another writer.
    pub fn is_concurrent_modification(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "list not found: {id}"),
            Self::SyncDisabled(id) => write!(f, "sync is disabled for list {id}"),
            Self::SyncAlreadyEnabled { list_id, status } => write!(
                f,
                "sync is already enabled for list {list_id} (status `{status}`)"
            ),
            Self::InvalidSyncSource(value) => write!(f, "invalid sync source `{value}`"),
            Self::MissingSyncId(source) => {
                write!(f, "sync source `{source}` requires a sync id")
            }
            Self::InvalidSyncConfig(message) => write!(f, "invalid sync config: {message}"),
            Self::InvalidSyncTransition(err) => write!(f, "{err}"),
            Self::ConflictNotFound(id) => write!(f, "sync conflict not found: {id}"),
            Self::ConflictAlreadyResolved(id) => {
                write!(f, "sync conflict already resolved: {id}")
            }
            Self::InvalidResolution => write!(f, "conflict resolution must not be blank"),
            Self::ConcurrentModification { entity, id } => {
                write!(f, "{entity} {id} was modified concurrently")
            }
            Self::ExternalSourceUnavailable(message) => {
                write!(f, "external source unavailable: {message}")
            }
            Self::ExternalSourceTimeout(message) => {
                write!(f, "external source timed out: {message}")
            }
            Self::ExternalSource(message) => write!(f, "external source error: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidSyncTransition(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransitionError> for SyncError {
    fn from(value: TransitionError) -> Self {
        Self::InvalidSyncTransition(value)
    }
}

impl From<SyncConfigError> for SyncError {
    fn from(value: SyncConfigError) -> Self {
        match value {
            SyncConfigError::InvalidSource(source) => Self::InvalidSyncSource(source),
            SyncConfigError::MissingSyncId(source) => Self::MissingSyncId(source),
        }
    }
}

impl From<ListValidationError> for SyncError {
    fn from(value: ListValidationError) -> Self {
        Self::InvalidSyncConfig(value.to_string())
    }
}

impl From<ConflictValidationError> for SyncError {
    fn from(value: ConflictValidationError) -> Self {
        Self::InvalidSyncConfig(value.to_string())
    }
}

impl From<RepoError> for SyncError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::ListNotFound(id) => Self::NotFound(id),
            RepoError::ConflictNotFound(id) => Self::ConflictNotFound(id),
            RepoError::ListValidation(err) => err.into(),
            RepoError::ConflictValidation(err) => err.into(),
            RepoError::ConcurrentModification { entity, id } => {
                Self::ConcurrentModification { entity, id }
            }
            RepoError::ExternalSourceUnavailable(message) => {
                Self::ExternalSourceUnavailable(message)
            }
            RepoError::ExternalSourceTimeout(message) => Self::ExternalSourceTimeout(message),
            RepoError::ExternalSource(message) => Self::ExternalSource(message),
            other => Self::Repo(other),
        }
    }
}
