//! Core sync state machine for mirrored lists.
//! This crate is the single source of truth for sync and conflict invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod sync;

pub use logging::{default_log_level, init_logging, logging_status, LogSettings, LoggingError};
pub use model::conflict::{
    ConflictId, ConflictValidationError, ItemId, SyncConflict, CONFLICT_TYPE_ITEM_UPDATE,
};
pub use model::list::{
    List, ListId, ListKind, ListValidationError, SyncConfig, SyncConfigError, SyncSource,
    SyncStatus,
};
pub use repo::sync_repo::{RepoError, RepoResult, SqliteSyncRepository, SyncRepository};
pub use sync::error::{SyncError, SyncResult};
pub use sync::service::{
    SyncService, ACTION_CONFIGURE_SYNC, ACTION_CONFLICT_DETECTED, ACTION_DISABLE_SYNC,
    ACTION_RESOLVE_CONFLICT,
};
pub use sync::transition::{
    allowed_targets, is_transition_allowed, validate_transition, TransitionError,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
