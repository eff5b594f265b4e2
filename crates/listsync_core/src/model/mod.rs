//! Domain model for mirrored lists and their sync conflicts.
//!
//! # Responsibility
//! - Define canonical data structures used by the sync state machine.
//! - Own entity-level invariants checked before every persistence write.
//!
//! # Invariants
//! - Every list and conflict is identified by a stable UUID.
//! - `SyncStatus::None` <=> `SyncSource::None` <=> empty `sync_id`.
//! - A resolved conflict never becomes unresolved again.

pub mod conflict;
pub mod list;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as Unix epoch milliseconds.
///
/// Clocks set before the epoch collapse to `0` instead of failing.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
