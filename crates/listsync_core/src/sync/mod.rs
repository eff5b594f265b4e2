//! List sync state machine.
//!
//! # Responsibility
//! - Decide which sync status changes are legal (`transition`).
//! - Orchestrate configure/disable/status/conflict use-cases (`service`).
//!
//! # Invariants
//! - Lists only change sync state through `SyncService`.
//! - `conflict` is left only through `pending`.

pub mod error;
pub mod service;
pub mod transition;
