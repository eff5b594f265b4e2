//! Persistence port for the sync core and its SQLite implementation.
//!
//! # Responsibility
//! - Define the data access contract the sync services depend on.
//! - Isolate SQLite query details from state-machine orchestration.
//!
//! # Invariants
//! - Repository writes enforce entity `validate()` before persistence.
//! - Concurrency is serialized by version checks in storage, never by
//!   in-process locks.

pub mod sync_repo;
