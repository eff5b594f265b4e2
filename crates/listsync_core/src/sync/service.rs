//! Sync state machine use-case service.
//!
//! # Responsibility
//! - Enable and disable mirroring on a list.
//! - Drive sync status transitions through the transition table.
//! - Record conflicts and resolve them back to `pending`.
//!
//! # Invariants
//! - Every list write is read -> validate -> version-checked write.
//! - A `ConcurrentModification` on the first write triggers exactly one
//!   re-read/re-validate/re-write; any second failure is returned as is.
//! - Port failures other than concurrency are never retried here.
//! - No in-process locks; storage version checks serialize writers.

use crate::model::conflict::{ConflictId, SyncConflict};
use crate::model::list::{List, ListId, SyncConfig, SyncStatus};
use crate::model::now_epoch_ms;
use crate::repo::sync_repo::{RepoError, SyncRepository};
use crate::sync::error::{SyncError, SyncResult};
use crate::sync::transition::validate_transition;
use log::{error, info, warn};
use uuid::Uuid;

/// Action label used when a divergence forces a list into `conflict`.
pub const ACTION_CONFLICT_DETECTED: &str = "conflict_detected";
/// Action label used when a resolved conflict returns a list to `pending`.
pub const ACTION_RESOLVE_CONFLICT: &str = "resolve_conflict";
pub const ACTION_CONFIGURE_SYNC: &str = "configure_sync";
pub const ACTION_DISABLE_SYNC: &str = "disable_sync";

/// Initial attempt plus one retry after a concurrent modification.
const MAX_WRITE_ATTEMPTS: u32 = 2;

/// Sync configuration, status orchestration and conflict management.
pub struct SyncService<R: SyncRepository> {
    repo: R,
}

impl<R: SyncRepository> SyncService<R> {
    /// Creates a service on top of a persistence port.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Underlying persistence port.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Reads one list.
    pub fn get_list(&self, list_id: ListId) -> SyncResult<List> {
        self.repo
            .get_list(list_id)?
            .ok_or(SyncError::NotFound(list_id))
    }

    /// Starts mirroring an unmirrored list to `source`/`sync_id`.
    ///
    /// # Contract
    /// - Fails `SyncAlreadyEnabled` without writing when the list is mirrored.
    /// - Fails `InvalidSyncSource` / `MissingSyncId` on bad input.
    /// - Leaves the list `pending` with `last_sync_at` cleared.
    pub fn configure_sync(&self, list_id: ListId, source: &str, sync_id: &str) -> SyncResult<List> {
        let result = self.write_list("sync_configure", list_id, |list| {
            if list.sync_status != SyncStatus::None {
                return Err(SyncError::SyncAlreadyEnabled {
                    list_id,
                    status: list.sync_status,
                });
            }
            let config = SyncConfig::new(source, sync_id, SyncStatus::Pending)?;
            validate_transition(list.sync_status, config.status, ACTION_CONFIGURE_SYNC)?;
            list.enable_sync(&config);
            Ok(())
        });
        log_failure("sync_configure", list_id, &result);
        result
    }

    /// Stops mirroring a list from any mirrored status.
    pub fn disable_sync(&self, list_id: ListId) -> SyncResult<List> {
        let result = self.write_list("sync_disable", list_id, |list| {
            if list.sync_status == SyncStatus::None {
                return Err(SyncError::SyncDisabled(list_id));
            }
            validate_transition(list.sync_status, SyncStatus::None, ACTION_DISABLE_SYNC)?;
            list.clear_sync();
            Ok(())
        });
        log_failure("sync_disable", list_id, &result);
        result
    }

    /// Moves a mirrored list to `new_status`.
    ///
    /// `action` is recorded in errors and logs only. `Synced` stamps
    /// `last_sync_at`; `None` drops the sync bundle entirely.
    pub fn update_sync_status(
        &self,
        list_id: ListId,
        new_status: SyncStatus,
        action: &str,
    ) -> SyncResult<List> {
        let result = self.write_list("sync_update_status", list_id, |list| {
            // Table first: an unmirrored list asked for an unreachable status
            // reports the transition, not the missing source.
            validate_transition(list.sync_status, new_status, action)?;
            if !list.is_sync_enabled() {
                return Err(SyncError::SyncDisabled(list_id));
            }
            list.apply_sync_status(new_status, now_epoch_ms());
            Ok(())
        });
        log_failure("sync_update_status", list_id, &result);
        result
    }

    /// Records a divergence and forces the owning list into `conflict`.
    ///
    /// The list transition is written before the conflict row. If the row
    /// insert fails the list stays in `conflict` without a record; the error
    /// is returned and logged with `error_code=conflict_insert_failed`.
    pub fn create_conflict(&self, conflict: &SyncConflict) -> SyncResult<ConflictId> {
        let result = self.create_conflict_inner(conflict);
        log_failure("sync_conflict_create", conflict.id, &result);
        result
    }

    fn create_conflict_inner(&self, conflict: &SyncConflict) -> SyncResult<ConflictId> {
        conflict.validate()?;
        if conflict.is_resolved() {
            return Err(SyncError::InvalidSyncConfig(
                "new sync conflicts must be unresolved".to_string(),
            ));
        }

        self.update_sync_status(
            conflict.list_id,
            SyncStatus::Conflict,
            ACTION_CONFLICT_DETECTED,
        )?;

        if let Err(err) = self.repo.create_conflict(conflict) {
            error!(
                "event=sync_conflict_create module=sync status=error error_code=conflict_insert_failed list_id={} conflict_id={} list_status=conflict",
                conflict.list_id, conflict.id
            );
            return Err(err.into());
        }

        info!(
            "event=sync_conflict_create module=sync status=ok list_id={} conflict_id={} item_scoped={}",
            conflict.list_id,
            conflict.id,
            conflict.item_id.is_some()
        );
        Ok(conflict.id)
    }

    /// Resolves one conflict and returns its list to `pending`.
    ///
    /// # Contract
    /// - `ConflictNotFound` for unknown ids.
    /// - `ConflictAlreadyResolved` when `resolved_at` is already set.
    /// - `InvalidResolution` for a blank resolution; its content is opaque.
    /// - The owning list must be able to move to `pending`; otherwise the
    ///   call fails with `InvalidSyncTransition` / `SyncDisabled` and the
    ///   conflict stays unresolved.
    ///
    /// A list write racing in between the stamp and the list reset leaves
    /// the conflict resolved; that failure is returned and logged with
    /// `error_code=list_reset_failed`.
    pub fn resolve_conflict(
        &self,
        conflict_id: ConflictId,
        resolution: &str,
    ) -> SyncResult<SyncConflict> {
        let result = self.resolve_conflict_inner(conflict_id, resolution);
        log_failure("sync_conflict_resolve", conflict_id, &result);
        result
    }

    fn resolve_conflict_inner(
        &self,
        conflict_id: ConflictId,
        resolution: &str,
    ) -> SyncResult<SyncConflict> {
        let resolution = resolution.trim();
        let mut attempt = 1;

        let conflict = loop {
            let mut conflict = self
                .repo
                .get_conflict_by_id(conflict_id)?
                .ok_or(SyncError::ConflictNotFound(conflict_id))?;
            if conflict.is_resolved() {
                return Err(SyncError::ConflictAlreadyResolved(conflict_id));
            }
            if resolution.is_empty() {
                return Err(SyncError::InvalidResolution);
            }
            self.ensure_list_can_reset(conflict.list_id)?;

            let resolved_at = now_epoch_ms();
            match self
                .repo
                .resolve_conflict(conflict_id, resolution, resolved_at)
            {
                Ok(()) => {
                    conflict.resolution = Some(resolution.to_string());
                    conflict.resolved_at = Some(resolved_at);
                    break conflict;
                }
                Err(RepoError::ConcurrentModification { .. }) if attempt < MAX_WRITE_ATTEMPTS => {
                    warn!(
                        "event=sync_conflict_resolve module=sync status=retry conflict_id={} attempt={}",
                        conflict_id, attempt
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        };

        if let Err(err) =
            self.update_sync_status(conflict.list_id, SyncStatus::Pending, ACTION_RESOLVE_CONFLICT)
        {
            error!(
                "event=sync_conflict_resolve module=sync status=error error_code=list_reset_failed list_id={} conflict_id={} conflict_resolved=true",
                conflict.list_id, conflict_id
            );
            return Err(err);
        }

        info!(
            "event=sync_conflict_resolve module=sync status=ok list_id={} conflict_id={} attempts={}",
            conflict.list_id, conflict_id, attempt
        );
        Ok(conflict)
    }

    /// Rejects a resolve up front when the owning list could not return to
    /// `pending`, so nothing is stamped.
    fn ensure_list_can_reset(&self, list_id: ListId) -> SyncResult<()> {
        let list = self.get_list(list_id)?;
        validate_transition(list.sync_status, SyncStatus::Pending, ACTION_RESOLVE_CONFLICT)?;
        if !list.is_sync_enabled() {
            return Err(SyncError::SyncDisabled(list_id));
        }
        Ok(())
    }

    /// Every conflict recorded for a list, oldest first.
    pub fn get_conflicts(&self, list_id: ListId) -> SyncResult<Vec<SyncConflict>> {
        Ok(self.repo.list_conflicts_for_list(list_id, true)?)
    }

    /// Conflicts of a list still awaiting resolution, oldest first.
    pub fn get_unresolved_conflicts(&self, list_id: ListId) -> SyncResult<Vec<SyncConflict>> {
        Ok(self.repo.list_conflicts_for_list(list_id, false)?)
    }

    pub fn get_conflict(&self, conflict_id: ConflictId) -> SyncResult<SyncConflict> {
        self.repo
            .get_conflict_by_id(conflict_id)?
            .ok_or(SyncError::ConflictNotFound(conflict_id))
    }

    /// Read -> mutate -> version-checked write, retried once when the write
    /// loses a race. `mutate` re-checks its preconditions on every read, so
    /// the retry never overwrites a transition made by the racing writer.
    fn write_list<F>(&self, event: &'static str, list_id: ListId, mut mutate: F) -> SyncResult<List>
    where
        F: FnMut(&mut List) -> SyncResult<()>,
    {
        let mut attempt = 1;
        loop {
            let mut list = self
                .repo
                .get_list(list_id)?
                .ok_or(SyncError::NotFound(list_id))?;
            let from = list.sync_status;
            mutate(&mut list)?;

            match self.repo.update_list(&list) {
                Ok(version) => {
                    list.version = version;
                    info!(
                        "event={} module=sync status=ok list_id={} from={} to={} version={} attempts={}",
                        event, list_id, from, list.sync_status, version, attempt
                    );
                    return Ok(list);
                }
                Err(RepoError::ConcurrentModification { .. }) if attempt < MAX_WRITE_ATTEMPTS => {
                    warn!(
                        "event={} module=sync status=retry list_id={} attempt={}",
                        event, list_id, attempt
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn log_failure<T>(event: &str, id: Uuid, result: &SyncResult<T>) {
    let Err(err) = result else {
        return;
    };
    match err {
        SyncError::Repo(_)
        | SyncError::ConcurrentModification { .. }
        | SyncError::ExternalSourceUnavailable(_)
        | SyncError::ExternalSourceTimeout(_)
        | SyncError::ExternalSource(_) => error!(
            "event={} module=sync status=error id={} error_code={} error={}",
            event,
            id,
            err.code(),
            err
        ),
        _ => warn!(
            "event={} module=sync status=rejected id={} error_code={}",
            event,
            id,
            err.code()
        ),
    }
}
