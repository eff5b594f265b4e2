//! Shared fixtures for sync integration tests.
#![allow(dead_code)]

use listsync_core::db::open_db_in_memory;
use listsync_core::{
    ConflictId, List, ListId, ListKind, RepoError, RepoResult, SqliteSyncRepository,
    SyncConfig, SyncConflict, SyncRepository, SyncStatus,
};
use rusqlite::Connection;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

pub fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

/// Inserts a list already mirrored to `google_maps/place123` in `status`.
/// `SyncStatus::None` inserts an unmirrored list.
pub fn seed_list(conn: &Connection, status: SyncStatus) -> ListId {
    let repo = SqliteSyncRepository::try_new(conn).unwrap();
    let mut list = List::new(ListKind::Places, "Weekend spots");
    if status != SyncStatus::None {
        let config = SyncConfig::new("google_maps", "place123", SyncStatus::Pending).unwrap();
        list.enable_sync(&config);
        list.apply_sync_status(status, 1_000);
    }
    repo.create_list(&list).unwrap()
}

pub fn stored_list(conn: &Connection, id: ListId) -> List {
    let repo = SqliteSyncRepository::try_new(conn).unwrap();
    repo.get_list(id).unwrap().unwrap()
}

/// Write performed by another client right before ours.
pub type RacingWrite = Box<dyn Fn(&mut List)>;

pub enum UpdateFault {
    /// Another writer commits `mutate` first, so our stale version loses.
    Race(RacingWrite),
    /// Port fails without touching storage.
    Fail(RepoError),
}

pub enum ResolveFault {
    /// Another operator resolves the conflict first.
    Race(&'static str),
    Fail(RepoError),
}

/// SQLite repository with scripted failures injected ahead of writes.
pub struct ScriptedRepository<'conn> {
    inner: SqliteSyncRepository<'conn>,
    update_faults: RefCell<VecDeque<UpdateFault>>,
    resolve_faults: RefCell<VecDeque<ResolveFault>>,
    conflict_insert_fault: RefCell<Option<RepoError>>,
    update_calls: Cell<u32>,
    resolve_calls: Cell<u32>,
}

impl<'conn> ScriptedRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            inner: SqliteSyncRepository::try_new(conn).unwrap(),
            update_faults: RefCell::new(VecDeque::new()),
            resolve_faults: RefCell::new(VecDeque::new()),
            conflict_insert_fault: RefCell::new(None),
            update_calls: Cell::new(0),
            resolve_calls: Cell::new(0),
        }
    }

    pub fn push_update_fault(&self, fault: UpdateFault) {
        self.update_faults.borrow_mut().push_back(fault);
    }

    pub fn push_resolve_fault(&self, fault: ResolveFault) {
        self.resolve_faults.borrow_mut().push_back(fault);
    }

    pub fn fail_next_conflict_insert(&self, err: RepoError) {
        *self.conflict_insert_fault.borrow_mut() = Some(err);
    }

    pub fn update_calls(&self) -> u32 {
        self.update_calls.get()
    }

    pub fn resolve_calls(&self) -> u32 {
        self.resolve_calls.get()
    }
}

impl SyncRepository for ScriptedRepository<'_> {
    fn create_list(&self, list: &List) -> RepoResult<ListId> {
        self.inner.create_list(list)
    }

    fn get_list(&self, id: ListId) -> RepoResult<Option<List>> {
        self.inner.get_list(id)
    }

    fn update_list(&self, list: &List) -> RepoResult<i64> {
        self.update_calls.set(self.update_calls.get() + 1);
        let fault = self.update_faults.borrow_mut().pop_front();
        match fault {
            Some(UpdateFault::Race(mutate)) => {
                let mut stored = self.inner.get_list(list.id)?.expect("raced list must exist");
                mutate(&mut stored);
                self.inner.update_list(&stored)?;
                self.inner.update_list(list)
            }
            Some(UpdateFault::Fail(err)) => Err(err),
            None => self.inner.update_list(list),
        }
    }

    fn create_conflict(&self, conflict: &SyncConflict) -> RepoResult<ConflictId> {
        if let Some(err) = self.conflict_insert_fault.borrow_mut().take() {
            return Err(err);
        }
        self.inner.create_conflict(conflict)
    }

    fn get_conflict_by_id(&self, id: ConflictId) -> RepoResult<Option<SyncConflict>> {
        self.inner.get_conflict_by_id(id)
    }

    fn list_conflicts_for_list(
        &self,
        list_id: ListId,
        include_resolved: bool,
    ) -> RepoResult<Vec<SyncConflict>> {
        self.inner.list_conflicts_for_list(list_id, include_resolved)
    }

    fn resolve_conflict(
        &self,
        id: ConflictId,
        resolution: &str,
        resolved_at: i64,
    ) -> RepoResult<()> {
        self.resolve_calls.set(self.resolve_calls.get() + 1);
        let fault = self.resolve_faults.borrow_mut().pop_front();
        match fault {
            Some(ResolveFault::Race(other_resolution)) => {
                self.inner.resolve_conflict(id, other_resolution, resolved_at)?;
                self.inner.resolve_conflict(id, resolution, resolved_at)
            }
            Some(ResolveFault::Fail(err)) => Err(err),
            None => self.inner.resolve_conflict(id, resolution, resolved_at),
        }
    }
}
