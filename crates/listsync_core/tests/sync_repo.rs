mod common;

use common::{seed_list, setup};
use listsync_core::{
    List, ListKind, RepoError, SqliteSyncRepository, SyncConflict, SyncRepository, SyncSource,
    SyncStatus,
};
use serde_json::json;
use uuid::Uuid;

#[test]
fn create_and_get_list_roundtrip() {
    let conn = setup();
    let repo = SqliteSyncRepository::try_new(&conn).unwrap();

    let list = List::new(ListKind::Activities, "Hikes");
    let id = repo.create_list(&list).unwrap();

    let loaded = repo.get_list(id).unwrap().unwrap();
    assert_eq!(loaded, list);
    assert_eq!(loaded.version, 0);
    assert!(repo.get_list(Uuid::new_v4()).unwrap().is_none());
}

#[test]
fn update_bumps_version_and_rejects_stale_writes() {
    let conn = setup();
    let repo = SqliteSyncRepository::try_new(&conn).unwrap();
    let id = seed_list(&conn, SyncStatus::Pending);

    let mut first = repo.get_list(id).unwrap().unwrap();
    let stale = first.clone();

    first.apply_sync_status(SyncStatus::Synced, 5_000);
    let version = repo.update_list(&first).unwrap();
    assert_eq!(version, stale.version + 1);

    let err = repo.update_list(&stale).unwrap_err();
    assert!(matches!(
        err,
        RepoError::ConcurrentModification { entity: "list", id: raced } if raced == id
    ));

    let loaded = repo.get_list(id).unwrap().unwrap();
    assert_eq!(loaded.sync_status, SyncStatus::Synced);
    assert_eq!(loaded.last_sync_at, Some(5_000));
    assert_eq!(loaded.version, version);
}

#[test]
fn update_missing_list_returns_not_found() {
    let conn = setup();
    let repo = SqliteSyncRepository::try_new(&conn).unwrap();

    let list = List::new(ListKind::Media, "Ghost");
    let err = repo.update_list(&list).unwrap_err();
    assert!(matches!(err, RepoError::ListNotFound(id) if id == list.id));
}

#[test]
fn writes_reject_lists_violating_sync_invariant() {
    let conn = setup();
    let repo = SqliteSyncRepository::try_new(&conn).unwrap();

    let mut list = List::new(ListKind::Places, "Drifted");
    list.sync_status = SyncStatus::Synced;
    let err = repo.create_list(&list).unwrap_err();
    assert!(matches!(err, RepoError::ListValidation(_)));

    let id = seed_list(&conn, SyncStatus::Synced);
    let mut stored = repo.get_list(id).unwrap().unwrap();
    stored.sync_source = SyncSource::None;
    let err = repo.update_list(&stored).unwrap_err();
    assert!(matches!(err, RepoError::ListValidation(_)));
}

#[test]
fn read_rejects_invalid_persisted_list() {
    let conn = setup();
    let repo = SqliteSyncRepository::try_new(&conn).unwrap();
    let id = seed_list(&conn, SyncStatus::Synced);

    conn.execute(
        "UPDATE lists SET sync_source = 'none' WHERE uuid = ?1;",
        [id.to_string()],
    )
    .unwrap();

    let err = repo.get_list(id).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn conflicts_roundtrip_with_payloads_and_item_scope() {
    let conn = setup();
    let repo = SqliteSyncRepository::try_new(&conn).unwrap();
    let list_id = seed_list(&conn, SyncStatus::Synced);

    let item_id = Uuid::new_v4();
    let conflict = SyncConflict::new(
        list_id,
        "item_update",
        json!({"name": "Blue Bottle", "rating": 4}),
        json!({"name": "Blue Bottle Coffee", "rating": 5}),
    )
    .for_item(item_id);
    repo.create_conflict(&conflict).unwrap();

    let loaded = repo.get_conflict_by_id(conflict.id).unwrap().unwrap();
    assert_eq!(loaded, conflict);
    assert_eq!(loaded.item_id, Some(item_id));
    assert_eq!(loaded.remote_data["rating"], 5);
}

#[test]
fn create_conflict_requires_existing_list() {
    let conn = setup();
    let repo = SqliteSyncRepository::try_new(&conn).unwrap();

    let orphan = SyncConflict::new(Uuid::new_v4(), "item_update", json!("A"), json!("B"));
    let err = repo.create_conflict(&orphan).unwrap_err();
    assert!(matches!(err, RepoError::ListNotFound(id) if id == orphan.list_id));
}

#[test]
fn list_conflicts_filters_resolved_and_keeps_creation_order() {
    let conn = setup();
    let repo = SqliteSyncRepository::try_new(&conn).unwrap();
    let list_id = seed_list(&conn, SyncStatus::Conflict);
    let other_list = seed_list(&conn, SyncStatus::Conflict);

    let mut first = SyncConflict::new(list_id, "item_update", json!(1), json!(2));
    first.created_at = 100;
    let mut second = SyncConflict::new(list_id, "item_delete", json!(3), json!(4));
    second.created_at = 200;
    let foreign = SyncConflict::new(other_list, "item_update", json!(5), json!(6));
    repo.create_conflict(&second).unwrap();
    repo.create_conflict(&first).unwrap();
    repo.create_conflict(&foreign).unwrap();

    repo.resolve_conflict(first.id, "use_local", 300).unwrap();

    let all = repo.list_conflicts_for_list(list_id, true).unwrap();
    assert_eq!(
        all.iter().map(|c| c.id).collect::<Vec<_>>(),
        vec![first.id, second.id]
    );

    let open = repo.list_conflicts_for_list(list_id, false).unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id, second.id);
}

#[test]
fn resolve_conflict_is_compare_and_swap() {
    let conn = setup();
    let repo = SqliteSyncRepository::try_new(&conn).unwrap();
    let list_id = seed_list(&conn, SyncStatus::Conflict);

    let conflict = SyncConflict::new(list_id, "item_update", json!("A"), json!("B"));
    repo.create_conflict(&conflict).unwrap();

    repo.resolve_conflict(conflict.id, "use_remote", 42).unwrap();
    let err = repo
        .resolve_conflict(conflict.id, "use_local", 43)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::ConcurrentModification {
            entity: "sync_conflict",
            ..
        }
    ));

    let loaded = repo.get_conflict_by_id(conflict.id).unwrap().unwrap();
    assert_eq!(loaded.resolution.as_deref(), Some("use_remote"));
    assert_eq!(loaded.resolved_at, Some(42));

    let missing = repo
        .resolve_conflict(Uuid::new_v4(), "use_local", 1)
        .unwrap_err();
    assert!(matches!(missing, RepoError::ConflictNotFound(_)));
}
