//! Sync persistence port and SQLite implementation.
//!
//! # Responsibility
//! - Own list and conflict rows on behalf of the sync services.
//! - Serialize concurrent writers through optimistic version checks.
//!
//! # Invariants
//! - Write paths validate entities before SQL mutations.
//! - `update_list` only succeeds when the stored `version` equals the one
//!   the caller read; it bumps the version by one.
//! - `resolve_conflict` only succeeds while `resolved_at IS NULL`.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::conflict::{ConflictId, ConflictValidationError, SyncConflict};
use crate::model::list::{List, ListId, ListKind, ListValidationError, SyncSource, SyncStatus};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const LIST_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    kind,
    sync_status,
    sync_source,
    sync_id,
    last_sync_at,
    version
FROM lists";

const CONFLICT_SELECT_SQL: &str = "SELECT
    uuid,
    list_uuid,
    item_uuid,
    conflict_type,
    local_data,
    remote_data,
    resolution,
    created_at,
    resolved_at
FROM sync_conflicts";

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors reported by the sync persistence port.
///
/// `External*` variants are never produced by the SQLite adapter; they exist
/// for ports that write through to a remote source.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    ListValidation(ListValidationError),
    ConflictValidation(ConflictValidationError),
    ListNotFound(ListId),
    ConflictNotFound(ConflictId),
    /// The stored row moved since it was read.
    ConcurrentModification {
        entity: &'static str,
        id: Uuid,
    },
    ExternalSourceUnavailable(String),
    ExternalSourceTimeout(String),
    ExternalSource(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::ListValidation(err) => write!(f, "{err}"),
            Self::ConflictValidation(err) => write!(f, "{err}"),
            Self::ListNotFound(id) => write!(f, "list not found: {id}"),
            Self::ConflictNotFound(id) => write!(f, "sync conflict not found: {id}"),
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
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "sync repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted sync data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::ListValidation(err) => Some(err),
            Self::ConflictValidation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ListValidationError> for RepoError {
    fn from(value: ListValidationError) -> Self {
        Self::ListValidation(value)
    }
}

impl From<ConflictValidationError> for RepoError {
    fn from(value: ConflictValidationError) -> Self {
        Self::ConflictValidation(value)
    }
}

/// Persistence port consumed by the sync services.
pub trait SyncRepository {
    /// Inserts a new list row.
    fn create_list(&self, list: &List) -> RepoResult<ListId>;
    fn get_list(&self, id: ListId) -> RepoResult<Option<List>>;
    /// Version-checked write of the whole list row; returns the new version.
    fn update_list(&self, list: &List) -> RepoResult<i64>;
    fn create_conflict(&self, conflict: &SyncConflict) -> RepoResult<ConflictId>;
    fn get_conflict_by_id(&self, id: ConflictId) -> RepoResult<Option<SyncConflict>>;
    /// Conflicts of one list, oldest first.
    fn list_conflicts_for_list(
        &self,
        list_id: ListId,
        include_resolved: bool,
    ) -> RepoResult<Vec<SyncConflict>>;
    /// Stamps an unresolved conflict as resolved.
    fn resolve_conflict(&self, id: ConflictId, resolution: &str, resolved_at: i64)
        -> RepoResult<()>;
}

/// SQLite-backed sync repository.
pub struct SqliteSyncRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSyncRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let actual_version = current_user_version(conn)?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    fn list_exists(&self, id: ListId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM lists WHERE uuid = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn conflict_exists(&self, id: ConflictId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sync_conflicts WHERE uuid = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

impl SyncRepository for SqliteSyncRepository<'_> {
    fn create_list(&self, list: &List) -> RepoResult<ListId> {
        list.validate()?;

        self.conn.execute(
            "INSERT INTO lists (
                uuid,
                name,
                kind,
                sync_status,
                sync_source,
                sync_id,
                last_sync_at,
                version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                list.id.to_string(),
                list.name.as_str(),
                list.kind.as_str(),
                list.sync_status.as_str(),
                list.sync_source.as_str(),
                list.sync_id.as_str(),
                list.last_sync_at,
                list.version,
            ],
        )?;

        Ok(list.id)
    }

    fn get_list(&self, id: ListId) -> RepoResult<Option<List>> {
        let row = self
            .conn
            .query_row(
                &format!("{LIST_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                |row| Ok(parse_list_row(row)),
            )
            .optional()?;

        row.transpose()
    }

    fn update_list(&self, list: &List) -> RepoResult<i64> {
        list.validate()?;

        let changed = self.conn.execute(
            "UPDATE lists
             SET
                name = ?1,
                kind = ?2,
                sync_status = ?3,
                sync_source = ?4,
                sync_id = ?5,
                last_sync_at = ?6,
                version = version + 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?7
               AND version = ?8;",
            params![
                list.name.as_str(),
                list.kind.as_str(),
                list.sync_status.as_str(),
                list.sync_source.as_str(),
                list.sync_id.as_str(),
                list.last_sync_at,
                list.id.to_string(),
                list.version,
            ],
        )?;

        if changed == 0 {
            if self.list_exists(list.id)? {
                return Err(RepoError::ConcurrentModification {
                    entity: "list",
                    id: list.id,
                });
            }
            return Err(RepoError::ListNotFound(list.id));
        }

        Ok(list.version + 1)
    }

    fn create_conflict(&self, conflict: &SyncConflict) -> RepoResult<ConflictId> {
        conflict.validate()?;
        if !self.list_exists(conflict.list_id)? {
            return Err(RepoError::ListNotFound(conflict.list_id));
        }

        self.conn.execute(
            "INSERT INTO sync_conflicts (
                uuid,
                list_uuid,
                item_uuid,
                conflict_type,
                local_data,
                remote_data,
                resolution,
                created_at,
                resolved_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                conflict.id.to_string(),
                conflict.list_id.to_string(),
                conflict.item_id.map(|id| id.to_string()),
                conflict.conflict_type.as_str(),
                encode_payload(&conflict.local_data)?,
                encode_payload(&conflict.remote_data)?,
                conflict.resolution.as_deref(),
                conflict.created_at,
                conflict.resolved_at,
            ],
        )?;

        Ok(conflict.id)
    }

    fn get_conflict_by_id(&self, id: ConflictId) -> RepoResult<Option<SyncConflict>> {
        let row = self
            .conn
            .query_row(
                &format!("{CONFLICT_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                |row| Ok(parse_conflict_row(row)),
            )
            .optional()?;

        row.transpose()
    }

    fn list_conflicts_for_list(
        &self,
        list_id: ListId,
        include_resolved: bool,
    ) -> RepoResult<Vec<SyncConflict>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CONFLICT_SELECT_SQL}
             WHERE list_uuid = ?1
               AND (?2 = 1 OR resolved_at IS NULL)
             ORDER BY created_at ASC, uuid ASC;"
        ))?;

        let mut rows = stmt.query(params![list_id.to_string(), i64::from(include_resolved)])?;
        let mut conflicts = Vec::new();
        while let Some(row) = rows.next()? {
            conflicts.push(parse_conflict_row(row)?);
        }

        Ok(conflicts)
    }

    fn resolve_conflict(
        &self,
        id: ConflictId,
        resolution: &str,
        resolved_at: i64,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE sync_conflicts
             SET
                resolution = ?2,
                resolved_at = ?3
             WHERE uuid = ?1
               AND resolved_at IS NULL;",
            params![id.to_string(), resolution, resolved_at],
        )?;

        if changed == 0 {
            if self.conflict_exists(id)? {
                return Err(RepoError::ConcurrentModification {
                    entity: "sync_conflict",
                    id,
                });
            }
            return Err(RepoError::ConflictNotFound(id));
        }

        Ok(())
    }
}

fn parse_list_row(row: &Row<'_>) -> RepoResult<List> {
    let id = parse_uuid(row.get("uuid")?, "lists.uuid")?;

    let kind_text: String = row.get("kind")?;
    let kind = ListKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid list kind `{kind_text}` in lists.kind"))
    })?;

    let status_text: String = row.get("sync_status")?;
    let sync_status = SyncStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid sync status `{status_text}` in lists.sync_status"
        ))
    })?;

    let source_text: String = row.get("sync_source")?;
    let sync_source = SyncSource::parse(&source_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid sync source `{source_text}` in lists.sync_source"
        ))
    })?;

    let list = List {
        id,
        name: row.get("name")?,
        kind,
        sync_status,
        sync_source,
        sync_id: row.get("sync_id")?,
        last_sync_at: row.get("last_sync_at")?,
        version: row.get("version")?,
    };
    list.validate()
        .map_err(|err| RepoError::InvalidData(format!("list {id}: {err}")))?;
    Ok(list)
}

fn parse_conflict_row(row: &Row<'_>) -> RepoResult<SyncConflict> {
    let id = parse_uuid(row.get("uuid")?, "sync_conflicts.uuid")?;
    let list_id = parse_uuid(row.get("list_uuid")?, "sync_conflicts.list_uuid")?;
    let item_id = match row.get::<_, Option<String>>("item_uuid")? {
        Some(value) => Some(parse_uuid(value, "sync_conflicts.item_uuid")?),
        None => None,
    };

    let conflict = SyncConflict {
        id,
        list_id,
        item_id,
        conflict_type: row.get("conflict_type")?,
        local_data: decode_payload(row.get("local_data")?, "sync_conflicts.local_data")?,
        remote_data: decode_payload(row.get("remote_data")?, "sync_conflicts.remote_data")?,
        resolution: row.get("resolution")?,
        created_at: row.get("created_at")?,
        resolved_at: row.get("resolved_at")?,
    };
    conflict
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("sync conflict {id}: {err}")))?;
    Ok(conflict)
}

fn parse_uuid(value: String, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(&value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn encode_payload(value: &serde_json::Value) -> RepoResult<String> {
    serde_json::to_string(value)
        .map_err(|err| RepoError::InvalidData(format!("unencodable conflict payload: {err}")))
}

fn decode_payload(text: String, column: &str) -> RepoResult<serde_json::Value> {
    serde_json::from_str(&text)
        .map_err(|err| RepoError::InvalidData(format!("invalid json in {column}: {err}")))
}
