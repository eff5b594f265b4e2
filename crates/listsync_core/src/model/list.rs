//! List domain model and its external sync bundle.
//!
//! # Responsibility
//! - Define the list record owned by the persistence port.
//! - Provide the only mutation helpers the sync services use on it.
//!
//! # Invariants
//! - `sync_status == None` <=> `sync_source == None` <=> `sync_id` is empty.
//! - `last_sync_at` is only set while sync is enabled.
//! - `version` is the optimistic-concurrency token and never goes negative.
//! - `SyncConfig` is derived from the top-level fields, never stored apart.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a list.
pub type ListId = Uuid;

/// What a list collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Places,
    Media,
    Activities,
}

impl ListKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Places => "places",
            Self::Media => "media",
            Self::Activities => "activities",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "places" => Some(Self::Places),
            "media" => Some(Self::Media),
            "activities" => Some(Self::Activities),
            _ => None,
        }
    }
}

/// Mirroring state of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Not mirrored to any external source.
    None,
    /// Mirroring configured; waiting for the next sync attempt.
    Pending,
    /// Local and remote data agree as of `last_sync_at`.
    Synced,
    /// At least one divergence awaits resolution.
    Conflict,
}

impl SyncStatus {
    /// Every status, in declaration order.
    pub const ALL: [SyncStatus; 4] = [Self::None, Self::Pending, Self::Synced, Self::Conflict];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Conflict => "conflict",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "pending" => Some(Self::Pending),
            "synced" => Some(Self::Synced),
            "conflict" => Some(Self::Conflict),
            _ => None,
        }
    }
}

impl Display for SyncStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External system a list can be mirrored against.
///
/// Every recognized source keys its records by an external identifier, so
/// enabling sync always requires a non-empty `sync_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncSource {
    None,
    GoogleMaps,
    AppleMaps,
    Foursquare,
    Spotify,
}

impl SyncSource {
    /// Sources accepted by `configure_sync`.
    pub const RECOGNIZED: [SyncSource; 4] = [
        Self::GoogleMaps,
        Self::AppleMaps,
        Self::Foursquare,
        Self::Spotify,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::GoogleMaps => "google_maps",
            Self::AppleMaps => "apple_maps",
            Self::Foursquare => "foursquare",
            Self::Spotify => "spotify",
        }
    }

    /// Parses a stored or caller-supplied source id. Surrounding whitespace
    /// is ignored; matching is otherwise exact.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "none" => Some(Self::None),
            "google_maps" => Some(Self::GoogleMaps),
            "apple_maps" => Some(Self::AppleMaps),
            "foursquare" => Some(Self::Foursquare),
            "spotify" => Some(Self::Spotify),
            _ => None,
        }
    }

    pub fn is_none(self) -> bool {
        self == Self::None
    }
}

impl Display for SyncSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a list's sync bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub source: SyncSource,
    pub sync_id: String,
    pub status: SyncStatus,
    pub last_sync_at: Option<i64>,
}

/// Rejections raised while building a sync configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncConfigError {
    /// Source is blank, `none`, or not a recognized external system.
    InvalidSource(String),
    /// Source requires an external record key but none was given.
    MissingSyncId(SyncSource),
}

impl Display for SyncConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSource(value) => write!(f, "unrecognized sync source `{value}`"),
            Self::MissingSyncId(source) => {
                write!(f, "sync source `{source}` requires a non-empty sync id")
            }
        }
    }
}

impl Error for SyncConfigError {}

impl SyncConfig {
    /// Builds a validated configuration from caller input.
    ///
    /// `sync_id` is trimmed before it is stored.
    pub fn new(source: &str, sync_id: &str, status: SyncStatus) -> Result<Self, SyncConfigError> {
        let parsed = SyncSource::parse(source)
            .ok_or_else(|| SyncConfigError::InvalidSource(source.trim().to_string()))?;
        let config = Self {
            source: parsed,
            sync_id: sync_id.trim().to_string(),
            status,
            last_sync_at: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SyncConfigError> {
        if self.source.is_none() {
            return Err(SyncConfigError::InvalidSource(self.source.to_string()));
        }
        if self.sync_id.trim().is_empty() {
            return Err(SyncConfigError::MissingSyncId(self.source));
        }
        Ok(())
    }
}

/// Entity-level invariant violations on a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListValidationError {
    /// Status is `none` while a source is still attached.
    DisabledWithSource(SyncSource),
    /// Status is mirrored but no source is attached.
    EnabledWithoutSource(SyncStatus),
    /// No source is attached but an external key is still set.
    UnexpectedSyncId,
    /// A source is attached without an external key.
    MissingSyncId(SyncSource),
    /// `last_sync_at` is set on an unmirrored list.
    LastSyncWhileDisabled,
    NegativeVersion(i64),
}

impl Display for ListValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DisabledWithSource(source) => {
                write!(f, "sync status is none but source is `{source}`")
            }
            Self::EnabledWithoutSource(status) => {
                write!(f, "sync status is `{status}` but no source is attached")
            }
            Self::UnexpectedSyncId => write!(f, "sync id must be empty when sync is disabled"),
            Self::MissingSyncId(source) => {
                write!(f, "sync source `{source}` requires a non-empty sync id")
            }
            Self::LastSyncWhileDisabled => {
                write!(f, "last_sync_at must be empty when sync is disabled")
            }
            Self::NegativeVersion(version) => write!(f, "list version must be >= 0, got {version}"),
        }
    }
}

impl Error for ListValidationError {}

/// List record as seen by the sync core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    pub id: ListId,
    pub name: String,
    pub kind: ListKind,
    pub sync_status: SyncStatus,
    pub sync_source: SyncSource,
    /// External record key. Empty when sync is disabled.
    pub sync_id: String,
    /// Unix epoch milliseconds of the last successful sync.
    pub last_sync_at: Option<i64>,
    /// Optimistic-concurrency token owned by the persistence port.
    pub version: i64,
}

impl List {
    /// Creates an unmirrored list with a generated stable ID.
    pub fn new(kind: ListKind, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            sync_status: SyncStatus::None,
            sync_source: SyncSource::None,
            sync_id: String::new(),
            last_sync_at: None,
            version: 0,
        }
    }

    pub fn is_sync_enabled(&self) -> bool {
        !self.sync_source.is_none()
    }

    /// Derived sync bundle; `None` while sync is disabled.
    pub fn sync_config(&self) -> Option<SyncConfig> {
        if !self.is_sync_enabled() {
            return None;
        }
        Some(SyncConfig {
            source: self.sync_source,
            sync_id: self.sync_id.clone(),
            status: self.sync_status,
            last_sync_at: self.last_sync_at,
        })
    }

    /// Attaches a sync bundle, resetting `last_sync_at`.
    pub fn enable_sync(&mut self, config: &SyncConfig) {
        self.sync_status = config.status;
        self.sync_source = config.source;
        self.sync_id = config.sync_id.clone();
        self.last_sync_at = None;
    }

    /// Drops the sync bundle back to its disabled values.
    pub fn clear_sync(&mut self) {
        self.sync_status = SyncStatus::None;
        self.sync_source = SyncSource::None;
        self.sync_id.clear();
        self.last_sync_at = None;
    }

    /// Moves the list to `status`.
    ///
    /// `Synced` stamps `last_sync_at` with `now_ms`; `None` clears the whole
    /// bundle so the disabled invariant keeps holding.
    pub fn apply_sync_status(&mut self, status: SyncStatus, now_ms: i64) {
        if status == SyncStatus::None {
            self.clear_sync();
            return;
        }
        self.sync_status = status;
        if status == SyncStatus::Synced {
            self.last_sync_at = Some(now_ms);
        }
    }

    pub fn validate(&self) -> Result<(), ListValidationError> {
        if self.version < 0 {
            return Err(ListValidationError::NegativeVersion(self.version));
        }

        let sync_id_blank = self.sync_id.trim().is_empty();
        match (self.sync_status, self.sync_source) {
            (SyncStatus::None, SyncSource::None) => {
                if !self.sync_id.is_empty() {
                    return Err(ListValidationError::UnexpectedSyncId);
                }
                if self.last_sync_at.is_some() {
                    return Err(ListValidationError::LastSyncWhileDisabled);
                }
            }
            (SyncStatus::None, source) => {
                return Err(ListValidationError::DisabledWithSource(source));
            }
            (status, SyncSource::None) => {
                return Err(ListValidationError::EnabledWithoutSource(status));
            }
            (_, source) => {
                if sync_id_blank {
                    return Err(ListValidationError::MissingSyncId(source));
                }
            }
        }

        Ok(())
    }
}
