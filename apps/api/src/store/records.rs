//! Record Store: one JSON file per entity instance under a base directory.
//!
//! Absence is a normal outcome (`Ok(None)`), never an error. Content that is
//! present but does not parse is reported as `StoreError::CorruptRecord`.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;

use super::{StoreError, StoreResult};

/// Auxiliary directories created alongside the entity directories.
/// Nothing reads or writes them yet.
pub const RESERVED_DIRS: &[&str] = &["patterns", "vectors", "temporal"];

/// A category of persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Users,
    Conversations,
    Favorites,
    Tickets,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Users,
        EntityKind::Conversations,
        EntityKind::Favorites,
        EntityKind::Tickets,
    ];

    pub fn dir_name(self) -> &'static str {
        match self {
            EntityKind::Users => "users",
            EntityKind::Conversations => "conversations",
            EntityKind::Favorites => "favorites",
            EntityKind::Tickets => "tickets",
        }
    }

    pub fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.dir_name() == name)
    }

    /// `user:<id>.json` for users, `<id>.json` for everything else.
    pub fn file_name(self, id: &str) -> String {
        match self {
            EntityKind::Users => format!("user:{id}.json"),
            _ => format!("{id}.json"),
        }
    }

    pub fn id_from_file_name(self, file_name: &str) -> Option<String> {
        let stem = file_name.strip_suffix(".json")?;
        let id = match self {
            EntityKind::Users => stem.strip_prefix("user:")?,
            _ => stem,
        };
        (!id.is_empty()).then(|| id.to_string())
    }

    /// Cache keys are namespaced by kind: `tickets:TKT-1A2B3C4D`.
    pub fn cache_key(self, id: &str) -> String {
        format!("{}:{id}", self.dir_name())
    }

    pub fn parse_cache_key(key: &str) -> Option<(EntityKind, &str)> {
        let (kind, id) = key.split_once(':')?;
        Some((Self::from_dir_name(kind)?, id))
    }
}

/// Filesystem-backed store of JSON records. Every filesystem call is bounded
/// by `deadline`.
#[derive(Debug, Clone)]
pub struct RecordStore {
    base: PathBuf,
    deadline: Duration,
}

impl RecordStore {
    /// Opens the store, eagerly creating every entity and reserved directory.
    pub async fn open(base: impl Into<PathBuf>, deadline: Duration) -> StoreResult<Self> {
        let store = Self {
            base: base.into(),
            deadline,
        };
        let dirs = EntityKind::ALL
            .iter()
            .map(|k| k.dir_name())
            .chain(RESERVED_DIRS.iter().copied());
        for dir in dirs {
            let path = store.base.join(dir);
            store.bounded(&path, fs::create_dir_all(&path)).await?;
        }
        Ok(store)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn kind_dir(&self, kind: EntityKind) -> PathBuf {
        self.base.join(kind.dir_name())
    }

    pub fn path_for(&self, kind: EntityKind, id: &str) -> PathBuf {
        self.kind_dir(kind).join(kind.file_name(id))
    }

    /// Last-writer-wins. The record is written to a sibling temp file and
    /// renamed into place, so readers never observe a half-written file.
    pub async fn write<T: Serialize>(&self, kind: EntityKind, id: &str, entity: &T) -> StoreResult<()> {
        self.write_json_at(&self.checked_path(kind, id)?, entity).await
    }

    pub async fn read<T: DeserializeOwned>(&self, kind: EntityKind, id: &str) -> StoreResult<Option<T>> {
        self.read_json_at(&self.checked_path(kind, id)?).await
    }

    /// Returns `true` if a file was removed.
    pub async fn remove(&self, kind: EntityKind, id: &str) -> StoreResult<bool> {
        let path = self.checked_path(kind, id)?;
        match self.bounded(&path, fs::remove_file(&path)).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Ids of every record of `kind` currently on disk.
    pub async fn list(&self, kind: EntityKind) -> StoreResult<Vec<String>> {
        let dir = self.kind_dir(kind);
        let mut entries = match self.bounded(&dir, fs::read_dir(&dir)).await {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut ids = Vec::new();
        while let Some(entry) = self.bounded(&dir, entries.next_entry()).await? {
            if let Some(id) = entry
                .file_name()
                .to_str()
                .and_then(|name| kind.id_from_file_name(name))
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Ids come from callers; keep them inside the kind directory.
    fn checked_path(&self, kind: EntityKind, id: &str) -> StoreResult<PathBuf> {
        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            return Err(StoreError::Validation(format!("invalid record id '{id}'")));
        }
        Ok(self.path_for(kind, id))
    }

    pub async fn write_json_at<T: Serialize>(&self, path: &Path, value: &T) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        if let Some(parent) = path.parent() {
            self.bounded(parent, fs::create_dir_all(parent)).await?;
        }
        let tmp = path.with_extension("json.tmp");
        self.bounded(&tmp, fs::write(&tmp, bytes)).await?;
        self.bounded(path, fs::rename(&tmp, path)).await
    }

    pub async fn read_json_at<T: DeserializeOwned>(&self, path: &Path) -> StoreResult<Option<T>> {
        let bytes = match self.bounded(path, fs::read(path)).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::CorruptRecord {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Runs a filesystem future under the configured deadline.
    pub(crate) async fn bounded<T, F>(&self, path: &Path, fut: F) -> StoreResult<T>
    where
        F: Future<Output = io::Result<T>>,
    {
        match tokio::time::timeout(self.deadline, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            }),
            Err(_) => Err(StoreError::Timeout {
                path: path.to_path_buf(),
            }),
        }
    }
}
