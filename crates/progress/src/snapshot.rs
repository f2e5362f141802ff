//! Persisting the cache between runs.
//!
//! A [`CacheSnapshot`] is a plain serializable copy of every cache entry.
//! Where it is kept is up to a [`SnapshotStore`]; [`JsonFileSnapshots`]
//! keeps it in a single JSON file.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::cache::{CacheEntry, CacheKey};
use crate::error::{ErrorKind, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    pub key: CacheKey,
    pub entry: CacheEntry,
}

/// Every cache entry at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    #[serde(with = "time::serde::timestamp")]
    pub taken_at: OffsetDateTime,
    #[serde(default)]
    pub entries: Vec<SnapshotEntry>,
}

/// Somewhere a [`CacheSnapshot`] can be saved and loaded again.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// The last saved snapshot, or `None` if nothing has been saved yet.
    async fn load(&self) -> Result<Option<CacheSnapshot>>;

    async fn save(&self, snapshot: &CacheSnapshot) -> Result<()>;
}

/// Snapshots kept in one JSON file.
///
/// Saving writes to a sibling temporary file first and renames it over the
/// target, so a crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct JsonFileSnapshots {
    path: PathBuf,
}
impl JsonFileSnapshots {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotStore for JsonFileSnapshots {
    async fn load(&self) -> Result<Option<CacheSnapshot>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == IoErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No cache snapshot yet");
                return Ok(None);
            },
            Err(err) => return Err(err).or_raise(|| ErrorKind::Snapshot),
        };
        let snapshot: CacheSnapshot = serde_json::from_slice(&raw).or_raise(|| ErrorKind::Snapshot)?;
        tracing::debug!(path = %self.path.display(), entries = snapshot.entries.len(), "Loaded cache snapshot");
        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &CacheSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Snapshot)?;
        }
        let raw = serde_json::to_vec(snapshot).or_raise(|| ErrorKind::Snapshot)?;
        let temporary = self.path.with_extension("json.tmp");
        tokio::fs::write(&temporary, raw).await.or_raise(|| ErrorKind::Snapshot)?;
        tokio::fs::rename(&temporary, &self.path).await.or_raise(|| ErrorKind::Snapshot)?;
        tracing::debug!(path = %self.path.display(), entries = snapshot.entries.len(), "Saved cache snapshot");
        Ok(())
    }
}
