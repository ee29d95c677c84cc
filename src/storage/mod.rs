//! Persisted monitoring state.
//!
//! Both stores keep their whole mapping in memory and rewrite their backing
//! JSON file after every mutation. Loading never fails: a missing file is an
//! empty store and an unparsable one is logged and treated the same way.
//!
//! Several processes may share one state directory (a `watch` daemon beside
//! one-shot commands). Each store can `reload` its file before a mutation so
//! that the following save starts from what is on disk rather than from a
//! stale copy. A missing or corrupt file on reload keeps the in-memory state.

/// Folder schedules and last-check timestamps
pub mod schedule;
/// Per-folder metadata snapshots
pub mod snapshots;

use crate::utils::atomic_write;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

pub use schedule::{ScheduleEntry, ScheduleStore};
pub use snapshots::SnapshotStore;

/// Metadata captured for a single file.
///
/// Serialized as a two-element array `[mtime, size]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, u64)", into = "(f64, u64)")]
pub struct FileMeta {
    /// Modification time in fractional seconds since the Unix epoch
    pub mtime: f64,
    /// File size in bytes
    pub size: u64,
}

impl FileMeta {
    /// Creates a metadata record.
    #[must_use]
    pub const fn new(mtime: f64, size: u64) -> Self {
        Self { mtime, size }
    }
}

impl From<(f64, u64)> for FileMeta {
    fn from((mtime, size): (f64, u64)) -> Self {
        Self { mtime, size }
    }
}

impl From<FileMeta> for (f64, u64) {
    fn from(meta: FileMeta) -> Self {
        (meta.mtime, meta.size)
    }
}

/// Mapping from absolute file path to its metadata for one folder.
///
/// Ordered by path so that diffs and persisted files are deterministic.
pub type Snapshot = BTreeMap<String, FileMeta>;

/// Reads a JSON file, falling back to `T::default()` when it is missing or
/// cannot be parsed.
pub(crate) fn load_json<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    read_json(path).unwrap_or_default()
}

/// Reads a JSON file, returning `None` when it is missing or cannot be
/// parsed. Unreadable and corrupt files are logged.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read state file");
            return None;
        }
    };

    match serde_json::from_slice(&data) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Corrupt state file");
            None
        }
    }
}

/// Serializes `value` as JSON and atomically replaces `path` with it.
pub(crate) fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_vec(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    atomic_write(path, &data)
}
