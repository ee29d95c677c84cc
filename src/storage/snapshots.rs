use super::{Snapshot, load_json, read_json, save_json};
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Last captured snapshot of every watched folder.
///
/// Backed by a single JSON file of the shape
/// `{ "<folder>": { "<file>": [mtime, size] } }`.
#[derive(Debug)]
pub struct SnapshotStore {
    /// Backing file
    path: PathBuf,
    /// Folder path -> snapshot
    snapshots: BTreeMap<String, Snapshot>,
}

impl SnapshotStore {
    /// Loads the store from `path`; missing or corrupt files yield an empty store.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let snapshots: BTreeMap<String, Snapshot> = load_json(path);
        debug!(path = %path.display(), folders = snapshots.len(), "Loaded snapshots");
        Self {
            path: path.to_path_buf(),
            snapshots,
        }
    }

    /// Re-reads the backing file, replacing the in-memory mapping.
    ///
    /// A missing or corrupt file keeps the current mapping.
    pub fn reload(&mut self) {
        if let Some(snapshots) = read_json::<BTreeMap<String, Snapshot>>(&self.path) {
            self.snapshots = snapshots;
        }
    }

    /// Returns the snapshot stored for `folder`.
    #[must_use]
    pub fn get(&self, folder: &str) -> Option<&Snapshot> {
        self.snapshots.get(folder)
    }

    /// Returns true if a snapshot exists for `folder`.
    #[must_use]
    pub fn contains(&self, folder: &str) -> bool {
        self.snapshots.contains_key(folder)
    }

    /// Replaces the snapshot of `folder` and persists the store.
    pub fn replace(&mut self, folder: &str, snapshot: Snapshot) {
        self.snapshots.insert(folder.to_string(), snapshot);
        self.persist();
    }

    /// Removes the snapshot of `folder`, persisting only if something was removed.
    pub fn remove(&mut self, folder: &str) -> Option<Snapshot> {
        let removed = self.snapshots.remove(folder);
        if removed.is_some() {
            self.persist();
        }
        removed
    }

    /// Folders that have a snapshot, in path order.
    pub fn folders(&self) -> impl Iterator<Item = &str> {
        self.snapshots.keys().map(String::as_str)
    }

    /// Number of folders with a snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Returns true if no folder has a snapshot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Writes the full mapping to the backing file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the atomic write fails.
    pub fn save(&self) -> Result<()> {
        save_json(&self.path, &self.snapshots)
    }

    /// Saves, logging instead of returning a failure.
    ///
    /// The in-memory mapping stays authoritative until a later save succeeds.
    pub fn persist(&self) {
        if let Err(e) = self.save() {
            error!(path = %self.path.display(), error = %format!("{e:#}"), "Failed to save snapshots");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FileMeta;
    use tempfile::tempdir;

    fn sample_snapshot() -> Snapshot {
        let mut snapshot = Snapshot::new();
        snapshot.insert("/w/a.txt".to_string(), FileMeta::new(1.5, 10));
        snapshot.insert("/w/sub/b.txt".to_string(), FileMeta::new(1_700_000_000.123_456, 0));
        snapshot
    }

    #[test]
    fn test_round_trip_non_empty() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("snapshots.json");

        let mut store = SnapshotStore::load(&path);
        store.replace("/w", sample_snapshot());
        store.replace("/empty", Snapshot::new());

        let reloaded = SnapshotStore::load(&path);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("/w"), Some(&sample_snapshot()));
        assert_eq!(reloaded.get("/empty"), Some(&Snapshot::new()));
        Ok(())
    }

    #[test]
    fn test_round_trip_empty() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("snapshots.json");

        let store = SnapshotStore::load(&path);
        store.save()?;

        assert_eq!(std::fs::read_to_string(&path)?, "{}");
        assert!(SnapshotStore::load(&path).is_empty());
        Ok(())
    }

    #[test]
    fn test_remove_persists() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("snapshots.json");

        let mut store = SnapshotStore::load(&path);
        store.replace("/w", sample_snapshot());
        assert!(store.remove("/w").is_some());
        assert!(store.remove("/w").is_none());

        assert!(!SnapshotStore::load(&path).contains("/w"));
        Ok(())
    }

    #[test]
    fn test_reload_sees_other_writer() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("snapshots.json");

        let mut daemon = SnapshotStore::load(&path);
        daemon.replace("/w", sample_snapshot());

        let mut other = SnapshotStore::load(&path);
        other.replace("/x", Snapshot::new());

        daemon.reload();
        daemon.replace("/w", Snapshot::new());
        let fresh = SnapshotStore::load(&path);
        assert!(fresh.contains("/x"));
        assert_eq!(fresh.get("/w"), Some(&Snapshot::new()));

        std::fs::write(&path, "[")?;
        daemon.reload();
        assert_eq!(daemon.len(), 2);
        Ok(())
    }

    #[test]
    fn test_corrupt_file_loads_empty() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("snapshots.json");
        std::fs::write(&path, r#"{"/w": {"/w/a": "nope"}}"#)?;

        assert!(SnapshotStore::load(&path).is_empty());
        Ok(())
    }

    #[test]
    fn test_reads_legacy_layout() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("snapshots.json");
        std::fs::write(
            &path,
            r#"{"/w": {"/w/a.txt": [1700000000.5, 12], "/w/b.txt": [1700000001, 0]}}"#,
        )?;

        let store = SnapshotStore::load(&path);
        let snapshot = store.get("/w").expect("folder present");
        assert_eq!(snapshot["/w/a.txt"], FileMeta::new(1_700_000_000.5, 12));
        assert_eq!(snapshot["/w/b.txt"], FileMeta::new(1_700_000_001.0, 0));
        Ok(())
    }
}
