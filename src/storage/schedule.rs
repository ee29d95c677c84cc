use super::{load_json, read_json, save_json};
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Polling configuration and progress of one watched folder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleEntry {
    /// Polling interval in seconds
    pub interval: u64,
    /// Epoch seconds of the last check submission, 0 if never checked
    pub last_check: f64,
}

impl ScheduleEntry {
    /// Returns true once more than `interval` seconds have passed since the last check.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn is_due(&self, now: f64) -> bool {
        now - self.last_check > self.interval as f64
    }
}

/// Watched folders with their intervals and last-check timestamps.
///
/// Persisted as two files: `folders.json` (folder -> interval) and
/// `last_check.json` (folder -> epoch seconds).
///
/// Every scheduled folder also carries an in-memory generation, assigned
/// when the folder enters the store. Removing and re-adding a path gives it
/// a new generation, which lets work started for the old entry be told
/// apart from work for the new one.
#[derive(Debug)]
pub struct ScheduleStore {
    /// Interval file
    folders_path: PathBuf,
    /// Last-check file
    last_check_path: PathBuf,
    /// Folder path -> schedule
    entries: BTreeMap<String, ScheduleEntry>,
    /// Folder path -> generation
    generations: BTreeMap<String, u64>,
    /// Next generation to hand out
    next_generation: u64,
}

impl ScheduleStore {
    /// Loads both files and joins them on folder path.
    ///
    /// Folders without a last-check entry start at 0; last-check entries for
    /// folders that are not scheduled are dropped.
    #[must_use]
    pub fn load(folders_path: &Path, last_check_path: &Path) -> Self {
        let mut store = Self {
            folders_path: folders_path.to_path_buf(),
            last_check_path: last_check_path.to_path_buf(),
            entries: BTreeMap::new(),
            generations: BTreeMap::new(),
            next_generation: 1,
        };

        let intervals: BTreeMap<String, u64> = load_json(folders_path);
        let last_checks: BTreeMap<String, f64> = load_json(last_check_path);
        store.merge(intervals, Some(last_checks));
        debug!(folders = store.entries.len(), "Loaded schedule");
        store
    }

    /// Re-reads both files, replacing the in-memory schedule with what is
    /// on disk.
    ///
    /// Folders that stay scheduled keep their generation. A missing or
    /// corrupt `folders.json` leaves everything as it is; a missing or
    /// corrupt `last_check.json` keeps the in-memory timestamps.
    pub fn reload(&mut self) {
        let Some(intervals) = read_json::<BTreeMap<String, u64>>(&self.folders_path) else {
            return;
        };
        let last_checks = read_json::<BTreeMap<String, f64>>(&self.last_check_path);
        self.merge(intervals, last_checks);
    }

    /// Replace the entries with `intervals`, taking last-check times from
    /// `last_checks` when given and from memory otherwise.
    fn merge(
        &mut self,
        intervals: BTreeMap<String, u64>,
        mut last_checks: Option<BTreeMap<String, f64>>,
    ) {
        let mut entries = BTreeMap::new();
        let mut generations = BTreeMap::new();

        for (folder, interval) in intervals {
            let on_disk = last_checks.as_mut().and_then(|map| map.remove(&folder));
            let in_memory = self.entries.get(&folder).map(|entry| entry.last_check);
            let last_check = on_disk.or(in_memory).unwrap_or(0.0);

            let generation = match self.generations.get(&folder) {
                Some(generation) => *generation,
                None => self.allocate_generation(),
            };
            generations.insert(folder.clone(), generation);
            entries.insert(
                folder,
                ScheduleEntry {
                    interval,
                    last_check,
                },
            );
        }

        if let Some(orphans) = last_checks.filter(|map| !map.is_empty()) {
            warn!(
                orphans = orphans.len(),
                "Dropping last-check entries for folders that are not scheduled"
            );
        }

        self.entries = entries;
        self.generations = generations;
    }

    /// Hand out a fresh generation number.
    fn allocate_generation(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }

    /// Generation of `folder`, if it is scheduled.
    #[must_use]
    pub fn generation(&self, folder: &str) -> Option<u64> {
        self.generations.get(folder).copied()
    }

    /// Returns true if `folder` is scheduled under `generation`.
    #[must_use]
    pub fn is_current(&self, folder: &str, generation: u64) -> bool {
        self.generation(folder) == Some(generation)
    }

    /// Returns the schedule of `folder`.
    #[must_use]
    pub fn get(&self, folder: &str) -> Option<&ScheduleEntry> {
        self.entries.get(folder)
    }

    /// Returns true if `folder` is scheduled.
    #[must_use]
    pub fn contains(&self, folder: &str) -> bool {
        self.entries.contains_key(folder)
    }

    /// Schedules a new folder that has never been checked and returns its
    /// generation.
    ///
    /// Returns `None` without touching anything if it is already scheduled.
    pub fn add(&mut self, folder: &str, interval: u64) -> Option<u64> {
        if self.entries.contains_key(folder) {
            return None;
        }
        self.entries.insert(
            folder.to_string(),
            ScheduleEntry {
                interval,
                last_check: 0.0,
            },
        );
        let generation = self.allocate_generation();
        self.generations.insert(folder.to_string(), generation);
        self.persist();
        Some(generation)
    }

    /// Changes the interval of a scheduled folder; false if unknown.
    pub fn update_interval(&mut self, folder: &str, interval: u64) -> bool {
        let Some(entry) = self.entries.get_mut(folder) else {
            return false;
        };
        entry.interval = interval;
        self.persist();
        true
    }

    /// Unschedules `folder`, persisting only if it was scheduled.
    pub fn remove(&mut self, folder: &str) -> Option<ScheduleEntry> {
        let removed = self.entries.remove(folder);
        if removed.is_some() {
            self.generations.remove(folder);
            self.persist();
        }
        removed
    }

    /// Sets the last-check time of `folder` without saving.
    ///
    /// Callers batch these and call [`Self::persist`] once per dispatch pass.
    pub fn touch(&mut self, folder: &str, now: f64) -> bool {
        match self.entries.get_mut(folder) {
            Some(entry) => {
                entry.last_check = now;
                true
            }
            None => false,
        }
    }

    /// Folders whose interval has elapsed at `now`, in path order.
    #[must_use]
    pub fn due(&self, now: f64) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.is_due(now))
            .map(|(folder, _)| folder.clone())
            .collect()
    }

    /// All scheduled folders with their entries, in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScheduleEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Scheduled folder paths, in path order.
    #[must_use]
    pub fn folders(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Number of scheduled folders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes both backing files.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be serialized or written.
    pub fn save(&self) -> Result<()> {
        let intervals: BTreeMap<&str, u64> = self
            .entries
            .iter()
            .map(|(folder, entry)| (folder.as_str(), entry.interval))
            .collect();
        let last_checks: BTreeMap<&str, f64> = self
            .entries
            .iter()
            .map(|(folder, entry)| (folder.as_str(), entry.last_check))
            .collect();

        save_json(&self.folders_path, &intervals)?;
        save_json(&self.last_check_path, &last_checks)?;
        Ok(())
    }

    /// Saves, logging instead of returning a failure.
    pub fn persist(&self) {
        if let Err(e) = self.save() {
            error!(
                path = %self.folders_path.display(),
                error = %format!("{e:#}"),
                "Failed to save schedule"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{TempDir, tempdir};

    fn store_in(dir: &TempDir) -> ScheduleStore {
        ScheduleStore::load(
            &dir.path().join("folders.json"),
            &dir.path().join("last_check.json"),
        )
    }

    #[test]
    fn test_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let mut store = store_in(&dir);
        assert!(store.add("/a", 60).is_some());
        assert!(store.add("/b", 3600).is_some());
        store.touch("/b", 1_700_000_000.75);
        store.persist();

        let reloaded = store_in(&dir);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(
            reloaded.get("/a"),
            Some(&ScheduleEntry {
                interval: 60,
                last_check: 0.0
            })
        );
        assert_eq!(
            reloaded.get("/b"),
            Some(&ScheduleEntry {
                interval: 3600,
                last_check: 1_700_000_000.75
            })
        );
        Ok(())
    }

    #[test]
    fn test_round_trip_empty() -> Result<()> {
        let dir = tempdir()?;
        store_in(&dir).save()?;
        assert!(store_in(&dir).is_empty());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("folders.json"))?,
            "{}"
        );
        Ok(())
    }

    #[test]
    fn test_add_rejects_duplicate() -> Result<()> {
        let dir = tempdir()?;
        let mut store = store_in(&dir);
        assert!(store.add("/a", 60).is_some());
        assert!(store.add("/a", 120).is_none());
        assert_eq!(store.get("/a").map(|e| e.interval), Some(60));
        Ok(())
    }

    #[test]
    fn test_update_and_remove() -> Result<()> {
        let dir = tempdir()?;
        let mut store = store_in(&dir);
        store.add("/a", 60);

        assert!(store.update_interval("/a", 90));
        assert!(!store.update_interval("/missing", 90));
        assert_eq!(store_in(&dir).get("/a").map(|e| e.interval), Some(90));

        assert!(store.remove("/a").is_some());
        assert!(store.remove("/a").is_none());
        assert!(store_in(&dir).is_empty());
        Ok(())
    }

    #[test]
    fn test_due_uses_strict_comparison() -> Result<()> {
        let dir = tempdir()?;
        let mut store = store_in(&dir);
        store.add("/a", 60);
        store.add("/b", 60);
        store.touch("/a", 1000.0);
        store.touch("/b", 1000.0);

        assert!(store.due(1060.0).is_empty());
        store.touch("/b", 900.0);
        assert_eq!(store.due(1060.0), vec!["/b".to_string()]);
        assert_eq!(store.due(1061.0), vec!["/a".to_string(), "/b".to_string()]);
        Ok(())
    }

    #[test]
    fn test_load_joins_files() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join("folders.json"), r#"{"/a": 60, "/b": 120}"#)?;
        std::fs::write(
            dir.path().join("last_check.json"),
            r#"{"/a": 1700000000, "/gone": 5}"#,
        )?;

        let store = store_in(&dir);
        assert_eq!(store.get("/a").map(|e| e.last_check), Some(1_700_000_000.0));
        assert_eq!(store.get("/b").map(|e| e.last_check), Some(0.0));
        assert!(!store.contains("/gone"));
        Ok(())
    }

    #[test]
    fn test_reload_picks_up_other_writers() -> Result<()> {
        let dir = tempdir()?;
        let mut daemon = store_in(&dir);
        daemon.add("/a", 60);
        daemon.add("/gone", 60);

        let mut other = store_in(&dir);
        other.add("/b", 120);
        other.remove("/gone");
        other.update_interval("/a", 90);
        other.touch("/a", 500.0);
        other.persist();

        daemon.reload();
        assert_eq!(daemon.folders(), vec!["/a".to_string(), "/b".to_string()]);
        assert_eq!(
            daemon.get("/a"),
            Some(&ScheduleEntry {
                interval: 90,
                last_check: 500.0
            })
        );

        // A save after reload keeps the other writer's changes
        daemon.touch("/b", 700.0);
        daemon.persist();
        let fresh = store_in(&dir);
        assert_eq!(fresh.len(), 2);
        assert_eq!(fresh.get("/b").map(|e| e.last_check), Some(700.0));
        Ok(())
    }

    #[test]
    fn test_reload_ignores_unreadable_files() -> Result<()> {
        let dir = tempdir()?;
        let mut store = store_in(&dir);
        store.add("/a", 60);
        store.touch("/a", 42.0);

        std::fs::write(dir.path().join("last_check.json"), "{ torn")?;
        store.reload();
        assert_eq!(store.get("/a").map(|e| e.last_check), Some(42.0));

        std::fs::write(dir.path().join("folders.json"), "")?;
        store.reload();
        assert!(store.contains("/a"));
        Ok(())
    }

    #[test]
    fn test_generations() -> Result<()> {
        let dir = tempdir()?;
        let mut store = store_in(&dir);
        let first = store.add("/a", 60).expect("new folder");
        assert_eq!(store.generation("/a"), Some(first));
        assert!(store.is_current("/a", first));

        // Reload keeps the generation of a folder that stays scheduled
        store.reload();
        assert!(store.is_current("/a", first));

        store.remove("/a");
        assert_eq!(store.generation("/a"), None);
        let second = store.add("/a", 60).expect("new folder");
        assert_ne!(first, second);
        assert!(!store.is_current("/a", first));
        Ok(())
    }

    #[test]
    fn test_corrupt_last_check_keeps_folders() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join("folders.json"), r#"{"/a": 60}"#)?;
        std::fs::write(dir.path().join("last_check.json"), "garbage")?;

        let store = store_in(&dir);
        assert_eq!(store.get("/a").map(|e| e.last_check), Some(0.0));
        Ok(())
    }
}
