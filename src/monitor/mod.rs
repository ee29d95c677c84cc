//! The monitoring engine.
//!
//! [`Monitor`] owns the schedule and snapshot stores, decides which folders
//! are due, and runs check and snapshot tasks on a Rayon worker pool. Every
//! submission returns an [`OperationHandle`]; observers and channel
//! subscribers are told when each task starts and finishes.
//!
//! # Locking
//!
//! Locks are always taken in the order schedule, snapshots, log. The status
//! and active maps are never held while acquiring another lock, and
//! observers are called with no lock held. Scanning happens outside every
//! lock; only the short apply step at the end of a task locks the stores,
//! and log writes happen after the store locks are released.
//!
//! # Sharing a state directory
//!
//! The stores are re-read from disk each time their lock is taken, so a
//! long-running monitor (the `watch` daemon) and short-lived ones (one-shot
//! commands) see each other's changes instead of overwriting them.
//!
//! # Generations
//!
//! Each scheduled folder has a generation that changes when the folder is
//! removed and added again. Tasks capture it at submission; a task whose
//! generation is no longer current discards its result and leaves the active
//! count of the newer entry alone.

mod clock;
mod error;
mod events;
mod handle;
mod task;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::MonitorError;
pub use events::{MonitorEvent, MonitorObserver};
pub use handle::{OperationHandle, OperationKind, OperationOutcome, OperationReport, wait_all};

use crate::interval::IntervalError;
use crate::oplog::{EntryKind, LogEntry, OperationLog, changes_message, no_changes_message};
use crate::scanner::MetadataScanner;
use crate::storage::{ScheduleStore, SnapshotStore};
use crate::utils::thread_pool::build_worker_pool;
use crate::{FOLDERS_FILE, LAST_CHECK_FILE, LOG_FILE, SNAPSHOTS_FILE};
use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use dashmap::DashMap;
use events::ChannelObserver;
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info};

/// Result of the most recent completed check of a folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FolderStatus {
    /// Nothing changed since the snapshot
    Ok,
    /// Files were added, modified or deleted
    Changed,
    /// Not checked since the monitor started
    #[default]
    Unknown,
}

impl fmt::Display for FolderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Changed => write!(f, "changed"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Point-in-time view of one watched folder.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderInfo {
    /// Canonical folder path
    pub path: String,
    /// Polling interval in seconds
    pub interval: u64,
    /// Epoch seconds of the last check submission, 0 if never
    pub last_check: f64,
    /// Result of the last check
    pub status: FolderStatus,
    /// Whether a check or snapshot is in flight
    pub is_active: bool,
}

/// Lock a mutex, recovering the data if a panicking task poisoned it.
///
/// Tasks catch their own panics, and every store keeps itself consistent
/// between statements, so the data behind a poisoned lock is still valid.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between the monitor, its scheduler thread and its tasks.
pub(crate) struct Shared {
    /// Directory holding the persisted state
    state_dir: PathBuf,
    /// Intervals and last-check times
    schedule: Mutex<ScheduleStore>,
    /// Baselines
    snapshots: Mutex<SnapshotStore>,
    /// Status of the last completed check per folder
    statuses: DashMap<String, FolderStatus>,
    /// In-flight task count per folder
    active: DashMap<String, ActiveCount>,
    /// Operation log file
    log: Mutex<OperationLog>,
    /// Registered observers
    observers: RwLock<Vec<Arc<dyn MonitorObserver>>>,
    /// Worker pool
    pool: rayon::ThreadPool,
    /// Folder scanner
    scanner: MetadataScanner,
    /// Time source for scheduling
    clock: Arc<dyn Clock>,
}

/// Tasks in flight for one generation of a folder.
#[derive(Debug, Clone, Copy)]
struct ActiveCount {
    /// Generation the tasks were submitted for
    generation: u64,
    /// Number of tasks
    tasks: usize,
}

impl Shared {
    /// Lock the schedule after re-reading it from disk.
    fn schedule(&self) -> MutexGuard<'_, ScheduleStore> {
        let mut schedule = lock(&self.schedule);
        schedule.reload();
        schedule
    }

    /// Lock the snapshots after re-reading them from disk.
    fn snapshots(&self) -> MutexGuard<'_, SnapshotStore> {
        let mut snapshots = lock(&self.snapshots);
        snapshots.reload();
        snapshots
    }

    /// Submit a task and notify observers that it started.
    fn submit(
        self: &Arc<Self>,
        folder: String,
        generation: u64,
        kind: OperationKind,
    ) -> OperationHandle {
        let (tx, rx) = bounded(1);

        self.begin(&folder, generation);
        debug!(folder, generation, %kind, "Dispatching");
        self.notify_started(&folder, kind);

        let shared = Arc::clone(self);
        let task_folder = folder.clone();
        self.pool
            .spawn(move || shared.run_task(&task_folder, generation, kind, &tx));

        OperationHandle::new(folder, kind, rx)
    }

    /// Mark one more in-flight task for `folder`.
    ///
    /// A newer generation replaces the count of an older one; tasks for an
    /// older generation than the recorded one are not counted.
    fn begin(&self, folder: &str, generation: u64) {
        let mut entry = self
            .active
            .entry(folder.to_string())
            .or_insert(ActiveCount {
                generation,
                tasks: 0,
            });
        match entry.generation.cmp(&generation) {
            Ordering::Less => {
                *entry = ActiveCount {
                    generation,
                    tasks: 1,
                };
            }
            Ordering::Equal => entry.tasks += 1,
            Ordering::Greater => {}
        }
    }

    /// Mark one in-flight task for `folder` as done.
    ///
    /// Ignored if the folder has moved on to another generation.
    fn end(&self, folder: &str, generation: u64) {
        if let Some(mut entry) = self.active.get_mut(folder)
            && entry.generation == generation
        {
            entry.tasks = entry.tasks.saturating_sub(1);
        }
        self.active.remove_if(folder, |_, entry| entry.tasks == 0);
    }

    /// Snapshot of the observer list, so no lock is held while calling out.
    fn observers(&self) -> Vec<Arc<dyn MonitorObserver>> {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Tell observers a task was submitted.
    fn notify_started(&self, folder: &str, kind: OperationKind) {
        let observers = self.observers();
        for observer in &observers {
            observer.on_operation_started(folder, kind);
        }
        self.prune_closed(&observers);
    }

    /// Tell observers a task ended.
    fn notify_finished(&self, folder: &str, kind: OperationKind) {
        let observers = self.observers();
        for observer in &observers {
            observer.on_operation_finished(folder, kind);
        }
        self.prune_closed(&observers);
    }

    /// Unregister observers that reported themselves closed.
    fn prune_closed(&self, notified: &[Arc<dyn MonitorObserver>]) {
        if !notified.iter().any(|observer| observer.is_closed()) {
            return;
        }
        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|observer| !observer.is_closed());
        debug!(removed = before - observers.len(), "Dropped closed observers");
    }
}

/// Status of each scheduled folder according to its latest check record.
///
/// Failed checks and folders never checked stay unknown.
fn restore_statuses(schedule: &ScheduleStore, log: &OperationLog) -> DashMap<String, FolderStatus> {
    let entries = log.entries();
    let statuses = DashMap::new();

    for folder in schedule.folders() {
        let status = entries
            .iter()
            .rev()
            .find(|entry| entry.is_record_of(&folder, EntryKind::Check))
            .and_then(|entry| {
                if entry.message() == no_changes_message(&folder) {
                    Some(FolderStatus::Ok)
                } else if entry.message() == changes_message(&folder) {
                    Some(FolderStatus::Changed)
                } else {
                    None
                }
            });
        if let Some(status) = status {
            statuses.insert(folder, status);
        }
    }

    statuses
}

/// Pair each folder with its current generation.
fn with_generations(schedule: &ScheduleStore, folders: Vec<String>) -> Vec<(String, u64)> {
    folders
        .into_iter()
        .filter_map(|folder| {
            let generation = schedule.generation(&folder)?;
            Some((folder, generation))
        })
        .collect()
}

/// Configures and opens a [`Monitor`].
#[derive(Debug)]
pub struct MonitorBuilder {
    /// Directory holding the persisted state
    state_dir: PathBuf,
    /// Worker count, 0 for the default
    worker_threads: usize,
    /// Whether scans descend into symlinked directories
    follow_symlinks: bool,
    /// Time source, system clock if unset
    clock: Option<Arc<dyn Clock>>,
}

impl MonitorBuilder {
    /// Number of worker threads; 0 picks the default.
    #[must_use]
    pub const fn worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    /// Whether scans descend into symlinked directories.
    #[must_use]
    pub const fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Time source used for due checks and last-check stamps.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Load persisted state and start the worker pool.
    ///
    /// Missing or corrupt state files are treated as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the state directory cannot be created or the
    /// worker pool cannot be started.
    pub fn build(self) -> Result<Monitor> {
        std::fs::create_dir_all(&self.state_dir).with_context(|| {
            format!(
                "Failed to create state directory: {}",
                self.state_dir.display()
            )
        })?;

        let schedule = ScheduleStore::load(
            &self.state_dir.join(FOLDERS_FILE),
            &self.state_dir.join(LAST_CHECK_FILE),
        );
        let snapshots = SnapshotStore::load(&self.state_dir.join(SNAPSHOTS_FILE));
        let log = OperationLog::new(self.state_dir.join(LOG_FILE));
        let statuses = restore_statuses(&schedule, &log);
        let pool = build_worker_pool(self.worker_threads)?;

        info!(
            state_dir = %self.state_dir.display(),
            folders = schedule.len(),
            workers = pool.current_num_threads(),
            "Monitor ready"
        );

        Ok(Monitor {
            shared: Arc::new(Shared {
                state_dir: self.state_dir,
                schedule: Mutex::new(schedule),
                snapshots: Mutex::new(snapshots),
                statuses,
                active: DashMap::new(),
                log: Mutex::new(log),
                observers: RwLock::new(Vec::new()),
                pool,
                scanner: MetadataScanner::new(self.follow_symlinks),
                clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            }),
        })
    }
}

/// The folder monitor.
///
/// Cloning is cheap and every clone drives the same state.
///
/// # Examples
///
/// ```no_run
/// use foldwatch::Monitor;
/// use std::time::Duration;
///
/// # fn main() -> anyhow::Result<()> {
/// let monitor = Monitor::builder("/tmp/foldwatch-state").build()?;
/// let report = monitor.add_folder("/srv/data", 3600)?.wait();
/// assert!(report.is_success());
///
/// let scheduler = monitor.spawn_scheduler(Duration::from_secs(60))?;
/// // ...
/// scheduler.stop();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Monitor {
    /// Shared state
    shared: Arc<Shared>,
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("state_dir", &self.shared.state_dir)
            .field("active", &self.shared.active.len())
            .finish_non_exhaustive()
    }
}

impl Monitor {
    /// Start configuring a monitor over `state_dir`.
    pub fn builder(state_dir: impl Into<PathBuf>) -> MonitorBuilder {
        MonitorBuilder {
            state_dir: state_dir.into(),
            worker_threads: 0,
            follow_symlinks: false,
            clock: None,
        }
    }

    /// Directory holding the persisted state.
    #[must_use]
    pub fn state_dir(&self) -> &Path {
        &self.shared.state_dir
    }

    /// Key under which `path` is stored.
    ///
    /// The path as given if it is already watched, otherwise its canonical
    /// form when it still exists on disk.
    fn folder_key(&self, path: &Path) -> String {
        let raw = path.to_string_lossy().into_owned();
        if self.shared.schedule().contains(&raw) {
            return raw;
        }
        std::fs::canonicalize(path).map_or(raw, |p| p.to_string_lossy().into_owned())
    }

    /// Start watching `path` every `interval` seconds and capture its first
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Fails without changing anything if the interval is zero, the path
    /// does not resolve to a directory, or the folder is already watched.
    pub fn add_folder(
        &self,
        path: impl AsRef<Path>,
        interval: u64,
    ) -> Result<OperationHandle, MonitorError> {
        if interval == 0 {
            return Err(IntervalError::Zero.into());
        }

        let path = path.as_ref();
        let canonical =
            std::fs::canonicalize(path).map_err(|_| MonitorError::NotFound(path.to_path_buf()))?;
        if !canonical.is_dir() {
            return Err(MonitorError::NotADirectory(canonical));
        }
        let folder = canonical.to_string_lossy().into_owned();

        let Some(generation) = self.shared.schedule().add(&folder, interval) else {
            return Err(MonitorError::AlreadyWatched(folder));
        };

        info!(folder, interval, "Watching folder");
        Ok(self.shared.submit(folder, generation, OperationKind::Snapshot))
    }

    /// Stop watching `path`, dropping its schedule, snapshot, status and
    /// active flag together.
    ///
    /// Returns false if the folder was not watched. Tasks still running for
    /// it discard their results.
    pub fn remove_folder(&self, path: impl AsRef<Path>) -> bool {
        let folder = self.folder_key(path.as_ref());

        let mut schedule = self.shared.schedule();
        if schedule.remove(&folder).is_none() {
            debug!(folder, "Remove requested for unknown folder");
            return false;
        }
        self.shared.snapshots().remove(&folder);
        self.shared.statuses.remove(&folder);
        self.shared.active.remove(&folder);
        drop(schedule);

        info!(folder, "Stopped watching folder");
        true
    }

    /// Change the polling interval of a watched folder.
    ///
    /// # Errors
    ///
    /// Fails if the interval is zero or the folder is not watched.
    pub fn update_interval(&self, path: impl AsRef<Path>, interval: u64) -> Result<(), MonitorError> {
        if interval == 0 {
            return Err(IntervalError::Zero.into());
        }
        let folder = self.folder_key(path.as_ref());

        if !self.shared.schedule().update_interval(&folder, interval) {
            return Err(MonitorError::UnknownFolder(folder));
        }
        info!(folder, interval, "Interval updated");
        Ok(())
    }

    /// Check one folder immediately, regardless of its schedule.
    ///
    /// # Errors
    ///
    /// Fails if the folder is not watched.
    pub fn check_now(&self, path: impl AsRef<Path>) -> Result<OperationHandle, MonitorError> {
        let folder = self.folder_key(path.as_ref());
        let now = self.shared.clock.now();

        let generation = {
            let mut schedule = self.shared.schedule();
            let Some(generation) = schedule.generation(&folder) else {
                return Err(MonitorError::UnknownFolder(folder));
            };
            schedule.touch(&folder, now);
            schedule.persist();
            generation
        };

        Ok(self.shared.submit(folder, generation, OperationKind::Check))
    }

    /// Check every watched folder immediately.
    pub fn check_all(&self) -> Vec<OperationHandle> {
        let now = self.shared.clock.now();
        let folders = {
            let mut schedule = self.shared.schedule();
            let folders = schedule.folders();
            for folder in &folders {
                schedule.touch(folder, now);
            }
            if !folders.is_empty() {
                schedule.persist();
            }
            with_generations(&schedule, folders)
        };
        self.submit_all(folders, OperationKind::Check)
    }

    /// Replace the snapshot of every watched folder with a fresh scan.
    ///
    /// Last-check times are left alone.
    pub fn snapshot_all(&self) -> Vec<OperationHandle> {
        let folders = {
            let schedule = self.shared.schedule();
            let folders = schedule.folders();
            with_generations(&schedule, folders)
        };
        self.submit_all(folders, OperationKind::Snapshot)
    }

    /// One scheduling pass: submit a check for every folder whose interval
    /// has elapsed, stamping their last-check time first.
    ///
    /// Never waits for the submitted tasks.
    pub fn tick(&self) -> Vec<OperationHandle> {
        let now = self.shared.clock.now();
        let due = {
            let mut schedule = self.shared.schedule();
            let due = schedule.due(now);
            for folder in &due {
                schedule.touch(folder, now);
            }
            if !due.is_empty() {
                schedule.persist();
            }
            with_generations(&schedule, due)
        };

        debug!(due = due.len(), "Tick");
        self.submit_all(due, OperationKind::Check)
    }

    /// Submit one `kind` task per folder.
    fn submit_all(&self, folders: Vec<(String, u64)>, kind: OperationKind) -> Vec<OperationHandle> {
        folders
            .into_iter()
            .map(|(folder, generation)| self.shared.submit(folder, generation, kind))
            .collect()
    }

    /// Every watched folder, ordered by path.
    #[must_use]
    pub fn folders(&self) -> Vec<FolderInfo> {
        let schedule = self.shared.schedule();
        schedule
            .iter()
            .map(|(path, entry)| FolderInfo {
                path: path.to_string(),
                interval: entry.interval,
                last_check: entry.last_check,
                status: self.status(path),
                is_active: self.is_active(path),
            })
            .collect()
    }

    /// Status of the last completed check of `folder`.
    #[must_use]
    pub fn status(&self, folder: &str) -> FolderStatus {
        self.shared
            .statuses
            .get(folder)
            .map(|status| *status)
            .unwrap_or_default()
    }

    /// Whether `folder` has a task in flight.
    #[must_use]
    pub fn is_active(&self, folder: &str) -> bool {
        self.shared.active.contains_key(folder)
    }

    /// Log entries mentioning `folder`, or the whole log for `None`.
    #[must_use]
    pub fn log_entries(&self, folder: Option<&Path>) -> Vec<LogEntry> {
        let key = folder.map(|path| self.folder_key(path));
        let log = lock(&self.shared.log);
        match key {
            Some(key) => log.query(&key),
            None => log.entries(),
        }
    }

    /// Empty the operation log.
    ///
    /// # Errors
    ///
    /// Returns an error if the log file cannot be truncated.
    pub fn clear_log(&self) -> Result<()> {
        lock(&self.shared.log).clear()
    }

    /// Register an observer for operation start/finish notifications.
    pub fn add_observer(&self, observer: Arc<dyn MonitorObserver>) {
        self.shared
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Receive operation start/finish notifications as [`MonitorEvent`]s.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<MonitorEvent> {
        let (tx, rx) = unbounded();
        self.add_observer(Arc::new(ChannelObserver::new(tx)));
        rx
    }

    /// Run [`Self::tick`] on a background thread every `period`, starting
    /// with an immediate pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn_scheduler(&self, period: Duration) -> Result<SchedulerHandle> {
        let monitor = self.clone();
        let (stop_tx, stop_rx) = bounded::<()>(0);

        let thread = std::thread::Builder::new()
            .name("foldwatch-scheduler".to_string())
            .spawn(move || {
                loop {
                    monitor.tick();
                    match stop_rx.recv_timeout(period) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("Scheduler stopped");
            })
            .context("Failed to spawn scheduler thread")?;

        info!(period = ?period, "Scheduler started");
        Ok(SchedulerHandle {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }
}

/// Running scheduler loop. Stops when [`Self::stop`] is called or the handle
/// is dropped.
#[derive(Debug)]
pub struct SchedulerHandle {
    /// Dropping the sender wakes the loop
    stop_tx: Option<Sender<()>>,
    /// Scheduler thread
    thread: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stop the loop and wait for it to exit. In-flight tasks keep running.
    pub fn stop(mut self) {
        self.shutdown();
    }

    /// Signal the loop and join it; idempotent.
    fn shutdown(&mut self) {
        drop(self.stop_tx.take());
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            error!("Scheduler thread panicked");
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
