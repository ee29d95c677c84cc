//! Execution of check and snapshot tasks on the worker pool.

use super::{FolderStatus, OperationKind, OperationOutcome, OperationReport, Shared, lock};
use crate::diff::{ChangeSummary, diff};
use crate::oplog::{
    EntryKind, OperationLog, changes_message, failure_message, no_changes_message,
    snapshot_message,
};
use crate::scanner::{ScanReport, ScanWarning};
use crate::storage::Snapshot;
use anyhow::Result;
use crossbeam_channel::Sender;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::{Level, debug, error, info, span};

impl From<OperationKind> for EntryKind {
    fn from(kind: OperationKind) -> Self {
        match kind {
            OperationKind::Check => Self::Check,
            OperationKind::Snapshot => Self::Snapshot,
        }
    }
}

/// Releases a folder's active flag and fires the finished notification on drop.
struct ActiveGuard<'a> {
    /// Monitor state
    shared: &'a Shared,
    /// Folder the task runs for
    folder: &'a str,
    /// Generation the task was submitted for
    generation: u64,
    /// Task kind, forwarded to observers
    kind: OperationKind,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.shared.end(self.folder, self.generation);
        self.shared.notify_finished(self.folder, self.kind);
    }
}

impl Shared {
    /// Task body: run the operation, catch failures, report.
    ///
    /// The active flag is cleared and observers notified before the report
    /// is sent, so a caller returning from `wait` sees the folder idle.
    pub(super) fn run_task(
        &self,
        folder: &str,
        generation: u64,
        kind: OperationKind,
        tx: &Sender<OperationReport>,
    ) {
        let span = span!(Level::DEBUG, "task", folder, generation, %kind);
        let _enter = span.enter();

        let outcome = {
            let _guard = ActiveGuard {
                shared: self,
                folder,
                generation,
                kind,
            };

            match panic::catch_unwind(AssertUnwindSafe(|| self.execute(folder, generation, kind)))
            {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => self.record_failure(folder, generation, kind, &format!("{e:#}")),
                Err(payload) => {
                    self.record_failure(folder, generation, kind, &panic_message(payload.as_ref()))
                }
            }
        };

        // The handle may have been dropped
        let _ = tx.send(OperationReport {
            folder: folder.to_string(),
            kind,
            outcome,
        });
    }

    /// Scan with no lock held, then apply the result.
    fn execute(&self, folder: &str, generation: u64, kind: OperationKind) -> Result<OperationOutcome> {
        let report = self.scanner.scan(Path::new(folder))?;
        match kind {
            OperationKind::Check => Ok(self.apply_check(folder, generation, report)),
            OperationKind::Snapshot => Ok(self.apply_snapshot(folder, generation, report)),
        }
    }

    /// Store a freshly scanned baseline.
    fn apply_snapshot(&self, folder: &str, generation: u64, report: ScanReport) -> OperationOutcome {
        let ScanReport { snapshot, warnings } = report;

        let files = snapshot.len();
        {
            // Held across the replace so a concurrent removal cannot interleave
            let schedule = self.schedule();
            if !schedule.is_current(folder, generation) {
                debug!("Folder removed while scanning, discarding snapshot");
                return OperationOutcome::Discarded;
            }
            self.snapshots().replace(folder, snapshot);
        }

        let log = lock(&self.log);
        record_warnings(&log, &warnings);
        if let Err(e) = log.record(&snapshot_message(folder), Some((folder, EntryKind::Snapshot))) {
            error!(error = %format!("{e:#}"), "Failed to write operation log");
        }
        drop(log);

        info!(folder, files, "Snapshot updated");
        OperationOutcome::Snapshotted { files }
    }

    /// Compare a fresh scan with the stored baseline without replacing it.
    fn apply_check(&self, folder: &str, generation: u64, report: ScanReport) -> OperationOutcome {
        let ScanReport {
            snapshot: current,
            warnings,
        } = report;

        let (changes, status) = {
            let schedule = self.schedule();
            if !schedule.is_current(folder, generation) {
                debug!("Folder removed while scanning, discarding check");
                return OperationOutcome::Discarded;
            }

            let changes = {
                let snapshots = self.snapshots();
                let empty = Snapshot::new();
                diff(snapshots.get(folder).unwrap_or(&empty), &current)
            };

            let status = if changes.is_empty() {
                FolderStatus::Ok
            } else {
                FolderStatus::Changed
            };
            self.statuses.insert(folder.to_string(), status);
            (changes, status)
        };

        let log = lock(&self.log);
        record_warnings(&log, &warnings);
        let written = if changes.is_empty() {
            log.record(&no_changes_message(folder), Some((folder, EntryKind::Check)))
        } else {
            let details: Vec<String> = changes.iter().map(ToString::to_string).collect();
            log.record_with_details(
                &changes_message(folder),
                Some((folder, EntryKind::Check)),
                &details,
            )
        };
        if let Err(e) = written {
            error!(error = %format!("{e:#}"), "Failed to write operation log");
        }
        drop(log);

        info!(folder, %status, changes = %ChangeSummary::of(&changes), "Check complete");
        OperationOutcome::Checked { changes }
    }

    /// Log a failed task, unless its folder is gone.
    fn record_failure(
        &self,
        folder: &str,
        generation: u64,
        kind: OperationKind,
        message: &str,
    ) -> OperationOutcome {
        if !self.schedule().is_current(folder, generation) {
            debug!(error = message, "Folder removed, discarding failure");
            return OperationOutcome::Discarded;
        }

        error!(folder, %kind, error = message, "Operation failed");
        let entry_kind = EntryKind::from(kind);
        let log = lock(&self.log);
        if let Err(e) = log.record(
            &failure_message(entry_kind, folder, message),
            Some((folder, entry_kind)),
        ) {
            error!(error = %format!("{e:#}"), "Failed to write operation log");
        }

        OperationOutcome::Failed(message.to_string())
    }
}

/// Write one plain log entry per skipped file, in a single rewrite.
fn record_warnings(log: &OperationLog, warnings: &[ScanWarning]) {
    let messages: Vec<String> = warnings.iter().map(ToString::to_string).collect();
    if let Err(e) = log.record_many(&messages) {
        error!(error = %format!("{e:#}"), "Failed to write operation log");
    }
}

/// Text of a caught panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "panic: boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "panic: bang");

        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "panic");
    }

    #[test]
    fn test_entry_kind_mapping() {
        assert_eq!(EntryKind::from(OperationKind::Check), EntryKind::Check);
        assert_eq!(EntryKind::from(OperationKind::Snapshot), EntryKind::Snapshot);
    }
}
