use crate::diff::ChangeRecord;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::fmt;
use std::time::Duration;

/// What a dispatched task does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Scan and compare against the stored snapshot
    Check,
    /// Scan and replace the stored snapshot
    Snapshot,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Check => write!(f, "check"),
            Self::Snapshot => write!(f, "snapshot"),
        }
    }
}

/// How a task ended.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome {
    /// A check completed; empty `changes` means the folder is unchanged
    Checked {
        /// Differences from the stored snapshot
        changes: Vec<ChangeRecord>,
    },
    /// A snapshot was stored
    Snapshotted {
        /// Number of files captured
        files: usize,
    },
    /// The folder was removed while the task ran; nothing was applied
    Discarded,
    /// The task failed or panicked
    Failed(String),
}

/// Final result of one dispatched task.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationReport {
    /// Folder the task ran for
    pub folder: String,
    /// Check or snapshot
    pub kind: OperationKind,
    /// Result
    pub outcome: OperationOutcome,
}

impl OperationReport {
    /// Returns true unless the task failed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self.outcome, OperationOutcome::Failed(_))
    }
}

/// Handle to a submitted task.
///
/// Dropping the handle does not cancel the task; it only gives up the
/// ability to collect its report.
#[derive(Debug)]
pub struct OperationHandle {
    /// Folder the task runs for
    folder: String,
    /// Check or snapshot
    kind: OperationKind,
    /// One-shot result channel
    rx: Receiver<OperationReport>,
}

impl OperationHandle {
    /// Wraps the receiving end of a task's result channel.
    pub(crate) const fn new(folder: String, kind: OperationKind, rx: Receiver<OperationReport>) -> Self {
        Self { folder, kind, rx }
    }

    /// Folder the task runs for.
    #[must_use]
    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// Kind of the task.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Blocks until the task reports.
    #[must_use = "the report says whether the task failed"]
    pub fn wait(self) -> OperationReport {
        match self.rx.recv() {
            Ok(report) => report,
            Err(_) => self.lost(),
        }
    }

    /// Blocks for at most `timeout`; `None` if the task is still running.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> Option<OperationReport> {
        match self.rx.recv_timeout(timeout) {
            Ok(report) => Some(report),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(self.lost()),
        }
    }

    /// Report for a task whose sender vanished without reporting.
    fn lost(&self) -> OperationReport {
        OperationReport {
            folder: self.folder.clone(),
            kind: self.kind,
            outcome: OperationOutcome::Failed("task ended without reporting".to_string()),
        }
    }
}

/// Waits for every handle, returning reports in submission order.
#[must_use]
pub fn wait_all(handles: Vec<OperationHandle>) -> Vec<OperationReport> {
    handles.into_iter().map(OperationHandle::wait).collect()
}
