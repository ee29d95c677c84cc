//! Snapshot comparison.
//!
//! [`diff`] classifies every file-level difference between two snapshots of
//! the same folder as new, modified or deleted. Metadata is compared with
//! exact equality on both modification time and size.

use crate::storage::Snapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One file-level change found by a check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeRecord {
    /// File present now but absent from the previous snapshot
    New(String),
    /// File present in both with different `(mtime, size)`
    Modified(String),
    /// File present in the previous snapshot but gone now
    Deleted(String),
}

impl ChangeRecord {
    /// Returns the path the change refers to.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::New(p) | Self::Modified(p) | Self::Deleted(p) => p,
        }
    }

    /// Returns the upper-case label used in the operation log.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::New(_) => "NEW",
            Self::Modified(_) => "MODIFIED",
            Self::Deleted(_) => "DELETED",
        }
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label(), self.path())
    }
}

/// Per-kind counts of a change list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    /// Number of new files
    pub new: usize,
    /// Number of modified files
    pub modified: usize,
    /// Number of deleted files
    pub deleted: usize,
}

impl ChangeSummary {
    /// Counts the records of each kind.
    #[must_use]
    pub fn of(changes: &[ChangeRecord]) -> Self {
        changes.iter().fold(Self::default(), |mut acc, change| {
            match change {
                ChangeRecord::New(_) => acc.new += 1,
                ChangeRecord::Modified(_) => acc.modified += 1,
                ChangeRecord::Deleted(_) => acc.deleted += 1,
            }
            acc
        })
    }

    /// Total number of changes.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.new + self.modified + self.deleted
    }
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} new, {} modified, {} deleted",
            self.new, self.modified, self.deleted
        )
    }
}

/// Compare two snapshots of the same folder.
///
/// New and modified files come first, in the iteration order of `current`;
/// deleted files follow in the iteration order of `previous`. Both snapshots
/// are ordered by path, so each run is sorted.
///
/// # Examples
///
/// ```
/// use foldwatch::diff::{ChangeRecord, diff};
/// use foldwatch::storage::{FileMeta, Snapshot};
///
/// let mut previous = Snapshot::new();
/// previous.insert("/w/old.txt".into(), FileMeta::new(1.0, 3));
///
/// let mut current = Snapshot::new();
/// current.insert("/w/new.txt".into(), FileMeta::new(2.0, 5));
///
/// assert_eq!(
///     diff(&previous, &current),
///     vec![
///         ChangeRecord::New("/w/new.txt".into()),
///         ChangeRecord::Deleted("/w/old.txt".into()),
///     ]
/// );
/// ```
#[must_use]
pub fn diff(previous: &Snapshot, current: &Snapshot) -> Vec<ChangeRecord> {
    let mut changes: Vec<ChangeRecord> = current
        .iter()
        .filter_map(|(path, meta)| match previous.get(path) {
            None => Some(ChangeRecord::New(path.clone())),
            Some(old) if old != meta => Some(ChangeRecord::Modified(path.clone())),
            Some(_) => None,
        })
        .collect();

    changes.extend(
        previous
            .keys()
            .filter(|path| !current.contains_key(*path))
            .map(|path| ChangeRecord::Deleted(path.clone())),
    );

    changes
}
