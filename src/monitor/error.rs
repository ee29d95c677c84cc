use crate::interval::IntervalError;
use std::path::PathBuf;
use thiserror::Error;

/// Validation failures of monitor requests.
///
/// These are returned before any state is touched, so a failed request
/// never leaves a partial change behind.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The interval is not a positive number of seconds
    #[error("Invalid interval: {0}")]
    InvalidInterval(#[from] IntervalError),

    /// The path does not exist or cannot be resolved
    #[error("Folder not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The path exists but is not a directory
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// The folder is already being monitored
    #[error("Folder is already being monitored: {0}")]
    AlreadyWatched(String),

    /// The folder is not being monitored
    #[error("Folder is not being monitored: {0}")]
    UnknownFolder(String),
}
