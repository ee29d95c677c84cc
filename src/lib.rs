#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
// Allow pedantic strict lints that create false positives in this codebase
#![allow(clippy::float_arithmetic)] // Timestamps and mtimes are epoch seconds as f64

//! # Foldwatch - Poll-Based Folder Monitor
//!
//! Foldwatch watches a set of directory trees, periodically captures a
//! snapshot of file metadata (modification time and size) for each one, and
//! reports which files were added, modified or deleted since the last
//! snapshot.
//!
//! ## Features
//!
//! - **Independent schedules**: every folder carries its own polling interval
//! - **Concurrent checks**: scans run on a Rayon worker pool and never block
//!   the scheduling tick or each other
//! - **Durable state**: schedules, last-check times and snapshots are JSON
//!   files that survive restarts; corrupt files degrade to empty state
//! - **Compact log**: the operation log keeps only the latest snapshot and
//!   check entry per folder
//!
//! ## Architecture
//!
//! - [`scanner`]: recursive metadata scan of one folder
//! - [`diff`]: pure comparison of two snapshots
//! - [`storage`]: snapshot and schedule stores with atomic JSON persistence
//! - [`oplog`]: the human-readable operation log
//! - [`monitor`]: the dispatcher that owns the stores and runs tasks
//! - [`interval`]: `1h30m`-style interval parsing
//! - [`config`]: configuration file handling
//! - [`commands`]: CLI command implementations
//!
//! ## Example Usage
//!
//! ```no_run
//! use foldwatch::FoldwatchContext;
//!
//! # fn main() -> anyhow::Result<()> {
//! let ctx = FoldwatchContext::new()?;
//! let monitor = ctx.open_monitor()?;
//!
//! let interval = foldwatch::interval::parse_interval("1h30m")?;
//! let report = monitor.add_folder("/home/user/Documents", interval)?.wait();
//! println!("{:?}", report.outcome);
//!
//! for folder in monitor.folders() {
//!     println!("{} every {}s", folder.path, folder.interval);
//! }
//! # Ok(())
//! # }
//! ```

/// Command-line interface definitions (argument parsing structures).
pub mod cli;

/// Commands module containing all CLI command implementations.
pub mod commands;

/// Configuration parsing, validation, and management.
pub mod config;

/// Snapshot comparison producing file-level change records.
pub mod diff;

/// Interval text parsing and human-readable labels.
pub mod interval;

/// Exclusive lock on the state directory.
pub mod lock;

/// Scheduler, dispatcher and task execution.
pub mod monitor;

/// Durable operation log with per-folder entry replacement.
pub mod oplog;

/// Output formatting for the command-line front end.
pub mod output;

/// Filesystem metadata scanning.
pub mod scanner;

/// Snapshot and schedule persistence.
pub mod storage;

/// Utility functions and helpers.
pub mod utils;

use anyhow::{Context, Result};
use std::path::PathBuf;

pub use monitor::{Monitor, MonitorError};

/// Current version of the foldwatch binary.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration file path relative to home directory.
pub const DEFAULT_CONFIG_PATH: &str = ".config/foldwatch/config.toml";

/// Default state directory relative to home directory.
pub const DEFAULT_STATE_DIR: &str = ".local/state/folder_monitor";

/// Folder schedule file (folder -> interval seconds).
pub const FOLDERS_FILE: &str = "folders.json";

/// Last-check timestamp file (folder -> epoch seconds).
pub const LAST_CHECK_FILE: &str = "last_check.json";

/// Snapshot file (folder -> file -> [mtime, size]).
pub const SNAPSHOTS_FILE: &str = "snapshots.json";

/// Operation log file.
pub const LOG_FILE: &str = "log.txt";

/// Central context for all foldwatch operations.
///
/// Holds the configuration file location, the loaded configuration and the
/// resolved state directory. Commands receive a context and build a
/// [`Monitor`] from it.
///
/// # Examples
///
/// ```no_run
/// use foldwatch::FoldwatchContext;
///
/// # fn main() -> anyhow::Result<()> {
/// // Context with default paths
/// let ctx = FoldwatchContext::new()?;
///
/// // Context with explicit paths (for testing)
/// let ctx = FoldwatchContext::new_explicit(
///     "/tmp/fw_state".into(),
///     "/tmp/fw_config.toml".into(),
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FoldwatchContext {
    /// Directory holding the persisted stores and the operation log.
    pub state_dir: PathBuf,

    /// Path to the configuration file.
    pub config_path: PathBuf,

    /// Loaded configuration settings.
    pub config: config::Config,
}

impl FoldwatchContext {
    /// Creates a new context by loading the configuration from the default path.
    ///
    /// `FOLDWATCH_CONFIG_PATH` overrides the config location and
    /// `FOLDWATCH_STATE_DIR` overrides the configured state directory.
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined or if the
    /// configuration file cannot be read, created or validated.
    pub fn new() -> Result<Self> {
        let config_path = if let Ok(path) = std::env::var("FOLDWATCH_CONFIG_PATH") {
            PathBuf::from(path)
        } else {
            let home = dirs::home_dir().context("Could not find home directory")?;
            home.join(DEFAULT_CONFIG_PATH)
        };

        let config = config::Config::load(&config_path)?;

        let state_dir = if let Ok(path) = std::env::var("FOLDWATCH_STATE_DIR") {
            PathBuf::from(path)
        } else {
            utils::expand_tilde(&config.core.state_dir)?
        };

        Ok(Self {
            state_dir,
            config_path,
            config,
        })
    }

    /// Creates a context with explicit paths, bypassing environment lookups.
    ///
    /// A missing config file is created with defaults.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be loaded or created.
    pub fn new_explicit(state_dir: PathBuf, config_path: PathBuf) -> Result<Self> {
        let config = config::Config::load(&config_path)?;
        Ok(Self {
            state_dir,
            config_path,
            config,
        })
    }

    /// Ensures that the state directory exists.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn ensure_state_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.state_dir).with_context(|| {
            format!(
                "Failed to create state directory: {}",
                self.state_dir.display()
            )
        })
    }

    /// Builds a [`Monitor`] over this context's state directory.
    ///
    /// # Errors
    /// Returns an error if the state directory cannot be created or the
    /// worker pool cannot be started.
    pub fn open_monitor(&self) -> Result<Monitor> {
        self.ensure_state_dir()?;
        Monitor::builder(self.state_dir.clone())
            .worker_threads(self.config.performance.parallel_threads)
            .follow_symlinks(self.config.scan.follow_symlinks)
            .build()
    }
}
