//! Command-line interface definitions for foldwatch.
//!
//! This module contains all CLI argument parsing structures using clap's derive macros.
//! The CLI definitions are shared between the main binary and build tools (like xtask)
//! for man page generation.
//!
//! Note: Field-level documentation is provided via clap attributes (#[arg(help = "...")]),
//! so we allow missing_docs for this module to avoid redundant documentation.

#![allow(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// Main CLI structure for foldwatch.
#[derive(Parser)]
#[command(
    name = "foldwatch",
    version = crate::VERSION,
    about = "Poll-based folder monitor",
    long_about = "Watches folders on independent schedules, snapshots file metadata \
                  (modification time and size) and reports new, modified and deleted files"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress informational messages
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// All available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Start watching a folder and take its first snapshot
    Add {
        /// Folder to watch
        path: PathBuf,

        /// Polling interval, e.g. 45m, 1h30m, 2d
        interval: String,
    },

    /// Stop watching a folder
    Remove {
        /// Watched folder
        path: PathBuf,
    },

    /// Change the polling interval of a watched folder
    Interval {
        /// Watched folder
        path: PathBuf,

        /// New polling interval, e.g. 45m, 1h30m, 2d
        interval: String,
    },

    /// Compare folders against their snapshots now
    Check {
        /// Folder to check (all watched folders if omitted)
        path: Option<PathBuf>,
    },

    /// Replace the snapshot of every watched folder
    Snapshot,

    /// List watched folders
    List {
        /// Sort order
        #[arg(short, long, value_enum, default_value_t = SortKey::Folder)]
        sort: SortKey,

        /// Only show folders whose path, interval or last check contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Show the operation log
    Log {
        /// Only entries mentioning this folder
        path: Option<PathBuf>,

        /// Empty the log instead of showing it
        #[arg(long, conflicts_with = "path")]
        clear: bool,
    },

    /// Run the scheduler in the foreground
    Watch {
        /// Seconds between scheduling passes (overrides scheduler.tick_seconds)
        #[arg(short, long, env = "FOLDWATCH_TICK_SECONDS")]
        tick: Option<u64>,

        /// Run one scheduling pass, wait for its checks and exit
        #[arg(long)]
        once: bool,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Sort orders for `list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortKey {
    /// Folder path, case-insensitive
    Folder,
    /// Polling interval, shortest first
    Interval,
    /// Last check, oldest first
    LastChecked,
    /// Unchanged folders first
    Status,
}
