//! Terminal output for the foldwatch CLI.
//!
//! Messages go to stderr so that listings and logs on stdout stay easy to
//! pipe. Three verbosity levels are supported (quiet, normal, verbose).

use crate::diff::ChangeRecord;
use crate::monitor::FolderStatus;
use colored::{ColoredString, Colorize};
use std::sync::atomic::{AtomicU8, Ordering};

/// Verbosity level for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Only warnings and errors.
    Quiet = 0,
    /// Default level.
    Normal = 1,
    /// Also show per-folder detail.
    Verbose = 2,
}

impl Verbosity {
    /// Level selected by the global `--quiet` / `--verbose` flags.
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }
}

/// Global verbosity setting (default: Normal).
static VERBOSITY: AtomicU8 = AtomicU8::new(1);

/// Sets the global verbosity level for all output functions.
pub fn set_verbosity(level: Verbosity) {
    VERBOSITY.store(level as u8, Ordering::Relaxed);
}

/// Gets the current global verbosity level.
pub fn get_verbosity() -> Verbosity {
    match VERBOSITY.load(Ordering::Relaxed) {
        0 => Verbosity::Quiet,
        2 => Verbosity::Verbose,
        _ => Verbosity::Normal,
    }
}

/// Prints a success message in green (respects quiet mode).
pub fn success(message: &str) {
    if get_verbosity() == Verbosity::Quiet {
        return;
    }
    eprintln!("{}", message.green());
}

/// Prints an error message in bold red (always shown).
pub fn error(message: &str) {
    eprintln!("{}", message.red().bold());
}

/// Prints a warning message in bold yellow (always shown).
pub fn warning(message: &str) {
    eprintln!("{}", message.yellow().bold());
}

/// Prints an informational message in dimmed color (respects quiet mode).
pub fn info(message: &str) {
    if get_verbosity() == Verbosity::Quiet {
        return;
    }
    eprintln!("{}", message.dimmed());
}

/// Prints a verbose message (only in verbose mode).
pub fn verbose(message: &str) {
    if get_verbosity() != Verbosity::Verbose {
        return;
    }
    eprintln!("{}", message.dimmed());
}

/// Prints an action line such as `Watching /srv/data`.
pub fn action(verb: &str, message: &str) {
    if get_verbosity() == Verbosity::Quiet {
        return;
    }
    eprintln!("{} {}", verb.dimmed().bold(), message);
}

/// Status symbol for a folder listing: a spinner while busy, otherwise a
/// check mark, cross or question mark.
#[must_use]
pub fn status_badge(status: FolderStatus, is_active: bool) -> ColoredString {
    if is_active {
        return "↻".blue();
    }
    match status {
        FolderStatus::Ok => "✔".green(),
        FolderStatus::Changed => "✘".red(),
        FolderStatus::Unknown => "?".dimmed(),
    }
}

/// One change rendered for the terminal.
#[must_use]
pub fn change_line(change: &ChangeRecord) -> String {
    let label = match change {
        ChangeRecord::New(_) => change.label().green(),
        ChangeRecord::Modified(_) => change.label().yellow(),
        ChangeRecord::Deleted(_) => change.label().red(),
    };
    format!("{label}: {}", change.path())
}
