//! Durable, human-readable operation log.
//!
//! The log is a plain text file. Each record starts with a timestamped header
//! line (`[2024-05-01 12:00:00] message`) and may be followed by indented
//! detail lines. For every folder the log keeps at most one snapshot record
//! and one check record: writing a new record of either kind for a folder
//! drops the previous record of that kind for that folder, details included.

use crate::utils::atomic_write;
use anyhow::{Context, Result};
use chrono::Local;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Indentation written in front of detail lines.
const DETAIL_INDENT: &str = "  ";

/// Kinds of records that are kept only once per folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Baseline capture of a folder
    Snapshot,
    /// Comparison of a folder against its baseline
    Check,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Snapshot => write!(f, "snapshot"),
            Self::Check => write!(f, "check"),
        }
    }
}

/// Header text for a completed snapshot.
#[must_use]
pub fn snapshot_message(folder: &str) -> String {
    format!("Snapshot updated for {folder}")
}

/// Header text for a check that found changes; details list them.
#[must_use]
pub fn changes_message(folder: &str) -> String {
    format!("Changes in {folder}:")
}

/// Header text for a check that found nothing.
#[must_use]
pub fn no_changes_message(folder: &str) -> String {
    format!("No changes in {folder}")
}

/// Header text for a task that failed.
#[must_use]
pub fn failure_message(kind: EntryKind, folder: &str, error: &str) -> String {
    match kind {
        EntryKind::Snapshot => format!("Snapshot failed for {folder}: {error}"),
        EntryKind::Check => format!("Check failed for {folder}: {error}"),
    }
}

/// One record of the log: a header line plus its detail lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Header line exactly as stored, including the bracketed timestamp
    header: String,
    /// Detail lines exactly as stored
    details: Vec<String>,
}

impl LogEntry {
    /// Build a new record stamped with the current local time.
    fn stamped(message: &str, details: &[String]) -> Self {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        Self {
            header: format!("[{timestamp}] {message}"),
            details: details
                .iter()
                .map(|line| format!("{DETAIL_INDENT}{line}"))
                .collect(),
        }
    }

    /// Timestamp text between the brackets, empty if the header has none.
    #[must_use]
    pub fn timestamp(&self) -> &str {
        self.header
            .strip_prefix('[')
            .and_then(|rest| rest.split_once(']'))
            .map_or("", |(ts, _)| ts)
    }

    /// Header text after the timestamp.
    #[must_use]
    pub fn message(&self) -> &str {
        self.header
            .strip_prefix('[')
            .and_then(|rest| rest.split_once(']'))
            .map_or(self.header.as_str(), |(_, msg)| msg.trim_start())
    }

    /// Detail lines without their indentation.
    #[must_use]
    pub fn details(&self) -> Vec<&str> {
        self.details
            .iter()
            .map(|line| line.strip_prefix(DETAIL_INDENT).unwrap_or(line))
            .collect()
    }

    /// Header line as stored in the file.
    #[must_use]
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Returns the kind of this record, if it is a snapshot or check record.
    #[must_use]
    pub fn kind(&self) -> Option<EntryKind> {
        let message = self.message();
        if message.starts_with("Snapshot updated for ") || message.starts_with("Snapshot failed for ")
        {
            Some(EntryKind::Snapshot)
        } else if message.starts_with("Changes in ")
            || message.starts_with("No changes in ")
            || message.starts_with("Check failed for ")
        {
            Some(EntryKind::Check)
        } else {
            None
        }
    }

    /// Returns true if this is a `kind` record for exactly `folder`.
    #[must_use]
    pub fn is_record_of(&self, folder: &str, kind: EntryKind) -> bool {
        let message = self.message();
        match kind {
            EntryKind::Snapshot => {
                message == snapshot_message(folder)
                    || message.starts_with(&format!("Snapshot failed for {folder}: "))
            }
            EntryKind::Check => {
                message == changes_message(folder)
                    || message == no_changes_message(folder)
                    || message.starts_with(&format!("Check failed for {folder}: "))
            }
        }
    }

    /// Returns true if the header names `folder` or a path inside it.
    ///
    /// `/data/a` is mentioned by `/data/a`, `/data/a:` and `/data/a/x.txt`
    /// but not by `/data/ab`.
    #[must_use]
    pub fn mentions(&self, folder: &str) -> bool {
        if folder.is_empty() {
            return false;
        }
        let message = self.message();
        message.match_indices(folder).any(|(idx, _)| {
            let rest = &message[idx + folder.len()..];
            rest.chars()
                .next()
                .is_none_or(|c| c == '/' || c == ':' || c.is_whitespace())
        })
    }

    /// Append the stored lines to `out`.
    fn write_to(&self, out: &mut String) {
        out.push_str(&self.header);
        out.push('\n');
        for line in &self.details {
            out.push_str(line);
            out.push('\n');
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_to(&mut out);
        f.write_str(out.trim_end_matches('\n'))
    }
}

/// Split log text into records.
///
/// Lines starting with `[` open a record; any other non-blank line belongs
/// to the record above it. Lines before the first record are dropped.
fn parse(text: &str) -> Vec<LogEntry> {
    let mut entries: Vec<LogEntry> = Vec::new();
    let mut orphans = 0usize;

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with('[') {
            entries.push(LogEntry {
                header: line.to_string(),
                details: Vec::new(),
            });
        } else if let Some(last) = entries.last_mut() {
            last.details.push(line.to_string());
        } else {
            orphans += 1;
        }
    }

    if orphans > 0 {
        warn!(lines = orphans, "Dropping log lines that precede the first record");
    }
    entries
}

/// File-backed operation log.
///
/// Every write re-reads the file, so external edits and truncation are
/// respected. The type performs no locking of its own; concurrent writers
/// must serialize access (the monitor keeps it behind a mutex).
#[derive(Debug, Clone)]
pub struct OperationLog {
    /// Log file
    path: PathBuf,
}

impl OperationLog {
    /// Create a log writing to `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Location of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records in file order.
    ///
    /// A missing or unreadable file reads as an empty log.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        match std::fs::read(&self.path) {
            Ok(bytes) => parse(&String::from_utf8_lossy(&bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read operation log");
                Vec::new()
            }
        }
    }

    /// Append a record. With a `(folder, kind)` subject, the previous record
    /// of that kind for that folder is removed first.
    ///
    /// # Errors
    ///
    /// Returns an error if the log file cannot be rewritten.
    pub fn record(&self, message: &str, subject: Option<(&str, EntryKind)>) -> Result<()> {
        self.record_with_details(message, subject, &[])
    }

    /// Append a record together with its detail lines in a single rewrite.
    ///
    /// # Errors
    ///
    /// Returns an error if the log file cannot be rewritten.
    pub fn record_with_details(
        &self,
        message: &str,
        subject: Option<(&str, EntryKind)>,
        details: &[String],
    ) -> Result<()> {
        self.rewrite(subject, vec![LogEntry::stamped(message, details)])
    }

    /// Append one plain record per message, all in a single rewrite.
    ///
    /// # Errors
    ///
    /// Returns an error if the log file cannot be rewritten.
    pub fn record_many(&self, messages: &[String]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }
        let stamped = messages
            .iter()
            .map(|message| LogEntry::stamped(message, &[]))
            .collect();
        self.rewrite(None, stamped)
    }

    /// Drop the subject's previous record, append `new_entries`, and replace
    /// the file.
    fn rewrite(&self, subject: Option<(&str, EntryKind)>, new_entries: Vec<LogEntry>) -> Result<()> {
        let mut entries = self.entries();

        if let Some((folder, kind)) = subject {
            let before = entries.len();
            entries.retain(|entry| !entry.is_record_of(folder, kind));
            if entries.len() != before {
                debug!(folder, %kind, "Replacing previous log record");
            }
        }

        entries.extend(new_entries);

        let mut out = String::new();
        for entry in &entries {
            entry.write_to(&mut out);
        }
        atomic_write(&self.path, out.as_bytes())
            .with_context(|| format!("Failed to write operation log {}", self.path.display()))
    }

    /// Append an untimestamped detail line to the most recent record.
    ///
    /// # Errors
    ///
    /// Returns an error if the log file cannot be opened or written.
    pub fn record_detail(&self, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open operation log {}", self.path.display()))?;
        writeln!(file, "{DETAIL_INDENT}{line}")?;
        file.flush()?;
        Ok(())
    }

    /// Remove every record.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be truncated.
    pub fn clear(&self) -> Result<()> {
        atomic_write(&self.path, b"")
            .with_context(|| format!("Failed to clear operation log {}", self.path.display()))
    }

    /// Records mentioning `folder`, in file order, with their details.
    #[must_use]
    pub fn query(&self, folder: &str) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.mentions(folder))
            .collect()
    }
}
