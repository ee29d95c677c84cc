//! Utility functions and helpers.
//!
//! - Path manipulation (tilde expansion)
//! - Atomic file replacement
//! - Timestamp utilities
//!
//! # Submodules
//!
//! - [`thread_pool`]: Worker pool construction

/// Worker pool construction for check and snapshot tasks
pub mod thread_pool;

use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Expands a path starting with `~` to the user's home directory.
///
/// # Errors
///
/// Returns an error if the path is empty.
pub fn expand_tilde(path: &str) -> Result<PathBuf> {
    if path.is_empty() {
        anyhow::bail!("Path cannot be empty");
    }
    if path == "~"
        && let Some(home) = dirs::home_dir()
    {
        return Ok(home);
    }
    if path.starts_with("~/")
        && let Some(home) = dirs::home_dir()
    {
        return Ok(home.join(&path[2..]));
    }
    Ok(PathBuf::from(path))
}

/// Replaces `path` with `data` so readers never observe a partial write.
///
/// The data goes to a temporary file in the same directory which is then
/// renamed over the destination.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or the
/// temporary file cannot be written or renamed.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
    tmp.write_all(data)
        .with_context(|| format!("Failed to write temp file for {}", path.display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("Failed to sync temp file for {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    Ok(())
}

/// Returns the current time as fractional seconds since the Unix epoch.
#[must_use]
pub fn epoch_seconds() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Formats epoch seconds as local `YYYY-MM-DD HH:MM:SS`, or `never` for 0.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn format_epoch(seconds: f64) -> String {
    if seconds <= 0.0 {
        return "never".to_string();
    }
    Local
        .timestamp_opt(seconds.trunc() as i64, 0)
        .single()
        .map_or_else(
            || "never".to_string(),
            |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_expand_tilde_passthrough() -> Result<()> {
        assert_eq!(expand_tilde("/var/tmp")?, PathBuf::from("/var/tmp"));
        assert!(expand_tilde("").is_err());
        Ok(())
    }

    #[test]
    fn test_expand_tilde_home() -> Result<()> {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/notes")?, home.join("notes"));
            assert_eq!(expand_tilde("~")?, home);
        }
        Ok(())
    }

    #[test]
    fn test_atomic_write_replaces_contents() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("state.json");

        atomic_write(&path, b"first")?;
        atomic_write(&path, b"second")?;

        assert_eq!(std::fs::read_to_string(&path)?, "second");
        // No temp files left behind
        assert_eq!(std::fs::read_dir(path.parent().unwrap())?.count(), 1);
        Ok(())
    }

    #[test]
    fn test_format_epoch_never() {
        assert_eq!(format_epoch(0.0), "never");
        assert_eq!(format_epoch(-3.0), "never");
    }

    #[test]
    fn test_format_epoch_shape() {
        let formatted = format_epoch(1_700_000_000.5);
        assert_eq!(formatted.len(), 19);
        assert!(formatted.starts_with("2023-11-1"));
    }
}
