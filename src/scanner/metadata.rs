use crate::storage::{FileMeta, Snapshot};
use anyhow::{Result, bail};
use std::fmt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{Level, debug, span, warn};
use walkdir::WalkDir;

/// A file or directory that could not be read during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanWarning {
    /// Entry that failed, or the folder itself when walkdir reports no path
    pub path: PathBuf,
    /// Error text
    pub message: String,
}

impl fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error accessing {}: {}", self.path.display(), self.message)
    }
}

/// Result of scanning one folder.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Every readable regular file under the folder
    pub snapshot: Snapshot,
    /// Entries skipped because they could not be read
    pub warnings: Vec<ScanWarning>,
}

/// Walks a folder recursively and records `(mtime, size)` for every regular file.
///
/// Holds no mutable state, so one scanner can serve any number of
/// concurrent scans.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataScanner {
    /// Whether to descend into symlinked directories
    follow_symlinks: bool,
}

impl MetadataScanner {
    /// Create a scanner
    ///
    /// Symlinks to files are always recorded with their target's metadata;
    /// `follow_symlinks` additionally descends into symlinked directories.
    #[must_use]
    pub const fn new(follow_symlinks: bool) -> Self {
        Self { follow_symlinks }
    }

    /// Scan `folder` and return its snapshot plus any per-entry failures.
    ///
    /// Unreadable entries never abort the scan; they are reported in
    /// [`ScanReport::warnings`] and left out of the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error only if `folder` itself is missing or is not a
    /// directory.
    pub fn scan(&self, folder: &Path) -> Result<ScanReport> {
        let span = span!(Level::DEBUG, "scan", folder = %folder.display());
        let _guard = span.enter();

        match std::fs::metadata(folder) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => bail!("Not a directory: {}", folder.display()),
            Err(e) => bail!("Cannot access {}: {e}", folder.display()),
        }

        let mut report = ScanReport::default();

        for entry in WalkDir::new(folder).follow_links(self.follow_symlinks) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(folder).to_path_buf();
                    report.push_warning(path, e.to_string());
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }

            // Symlinks seen without following: stat the target
            let metadata = if file_type.is_symlink() {
                std::fs::metadata(entry.path())
            } else {
                entry.metadata().map_err(std::io::Error::from)
            };

            let metadata = match metadata {
                Ok(metadata) => metadata,
                Err(e) => {
                    report.push_warning(entry.path().to_path_buf(), e.to_string());
                    continue;
                }
            };

            if !metadata.is_file() {
                continue;
            }

            match file_meta(&metadata) {
                Ok(meta) => {
                    report
                        .snapshot
                        .insert(entry.path().to_string_lossy().into_owned(), meta);
                }
                Err(e) => report.push_warning(entry.path().to_path_buf(), e.to_string()),
            }
        }

        debug!(
            files = report.snapshot.len(),
            warnings = report.warnings.len(),
            "Scan complete"
        );
        Ok(report)
    }
}

impl ScanReport {
    /// Record a skipped entry.
    fn push_warning(&mut self, path: PathBuf, message: String) {
        warn!(path = %path.display(), error = %message, "Skipping unreadable entry");
        self.warnings.push(ScanWarning { path, message });
    }
}

/// Extract `(mtime, size)` from file metadata.
fn file_meta(metadata: &Metadata) -> std::io::Result<FileMeta> {
    let modified = metadata.modified()?;
    let mtime = match modified.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        // Pre-epoch timestamps
        Err(e) => -e.duration().as_secs_f64(),
    };
    Ok(FileMeta::new(mtime, metadata.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_recurses_and_skips_directories() -> Result<()> {
        let temp = TempDir::new()?;
        let root = temp.path();
        fs::write(root.join("top.txt"), "hello")?;
        fs::create_dir_all(root.join("a/b"))?;
        fs::write(root.join("a/b/deep.bin"), vec![0u8; 1024])?;
        fs::create_dir_all(root.join("empty"))?;

        let report = MetadataScanner::default().scan(root)?;

        assert!(report.warnings.is_empty());
        assert_eq!(report.snapshot.len(), 2);

        let top = root.join("top.txt").to_string_lossy().into_owned();
        let deep = root.join("a/b/deep.bin").to_string_lossy().into_owned();
        assert_eq!(report.snapshot[&top].size, 5);
        assert_eq!(report.snapshot[&deep].size, 1024);
        assert!(report.snapshot[&top].mtime > 0.0);
        Ok(())
    }

    #[test]
    fn test_scan_records_exact_mtime() -> Result<()> {
        let temp = TempDir::new()?;
        let file = temp.path().join("f.txt");
        fs::write(&file, "x")?;
        let expected = fs::metadata(&file)?
            .modified()?
            .duration_since(UNIX_EPOCH)?
            .as_secs_f64();

        let report = MetadataScanner::default().scan(temp.path())?;
        assert_eq!(
            report.snapshot[&file.to_string_lossy().into_owned()].mtime,
            expected
        );
        Ok(())
    }

    #[test]
    fn test_scan_missing_folder_fails() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        assert!(MetadataScanner::default().scan(&missing).is_err());
    }

    #[test]
    fn test_scan_file_instead_of_folder_fails() -> Result<()> {
        let temp = TempDir::new()?;
        let file = temp.path().join("plain.txt");
        fs::write(&file, "x")?;
        assert!(MetadataScanner::default().scan(&file).is_err());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_symlink_is_a_warning() -> Result<()> {
        let temp = TempDir::new()?;
        fs::write(temp.path().join("ok.txt"), "fine")?;
        std::os::unix::fs::symlink(temp.path().join("gone"), temp.path().join("dangling"))?;

        let report = MetadataScanner::default().scan(temp.path())?;

        assert_eq!(report.snapshot.len(), 1);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].path, temp.path().join("dangling"));
        assert!(
            report.warnings[0]
                .to_string()
                .starts_with("Error accessing ")
        );
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_file_uses_target_metadata() -> Result<()> {
        let temp = TempDir::new()?;
        let target = temp.path().join("target.txt");
        fs::write(&target, "twelve bytes")?;
        let link = temp.path().join("link.txt");
        std::os::unix::fs::symlink(&target, &link)?;

        let report = MetadataScanner::default().scan(temp.path())?;
        assert_eq!(report.snapshot[&link.to_string_lossy().into_owned()].size, 12);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_not_followed_by_default() -> Result<()> {
        let outside = TempDir::new()?;
        fs::write(outside.path().join("elsewhere.txt"), "x")?;

        let temp = TempDir::new()?;
        std::os::unix::fs::symlink(outside.path(), temp.path().join("linked"))?;

        let report = MetadataScanner::default().scan(temp.path())?;
        assert!(report.snapshot.is_empty());

        let report = MetadataScanner::new(true).scan(temp.path())?;
        assert_eq!(report.snapshot.len(), 1);
        Ok(())
    }
}
