//! Exclusive lock on a state directory
//!
//! Only one scheduler daemon may drive a state directory at a time. One-shot
//! commands do not take the lock: every store re-reads its file before it
//! mutates and saves before the mutation completes, so they can run beside a
//! daemon. The lock is released when the guard is dropped.

use anyhow::{Context, Result, bail};
use fs4::fs_std::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

/// Name of the lock file inside the state directory
pub const LOCK_FILE: &str = "watch.lock";

/// Holds the exclusive lock on a state directory
#[derive(Debug)]
pub struct StateLock {
    /// Lock file handle
    lock_file: File,
    /// Path to the lock file (for error messages)
    lock_path: PathBuf,
}

impl StateLock {
    /// Take the lock on `state_dir` without waiting
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The state directory or lock file cannot be created
    /// - Another process already holds the lock
    pub fn acquire(state_dir: &Path) -> Result<Self> {
        fs::create_dir_all(state_dir).with_context(|| {
            format!("Failed to create state directory: {}", state_dir.display())
        })?;
        let lock_path = state_dir.join(LOCK_FILE);

        // No truncation before the lock is ours: the file names the holder
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to create lock file: {}", lock_path.display()))?;

        match file.try_lock_exclusive() {
            Ok(true) => {}
            Ok(false) | Err(_) => {
                let mut holder = String::new();
                let _ = file.read_to_string(&mut holder);
                let holder = holder.lines().collect::<Vec<_>>().join(", ");
                bail!(
                    "Another foldwatch daemon is already watching {} ({}). \
                     Stop it first or remove a stale lock at: {}",
                    state_dir.display(),
                    if holder.is_empty() { "holder unknown" } else { &holder },
                    lock_path.display()
                );
            }
        }

        file.set_len(0)?;
        writeln!(
            file,
            "pid={}\ntime={}",
            std::process::id(),
            humantime::format_rfc3339(SystemTime::now())
        )
        .with_context(|| format!("Failed to write lock file: {}", lock_path.display()))?;

        debug!(path = %lock_path.display(), "State lock acquired");
        Ok(Self {
            lock_file: file,
            lock_path,
        })
    }

    /// Path of the lock file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.lock_path
    }

    /// Release the lock explicitly (normally handled by Drop)
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be unlocked
    pub fn release(self) -> Result<()> {
        self.lock_file.unlock()?;
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        let _ = self.lock_file.unlock();

        if let Err(e) = fs::remove_file(&self.lock_path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(
                path = %self.lock_path.display(),
                error = %e,
                "Failed to remove lock file"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_and_release() {
        let temp = TempDir::new().unwrap();
        let lock = StateLock::acquire(temp.path()).unwrap();
        assert!(lock.path().exists());

        let contents = fs::read_to_string(lock.path()).unwrap();
        assert!(contents.contains(&format!("pid={}", std::process::id())));

        lock.release().unwrap();
        assert!(!temp.path().join(LOCK_FILE).exists());
    }

    #[test]
    fn test_second_lock_fails() {
        let temp = TempDir::new().unwrap();
        let _lock1 = StateLock::acquire(temp.path()).unwrap();

        let err = StateLock::acquire(temp.path()).unwrap_err();
        assert!(err.to_string().contains("already watching"));
        assert!(err.to_string().contains("pid="));
    }

    #[test]
    fn test_relock_after_drop() {
        let temp = TempDir::new().unwrap();
        drop(StateLock::acquire(temp.path()).unwrap());
        assert!(StateLock::acquire(temp.path()).is_ok());
    }

    #[test]
    fn test_different_state_dirs_allowed() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let _lock1 = StateLock::acquire(a.path()).unwrap();
        assert!(StateLock::acquire(b.path()).is_ok());
    }
}
