#![allow(dead_code)]

use anyhow::Result;
use foldwatch::Monitor;
use foldwatch::monitor::ManualClock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Virtual start time for scheduling tests.
pub const START: f64 = 1_700_000_000.0;

/// Monitor over a private state directory with a manual clock.
pub struct TestMonitor {
    pub state: TempDir,
    pub data: TempDir,
    pub clock: Arc<ManualClock>,
    pub monitor: Monitor,
}

impl TestMonitor {
    pub fn new() -> Result<Self> {
        let state = TempDir::new()?;
        let data = TempDir::new()?;
        let clock = Arc::new(ManualClock::new(START));
        let monitor = Monitor::builder(state.path())
            .worker_threads(4)
            .clock(clock.clone())
            .build()?;

        Ok(Self {
            state,
            data,
            clock,
            monitor,
        })
    }

    /// Reopen the same state directory, as after a restart.
    pub fn reopen(&self) -> Result<Monitor> {
        Monitor::builder(self.state.path())
            .worker_threads(2)
            .clock(self.clock.clone())
            .build()
    }

    /// Create a directory under the data dir and return its canonical path.
    pub fn folder(&self, name: &str) -> Result<PathBuf> {
        let path = self.data.path().join(name);
        std::fs::create_dir_all(&path)?;
        Ok(std::fs::canonicalize(path)?)
    }

    pub fn state_file(&self, name: &str) -> PathBuf {
        self.state.path().join(name)
    }
}

/// Stored key of a folder path.
pub fn key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Populate `dir` with `count` small files spread over a few subdirectories.
pub fn populate(dir: &Path, count: usize) -> Result<()> {
    for i in 0..count {
        let sub = dir.join(format!("d{}", i % 4));
        std::fs::create_dir_all(&sub)?;
        std::fs::write(sub.join(format!("f{i}.txt")), format!("content {i}"))?;
    }
    Ok(())
}
