pub mod parser;
pub mod validator;

use crate::utils::atomic_write;
use crate::utils::thread_pool::default_threads;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub core: CoreConfig,

    /// Periodic dispatch settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub performance: PerformanceConfig,

    /// Folder scanning behaviour
    #[serde(default)]
    pub scan: ScanConfig,

    /// Diagnostic logging
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoreConfig {
    /// State directory; a leading `~` is expanded
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Seconds between scheduling passes
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PerformanceConfig {
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ScanConfig {
    /// Descend into symlinked directories
    #[serde(default)]
    pub follow_symlinks: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    /// Default `tracing` level when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_seconds: default_tick_seconds(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            parallel_threads: default_parallel_threads(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    ///
    /// A missing file is created with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Cannot create parent directories
    /// - Cannot read or parse the configuration file
    /// - Configuration file contains invalid TOML or invalid values
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }

        let config = parser::parse_config_file(path)?;
        validator::ConfigValidator::new().warn_unknown_fields(path);
        Ok(config)
    }

    /// Save configuration to a file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Cannot create parent directories
    /// - Cannot write to the file
    /// - TOML serialization fails
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        atomic_write(path, toml_str.as_bytes())
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Interval between scheduling passes
    #[must_use]
    pub const fn tick_period(&self) -> Duration {
        Duration::from_secs(self.scheduler.tick_seconds)
    }
}

// Default functions for serde
fn default_state_dir() -> String {
    format!("~/{}", crate::DEFAULT_STATE_DIR)
}

const fn default_tick_seconds() -> u64 {
    60
}

fn default_parallel_threads() -> usize {
    default_threads()
}

fn default_log_level() -> String {
    "warn".to_string()
}
