use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

/// Knows which configuration fields foldwatch reads
pub struct ConfigValidator {
    /// Recognised `section.key` paths
    known_fields: HashSet<&'static str>,
}

impl ConfigValidator {
    /// Create a new validator with known configuration fields
    #[must_use]
    pub fn new() -> Self {
        let known_fields = [
            "core.state_dir",
            "scheduler.tick_seconds",
            "performance.parallel_threads",
            "scan.follow_symlinks",
            "log.level",
        ]
        .into_iter()
        .collect();

        Self { known_fields }
    }

    /// Fields in `content` that foldwatch ignores, as `section.key` paths
    ///
    /// Text that is not valid TOML yields no fields; parsing reports that.
    #[must_use]
    pub fn unknown_fields(&self, content: &str) -> Vec<String> {
        let Ok(parsed) = toml::from_str::<toml::Value>(content) else {
            return Vec::new();
        };

        let mut unknown = Vec::new();
        self.check_table(&parsed, "", &mut unknown);
        unknown
    }

    /// Warn about every unknown field in the file at `config_path`
    pub fn warn_unknown_fields(&self, config_path: &Path) {
        let Ok(content) = std::fs::read_to_string(config_path) else {
            return;
        };

        for field in self.unknown_fields(&content) {
            warn!(
                field,
                path = %config_path.display(),
                "Unknown configuration field has no effect"
            );
        }
    }

    /// Recursively collect leaf paths that are not known fields
    fn check_table(&self, table: &toml::Value, prefix: &str, unknown: &mut Vec<String>) {
        let toml::Value::Table(map) = table else {
            return;
        };

        for (key, value) in map {
            let full_key = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };

            if let toml::Value::Table(_) = value {
                self.check_table(value, &full_key, unknown);
            } else if !self.known_fields.contains(full_key.as_str()) {
                unknown.push(full_key);
            }
        }
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}
