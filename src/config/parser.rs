use super::Config;
use anyhow::{Context, Result, bail};
use std::path::Path;

/// Levels accepted by `log.level`
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Read, parse and validate a configuration file
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid TOML, or holds
/// invalid values
pub fn parse_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config_str(&content)
        .with_context(|| format!("Invalid config file: {}", path.display()))
}

/// Parse and validate configuration text
///
/// # Errors
///
/// Returns an error if the text is not valid TOML or holds invalid values
pub fn parse_config_str(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse TOML config")?;
    validate_config(&config)?;
    Ok(config)
}

/// Reject values the monitor cannot run with
///
/// # Errors
///
/// Returns an error describing the first invalid value
pub fn validate_config(config: &Config) -> Result<()> {
    if config.core.state_dir.trim().is_empty() {
        bail!("core.state_dir cannot be empty");
    }

    if config.scheduler.tick_seconds == 0 {
        bail!("scheduler.tick_seconds must be at least 1");
    }

    if config.performance.parallel_threads == 0 {
        bail!("performance.parallel_threads must be at least 1");
    }

    let level = config.log.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        bail!(
            "log.level must be one of {}, got '{}'",
            LOG_LEVELS.join(", "),
            config.log.level
        );
    }

    Ok(())
}
