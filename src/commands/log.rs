use crate::FoldwatchContext;
use crate::oplog::LogEntry;
use crate::output;
use anyhow::Result;
use colored::Colorize;
use std::path::Path;

/// Show the operation log, optionally limited to one folder, or clear it.
pub fn execute(ctx: &FoldwatchContext, path: Option<&Path>, clear: bool) -> Result<()> {
    let monitor = ctx.open_monitor()?;

    if clear {
        monitor.clear_log()?;
        output::success("Log cleared");
        return Ok(());
    }

    let entries = monitor.log_entries(path);
    if entries.is_empty() {
        match path {
            Some(path) => output::info(&format!("No log entries for {}", path.display())),
            None => output::info("Log is empty"),
        }
        return Ok(());
    }

    for entry in &entries {
        print_entry(entry);
    }
    Ok(())
}

fn print_entry(entry: &LogEntry) {
    let timestamp = entry.timestamp();
    if timestamp.is_empty() {
        println!("{}", entry.message());
    } else {
        println!("{} {}", format!("[{timestamp}]").dimmed(), entry.message());
    }

    for detail in entry.details() {
        let styled = if detail.starts_with("NEW:") {
            detail.green()
        } else if detail.starts_with("MODIFIED:") {
            detail.yellow()
        } else if detail.starts_with("DELETED:") {
            detail.red()
        } else {
            detail.normal()
        };
        println!("  {styled}");
    }
}
