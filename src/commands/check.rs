use crate::FoldwatchContext;
use crate::monitor::wait_all;
use crate::output;
use anyhow::Result;
use std::path::Path;

/// Check one folder, or every watched folder when `path` is `None`.
pub fn execute(ctx: &FoldwatchContext, path: Option<&Path>) -> Result<()> {
    let monitor = ctx.open_monitor()?;

    let handles = match path {
        Some(path) => vec![monitor.check_now(path)?],
        None => monitor.check_all(),
    };

    if handles.is_empty() {
        output::info("No folders are being watched");
        return Ok(());
    }

    output::verbose(&format!("Checking {} folder(s)", handles.len()));
    super::print_reports(&wait_all(handles))
}
