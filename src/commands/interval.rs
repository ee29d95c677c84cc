use crate::FoldwatchContext;
use crate::interval::{label, parse_interval};
use crate::output;
use anyhow::Result;
use std::path::Path;

pub fn execute(ctx: &FoldwatchContext, path: &Path, interval: &str) -> Result<()> {
    let seconds = parse_interval(interval)?;
    let monitor = ctx.open_monitor()?;

    monitor.update_interval(path, seconds)?;
    output::success(&format!(
        "{} is now checked every {}",
        path.display(),
        label(seconds)
    ));
    Ok(())
}
