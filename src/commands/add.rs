use crate::FoldwatchContext;
use crate::interval::{label, parse_interval};
use crate::output;
use anyhow::Result;
use std::path::Path;

pub fn execute(ctx: &FoldwatchContext, path: &Path, interval: &str) -> Result<()> {
    let seconds = parse_interval(interval)?;
    let monitor = ctx.open_monitor()?;

    let handle = monitor.add_folder(path, seconds)?;
    output::action(
        "Watching",
        &format!("{} every {}", handle.folder(), label(seconds)),
    );

    super::print_reports(&[handle.wait()])
}
