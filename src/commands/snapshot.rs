use crate::FoldwatchContext;
use crate::monitor::wait_all;
use crate::output;
use anyhow::Result;

pub fn execute(ctx: &FoldwatchContext) -> Result<()> {
    let monitor = ctx.open_monitor()?;

    let handles = monitor.snapshot_all();
    if handles.is_empty() {
        output::info("No folders are being watched");
        return Ok(());
    }

    super::print_reports(&wait_all(handles))
}
