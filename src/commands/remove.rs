use crate::FoldwatchContext;
use crate::output;
use anyhow::Result;
use std::path::Path;

pub fn execute(ctx: &FoldwatchContext, path: &Path) -> Result<()> {
    let monitor = ctx.open_monitor()?;

    if monitor.remove_folder(path) {
        output::action("Removed", &path.display().to_string());
    } else {
        output::warning(&format!("Not watching {}", path.display()));
    }
    Ok(())
}
