use crate::FoldwatchContext;
use crate::lock::StateLock;
use crate::monitor::{MonitorEvent, OperationKind, wait_all};
use crate::output;
use anyhow::{Result, bail};
use std::time::Duration;
use tracing::info;

/// Run the scheduler in the foreground until the process is interrupted.
///
/// With `once`, a single scheduling pass runs and its checks are awaited.
pub fn execute(ctx: &FoldwatchContext, tick: Option<u64>, once: bool) -> Result<()> {
    let period = tick.map_or_else(|| ctx.config.tick_period(), Duration::from_secs);
    if period.is_zero() {
        bail!("Tick period must be at least one second");
    }

    let _lock = StateLock::acquire(&ctx.state_dir)?;
    let monitor = ctx.open_monitor()?;

    if once {
        let handles = monitor.tick();
        if handles.is_empty() {
            output::info("No folders are due");
            return Ok(());
        }
        return super::print_reports(&wait_all(handles));
    }

    let events = monitor.subscribe();
    output::action(
        "Watching",
        &format!(
            "{} folder(s) in {}, scheduling every {}",
            monitor.folders().len(),
            ctx.state_dir.display(),
            humantime::format_duration(period)
        ),
    );
    info!(state_dir = %ctx.state_dir.display(), "Watch started");

    let _scheduler = monitor.spawn_scheduler(period)?;

    // The monitor keeps the sender alive, so this runs until interrupted
    for event in &events {
        match event {
            MonitorEvent::OperationStarted { folder, kind } => {
                output::verbose(&format!("Started {kind} of {folder}"));
            }
            MonitorEvent::OperationFinished {
                folder,
                kind: OperationKind::Check,
            } => {
                output::action("Checked", &format!("{folder}: {}", monitor.status(&folder)));
            }
            MonitorEvent::OperationFinished {
                folder,
                kind: OperationKind::Snapshot,
            } => {
                output::action("Snapshot", &folder);
            }
        }
    }

    Ok(())
}
