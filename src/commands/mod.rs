pub mod add;
pub mod check;
pub mod interval;
pub mod list;
pub mod log;
pub mod remove;
pub mod snapshot;
pub mod watch;

use crate::diff::ChangeSummary;
use crate::monitor::{OperationOutcome, OperationReport};
use crate::output;
use anyhow::{Result, bail};
use colored::Colorize;

/// Print the result of one finished operation.
///
/// Returns true if the operation failed.
pub fn print_report(report: &OperationReport) -> bool {
    let folder = &report.folder;
    match &report.outcome {
        OperationOutcome::Checked { changes } if changes.is_empty() => {
            output::success(&format!("No changes in {folder}"));
        }
        OperationOutcome::Checked { changes } => {
            println!("{}", format!("Changes in {folder}:").bold());
            for change in changes {
                println!("  {}", output::change_line(change));
            }
            output::info(&ChangeSummary::of(changes).to_string());
        }
        OperationOutcome::Snapshotted { files } => {
            output::success(&format!("Snapshot updated for {folder} ({files} files)"));
        }
        OperationOutcome::Discarded => {
            output::warning(&format!(
                "{folder} was removed while its {} was running",
                report.kind
            ));
        }
        OperationOutcome::Failed(message) => {
            output::error(&format!("{} failed for {folder}: {message}", report.kind));
            return true;
        }
    }
    false
}

/// Print every report, failing if any operation failed.
///
/// # Errors
///
/// Returns an error naming the number of failed operations.
pub fn print_reports(reports: &[OperationReport]) -> Result<()> {
    let failed = reports
        .iter()
        .map(print_report)
        .filter(|failed| *failed)
        .count();

    if failed > 0 {
        bail!("{failed} of {} operation(s) failed", reports.len());
    }
    Ok(())
}
