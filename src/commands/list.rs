use crate::FoldwatchContext;
use crate::cli::SortKey;
use crate::interval::label;
use crate::monitor::{FolderInfo, FolderStatus};
use crate::output;
use crate::utils::format_epoch;
use anyhow::Result;
use colored::Colorize;

pub fn execute(ctx: &FoldwatchContext, sort: SortKey, filter: Option<&str>) -> Result<()> {
    let monitor = ctx.open_monitor()?;
    let mut folders = monitor.folders();

    if folders.is_empty() {
        output::info("No folders are being watched");
        return Ok(());
    }

    if let Some(filter) = filter {
        folders.retain(|folder| matches_filter(folder, filter));
    }
    sort_folders(&mut folders, sort);

    for folder in &folders {
        println!(
            "{} {}",
            output::status_badge(folder.status, folder.is_active),
            folder.path.bold()
        );
        println!(
            "    {} {} | {} {} | {} {}",
            "Interval:".dimmed(),
            label(folder.interval),
            "Last check:".dimmed(),
            format_epoch(folder.last_check),
            "Status:".dimmed(),
            folder.status
        );
    }

    output::verbose(&format!("{} folder(s) shown", folders.len()));
    Ok(())
}

/// Case-insensitive match against the path, interval label and last check.
fn matches_filter(folder: &FolderInfo, filter: &str) -> bool {
    let filter = filter.trim().to_lowercase();
    if filter.is_empty() {
        return true;
    }
    let text = format!(
        "{} {} {}",
        folder.path,
        label(folder.interval),
        format_epoch(folder.last_check)
    )
    .to_lowercase();
    text.contains(&filter)
}

/// Stable sort; ties keep path order.
fn sort_folders(folders: &mut [FolderInfo], sort: SortKey) {
    match sort {
        SortKey::Folder => folders.sort_by_cached_key(|f| f.path.to_lowercase()),
        SortKey::Interval => folders.sort_by_key(|f| f.interval),
        SortKey::LastChecked => folders.sort_by(|a, b| a.last_check.total_cmp(&b.last_check)),
        SortKey::Status => folders.sort_by_key(|f| f.status != FolderStatus::Ok),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(path: &str, interval: u64, last_check: f64, status: FolderStatus) -> FolderInfo {
        FolderInfo {
            path: path.to_string(),
            interval,
            last_check,
            status,
            is_active: false,
        }
    }

    fn paths(folders: &[FolderInfo]) -> Vec<&str> {
        folders.iter().map(|f| f.path.as_str()).collect()
    }

    fn sample() -> Vec<FolderInfo> {
        vec![
            info("/b/Photos", 60, 300.0, FolderStatus::Changed),
            info("/a/docs", 3600, 0.0, FolderStatus::Ok),
            info("/c/Music", 120, 100.0, FolderStatus::Unknown),
        ]
    }

    #[test]
    fn test_sort_orders() {
        let mut folders = sample();
        sort_folders(&mut folders, SortKey::Folder);
        assert_eq!(paths(&folders), vec!["/a/docs", "/b/Photos", "/c/Music"]);

        sort_folders(&mut folders, SortKey::Interval);
        assert_eq!(paths(&folders), vec!["/b/Photos", "/c/Music", "/a/docs"]);

        sort_folders(&mut folders, SortKey::LastChecked);
        assert_eq!(paths(&folders), vec!["/a/docs", "/c/Music", "/b/Photos"]);

        let mut folders = sample();
        sort_folders(&mut folders, SortKey::Status);
        assert_eq!(paths(&folders), vec!["/a/docs", "/b/Photos", "/c/Music"]);
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let folders = sample();
        assert!(matches_filter(&folders[0], "photos"));
        assert!(matches_filter(&folders[1], "1 HOURS"));
        assert!(matches_filter(&folders[1], "never"));
        assert!(!matches_filter(&folders[2], "photos"));
        assert!(matches_filter(&folders[2], "  "));
    }
}
