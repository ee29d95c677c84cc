/// Recursive metadata scan producing folder snapshots.
pub mod metadata;

pub use metadata::{MetadataScanner, ScanReport, ScanWarning};
