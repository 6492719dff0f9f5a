//! Index progress reporting.

use crate::index::IndexStats;

/// Receives progress updates from an index pass.
pub trait IndexProgress: Send + Sync {
    /// The scan finished and `total` files will be reconciled.
    fn on_scan_complete(&self, total: usize);

    /// Called after each file is reconciled.
    fn on_file(&self, current: usize, total: usize, name: &str);

    /// A file could not be reconciled.
    fn on_error(&self, name: &str, error: &str);

    fn on_complete(&self, stats: &IndexStats);
}

/// A no-op progress reporter that discards all updates.
pub struct SilentProgress;

impl IndexProgress for SilentProgress {
    fn on_scan_complete(&self, _total: usize) {}
    fn on_file(&self, _current: usize, _total: usize, _name: &str) {}
    fn on_error(&self, _name: &str, _error: &str) {}
    fn on_complete(&self, _stats: &IndexStats) {}
}

/// A progress reporter that logs to the `log` crate.
pub struct LogProgress;

impl IndexProgress for LogProgress {
    fn on_scan_complete(&self, total: usize) {
        log::info!("Found {} game file(s)", total);
    }

    fn on_file(&self, current: usize, total: usize, name: &str) {
        if current.is_multiple_of(100) || current == total {
            log::info!("  [{}/{}] {}", current, total, name);
        }
    }

    fn on_error(&self, name: &str, error: &str) {
        log::warn!("{}: {}", name, error);
    }

    fn on_complete(&self, stats: &IndexStats) {
        log::info!("{}", stats.summary());
    }
}
