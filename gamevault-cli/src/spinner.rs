//! Terminal progress for index passes.
//!
//! Shows a spinner while the library is walked, then switches to a bar once
//! the number of files is known.

use std::time::Duration;

use gamevault_index::{IndexProgress, IndexStats};
use indicatif::{ProgressBar, ProgressStyle};

use crate::commands::truncate_str;

pub(crate) struct ScanSpinner {
    bar: ProgressBar,
}

impl ScanSpinner {
    /// When `quiet` is true, nothing is drawn.
    pub(crate) fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        let style = ProgressStyle::with_template("  {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("/-\\|");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_message("Scanning library...");
        Self { bar }
    }
}

impl IndexProgress for ScanSpinner {
    fn on_scan_complete(&self, total: usize) {
        let style = ProgressStyle::with_template("  {bar:40.cyan/blue} {pos:>5}/{len:5} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        self.bar.set_style(style);
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_message("");
    }

    fn on_file(&self, current: usize, _total: usize, name: &str) {
        self.bar.set_position(current as u64);
        self.bar.set_message(truncate_str(name, 40));
    }

    fn on_error(&self, name: &str, error: &str) {
        self.bar.suspend(|| log::warn!("  {}: {}", name, error));
    }

    fn on_complete(&self, _stats: &IndexStats) {
        self.bar.finish_and_clear();
    }
}
