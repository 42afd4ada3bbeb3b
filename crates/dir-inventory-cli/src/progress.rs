use dir_inventory_core::{Progress, ProgressReporter};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// CLI progress reporter using one indicatif spinner for the whole pipeline.
///
/// - Traversal: file count as files are found
/// - Later phases: status text with percentage
/// - Catalog writes: running count of committed rows
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
    rows_written: AtomicUsize,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
            rows_written: AtomicUsize::new(0),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        let Ok(mut guard) = self.bar.lock() else {
            return;
        };
        let pb = guard.get_or_insert_with(spinner);
        f(pb);
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

impl ProgressReporter for CliReporter {
    fn on_status(&self, status: &str, progress: Progress) {
        let message = match progress {
            Progress::Indeterminate => status.to_string(),
            Progress::Percent(p) => format!("[{:>3.0}%] {}", p, status),
        };
        self.with_bar(|pb| pb.set_message(message));
    }

    fn on_scan_progress(&self, files_found: usize, _current_path: &str) {
        self.with_bar(|pb| pb.set_message(format!("Scanning... {} files found", files_found)));
    }

    fn on_batch_persisted(&self, table: &str, rows: usize) {
        let total = self.rows_written.fetch_add(rows, Ordering::Relaxed) + rows;
        self.with_bar(|pb| {
            pb.set_message(format!("Writing catalog... {} rows ({})", total, table))
        });
    }

    fn on_complete(&self, summary: &str) {
        self.finish_bar();
        eprintln!("  \x1b[32m✓\x1b[0m Scan complete: {}", summary);
    }
}
