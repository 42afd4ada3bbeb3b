use crate::error::ScanWarning;
use std::sync::mpsc::Sender;
use std::sync::Mutex;

/// Completion of the current phase, when it can be known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    Indeterminate,
    Percent(f32),
}

/// Trait for reporting pipeline progress.
///
/// The CLI implements it with indicatif; `ChannelReporter` forwards everything
/// to a channel for callers running the pipeline on a worker thread.
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_status(&self, _status: &str, _progress: Progress) {}
    fn on_scan_progress(&self, _files_found: usize, _current_path: &str) {}
    fn on_warning(&self, _warning: &ScanWarning) {}
    /// A write batch of `rows` rows was committed to `table`.
    fn on_batch_persisted(&self, _table: &str, _rows: usize) {}
    fn on_complete(&self, _summary: &str) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Status { status: String, progress: Progress },
    FilesFound { count: usize, current_path: String },
    Warning(String),
    BatchPersisted { table: String, rows: usize },
    Complete(String),
}

/// Forwards every notification as a `PipelineEvent`. Send failures are
/// ignored so a dropped receiver never stops the pipeline.
pub struct ChannelReporter {
    sender: Mutex<Sender<PipelineEvent>>,
}

impl ChannelReporter {
    pub fn new(sender: Sender<PipelineEvent>) -> Self {
        Self {
            sender: Mutex::new(sender),
        }
    }

    fn send(&self, event: PipelineEvent) {
        if let Ok(sender) = self.sender.lock() {
            let _ = sender.send(event);
        }
    }
}

impl ProgressReporter for ChannelReporter {
    fn on_status(&self, status: &str, progress: Progress) {
        self.send(PipelineEvent::Status {
            status: status.to_string(),
            progress,
        });
    }

    fn on_scan_progress(&self, files_found: usize, current_path: &str) {
        self.send(PipelineEvent::FilesFound {
            count: files_found,
            current_path: current_path.to_string(),
        });
    }

    fn on_warning(&self, warning: &ScanWarning) {
        self.send(PipelineEvent::Warning(warning.to_string()));
    }

    fn on_batch_persisted(&self, table: &str, rows: usize) {
        self.send(PipelineEvent::BatchPersisted {
            table: table.to_string(),
            rows,
        });
    }

    fn on_complete(&self, summary: &str) {
        self.send(PipelineEvent::Complete(summary.to_string()));
    }
}
