pub mod config;
pub mod engine;
pub mod error;
pub mod metadata;
pub mod patterns;
pub mod progress;
pub mod scanner;
pub mod storage;

pub use config::{AppConfig, ScanConfig};
pub use engine::{ScanEngine, ScanReport};
pub use error::{Error, Result, ScanWarning};
pub use progress::{ChannelReporter, PipelineEvent, Progress, ProgressReporter, SilentReporter};
pub use scanner::{DirectoryRecord, FileRecord, ScanOutcome, ScanResult, Scanner};
