mod filter;
mod record;
mod walk;

pub use filter::{is_hidden_name, PathFilter, HIDDEN_MARKER};
pub use record::{DirectoryRecord, ExtensionStat, FileRecord, ScanResult, NO_EXTENSION};
pub use walk::{validate_root, ScanOutcome, Scanner};

#[cfg(test)]
pub(crate) use record::test_file;
