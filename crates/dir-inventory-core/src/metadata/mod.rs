pub mod content;
pub mod engine;
pub mod extensions;
pub mod tags;

pub use content::{FilePattern, PatternStat};
pub use engine::{EnrichedFile, MetadataEngine};
pub use extensions::{categorize, ExtensionCategory};
pub use tags::{size_bucket, FileTag, TagSet, TagSource};
