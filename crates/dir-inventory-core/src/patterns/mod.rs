pub mod directory;
pub mod name;

pub use directory::{DirectoryAnalyzer, DirectoryGroup};
pub use name::{parse_name, ComponentKind, NameComponent, ParsedName};
