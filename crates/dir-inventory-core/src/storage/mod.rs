pub mod catalog;
pub mod metadata;
pub mod migrations;
pub mod models;
pub mod sqlite;
pub mod stats;

pub use catalog::{CatalogStore, MetadataCatalog, PlainCatalog, BATCH_SIZE};
pub use migrations::{CatalogSchema, MetadataSchema, Schema, StatsSchema};
pub use models::{
    CatalogDirectory, CatalogFile, DirectoryTreeNode, ExtensionBreakdown, FileMetadataRow,
    ScanDetails, ScanStatus, ScanSummary,
};
pub use sqlite::{Database, Store};
pub use stats::StatsStore;
