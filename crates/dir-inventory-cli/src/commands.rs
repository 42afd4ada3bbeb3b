use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "dir-inventory")]
#[command(about = "Inventory a directory tree into a queryable catalog", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory and record it in the catalogs
    Scan {
        path: PathBuf,
        /// Include hidden files and directories
        #[arg(long)]
        hidden: bool,
        /// Follow symbolic links
        #[arg(long)]
        follow_symlinks: bool,
        /// Glob of paths to skip (repeatable)
        #[arg(long = "ignore", value_name = "GLOB")]
        ignore: Vec<String>,
    },
    /// List recorded scans, newest first
    Scans,
    /// Show the extension breakdown of one scan
    Show { scan_id: i64 },
    /// List the files of one catalog
    Files {
        catalog_id: i64,
        /// Only files whose relative path contains this text
        #[arg(long)]
        pattern: Option<String>,
    },
    /// Print the directory tree of one catalog
    Tree { catalog_id: i64 },
    /// Edit user tags in the metadata catalog
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },
    /// Copy the stats, catalog and metadata databases into a directory
    Backup { dest_dir: PathBuf },
    /// Reclaim unused space in all three databases
    Vacuum,
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Subcommand)]
pub enum TagAction {
    /// Add a user tag to a file
    Add {
        catalog_id: i64,
        relative_path: String,
        tag: String,
    },
    /// Remove every tag with this name from a file
    Remove {
        catalog_id: i64,
        relative_path: String,
        tag: String,
    },
}
