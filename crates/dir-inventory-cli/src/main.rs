mod commands;
mod logging;
mod progress;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, TagAction};
use dir_inventory_core::storage::{
    DirectoryTreeNode, MetadataCatalog, PlainCatalog, StatsStore, Store,
};
use dir_inventory_core::{AppConfig, ScanEngine};
use dotenv::dotenv;
use progress::CliReporter;
use std::path::Path;
use tracing::info;

fn main() -> Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let mut config = dir_inventory_core::config::load_configuration()
        .context("Error loading configuration")?;

    let args = Cli::parse();

    match args.command {
        Some(Commands::Scan {
            path,
            hidden,
            follow_symlinks,
            ignore,
        }) => {
            config.scan.include_hidden |= hidden;
            config.scan.follow_symlinks |= follow_symlinks;
            config.scan.ignore_patterns.extend(ignore);
            run_scan(config, &path)?;
        }
        Some(Commands::Scans) => list_scans(&config)?,
        Some(Commands::Show { scan_id }) => show_scan(&config, scan_id)?,
        Some(Commands::Files {
            catalog_id,
            pattern,
        }) => list_files(&config, catalog_id, pattern.as_deref())?,
        Some(Commands::Tree { catalog_id }) => {
            let tree = PlainCatalog::new(&config.catalog_db_path).get_directory_tree(catalog_id)?;
            for node in &tree {
                print_tree(node, 0);
            }
        }
        Some(Commands::Tag { action }) => edit_tags(&config, action)?,
        Some(Commands::Backup { dest_dir }) => backup_databases(&config, &dest_dir)?,
        Some(Commands::Vacuum) => {
            StatsStore::new(&config.stats_db_path).vacuum()?;
            PlainCatalog::new(&config.catalog_db_path).vacuum()?;
            MetadataCatalog::new(&config.metadata_db_path).vacuum()?;
            println!("Vacuumed stats, catalog and metadata databases");
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn run_scan(config: AppConfig, path: &Path) -> Result<()> {
    let mut engine = ScanEngine::new(config);
    let reporter = CliReporter::new();
    let report = engine
        .scan(path, &reporter)
        .with_context(|| format!("Scan of {} failed", path.display()))?;

    println!();
    info!(
        "Scan: {}, Analysis: {}, DB: {}",
        format!("{:.2}s", report.scan_duration.as_secs_f64()).green(),
        format!("{:.2}s", report.analysis_duration.as_secs_f64()).green(),
        format!("{:.2}s", report.db_write_duration.as_secs_f64()).green(),
    );
    info!(
        "Scan {} / catalog {} / metadata catalog {}: {} files, {} bytes, status {}",
        format!("{}", report.scan_id).cyan(),
        format!("{}", report.catalog_id).cyan(),
        format!("{}", report.metadata_catalog_id).cyan(),
        report.total_files,
        report.total_size,
        report.status,
    );
    if report.warnings > 0 {
        info!(
            "{} entries skipped, {} of them access denied",
            format!("{}", report.warnings).yellow(),
            format!("{}", report.access_denied).yellow(),
        );
    }
    for stat in &report.top_patterns {
        info!("Pattern {}: {} matches", stat.name, stat.match_count);
    }

    Ok(())
}

fn list_scans(config: &AppConfig) -> Result<()> {
    for scan in StatsStore::new(&config.stats_db_path).list_scans()? {
        println!(
            "{:>5}  {}  {:<10}  {:>8} files  {:>12} bytes  {}",
            scan.id,
            scan.scan_date,
            scan.status.to_string(),
            scan.total_files,
            scan.total_size_bytes,
            scan.root_path
        );
    }
    Ok(())
}

fn show_scan(config: &AppConfig, scan_id: i64) -> Result<()> {
    let details = StatsStore::new(&config.stats_db_path).get_scan_details(scan_id)?;
    let summary = &details.summary;
    println!(
        "{} ({}, {})",
        summary.root_path.bold(),
        summary.scan_date,
        summary.status
    );
    println!(
        "{} files, {} bytes",
        summary.total_files, summary.total_size_bytes
    );
    for ext in &details.extensions {
        println!(
            "  {:<16} {:>8} files ({:>5.1}%)  {:>12} bytes ({:>5.1}%)",
            ext.extension, ext.count, ext.file_percentage, ext.total_size_bytes, ext.size_percentage
        );
    }
    Ok(())
}

fn list_files(config: &AppConfig, catalog_id: i64, pattern: Option<&str>) -> Result<()> {
    let files = PlainCatalog::new(&config.catalog_db_path).get_catalog_files(catalog_id, pattern)?;
    for file in &files {
        println!("{:>12}  {}", file.size_bytes, file.relative_path);
    }
    println!("{} files", files.len());
    Ok(())
}

fn print_tree(node: &DirectoryTreeNode, indent: usize) {
    let name = Path::new(&node.directory.relative_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| node.directory.relative_path.clone());
    println!(
        "{}{}/ ({} files)",
        "  ".repeat(indent),
        name.blue(),
        node.file_count
    );
    for child in &node.children {
        print_tree(child, indent + 1);
    }
}

fn edit_tags(config: &AppConfig, action: TagAction) -> Result<()> {
    let store = MetadataCatalog::new(&config.metadata_db_path);
    match action {
        TagAction::Add {
            catalog_id,
            relative_path,
            tag,
        } => {
            if store.add_user_tag(catalog_id, &relative_path, &tag)? {
                println!("Tagged {} with {}", relative_path, tag.green());
            } else {
                println!("{} already has user tag {}", relative_path, tag);
            }
        }
        TagAction::Remove {
            catalog_id,
            relative_path,
            tag,
        } => {
            let removed = store.remove_tag(catalog_id, &relative_path, &tag)?;
            println!("Removed {} tag(s) {} from {}", removed, tag.red(), relative_path);
        }
    }
    Ok(())
}

fn backup_databases(config: &AppConfig, dest_dir: &Path) -> Result<()> {
    backup_store(&StatsStore::new(&config.stats_db_path), dest_dir)?;
    backup_store(&PlainCatalog::new(&config.catalog_db_path), dest_dir)?;
    backup_store(&MetadataCatalog::new(&config.metadata_db_path), dest_dir)
}

fn backup_store<S: Store>(store: &S, dest_dir: &Path) -> Result<()> {
    let source = store.db_path();
    let name = source
        .file_name()
        .with_context(|| format!("{} has no file name", source.display()))?;
    let dest = dest_dir.join(name);
    store
        .backup(&dest)
        .with_context(|| format!("Backup of {} failed", source.display()))?;
    println!("{} -> {}", source.display(), dest.display().to_string().green());
    Ok(())
}
