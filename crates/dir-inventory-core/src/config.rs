use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options controlling which entries a scan keeps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Only stored alongside results; traversal is never cut short by it.
    pub max_depth: Option<usize>,
    pub follow_symlinks: bool,
    pub ignore_patterns: Vec<String>,
    pub include_hidden: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scan: ScanConfig,
    pub stats_db_path: String,
    pub catalog_db_path: String,
    pub metadata_db_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            stats_db_path: "scan_stats.db".to_string(),
            catalog_db_path: "file_catalog.db".to_string(),
            metadata_db_path: "file_catalog_metadata.db".to_string(),
        }
    }
}

/// Load `Config.{toml,yaml,json}` from the working directory (optional),
/// overridden by `DIR_INVENTORY__*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    build(ConfigFile::with_name("Config").required(false))
}

pub fn load_configuration_from(path: &Path) -> Result<AppConfig, ConfigError> {
    build(ConfigFile::from(path).required(true))
}

fn build<S>(file: S) -> Result<AppConfig, ConfigError>
where
    S: config::Source + Send + Sync + 'static,
{
    let builder = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix("DIR_INVENTORY")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("scan.ignore_patterns")
                .try_parsing(true),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}
