use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_DB_PATH: &str = "media_import_history.db";

/// Extensions accepted by the default media-type predicate.
pub const DEFAULT_MEDIA_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "heic", "heif", "tif", "tiff", "bmp", "dng", "cr2",
    "nef", "arw", "orf", "rw2", "mp4", "mov", "m4v", "avi", "mkv", "mts", "m2ts", "3gp", "wmv",
    "mpg", "mpeg",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Glob patterns; matching directories are pruned, matching files skipped.
    pub ignore_patterns: Vec<String>,
    /// Lower-case extensions (without the dot) treated as media.
    pub media_extensions: Vec<String>,
    pub recursive: bool,
    pub follow_links: bool,
    /// Size of the hashing pool. 0 lets rayon pick.
    pub hash_workers: usize,
    /// Candidates hashed together before being classified in order.
    pub batch_size: usize,
    pub history_db_path: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: Vec::new(),
            media_extensions: DEFAULT_MEDIA_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            recursive: true,
            follow_links: false,
            hash_workers: 0,
            batch_size: 64,
            history_db_path: DEFAULT_HISTORY_DB_PATH.to_string(),
        }
    }
}

/// Load configuration from an optional `Config.*` file, overridden by
/// `MEDIA_IMPORT_*` environment variables.
pub fn load_configuration() -> Result<ScannerConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("MEDIA_IMPORT")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("ignore_patterns")
                .with_list_parse_key("media_extensions"),
        )
        .build()?;
    builder.try_deserialize::<ScannerConfig>()
}
