//! Visit database configuration

use serde::Deserialize;
use std::path::PathBuf;

/// Visit database configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Whether visits are persisted at all
    pub enabled: bool,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Name the database handle is exposed under (reported by /health)
    pub binding: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            db_path: PathBuf::from("./data/visits.db"),
            binding: "VISITS_DB".to_string(),
        }
    }
}

/// Storage config as loaded from file
#[derive(Debug, Deserialize, Default)]
pub struct FileStorage {
    pub enabled: Option<bool>,
    pub db_path: Option<String>,
    pub binding: Option<String>,
}

impl StorageConfig {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileStorage>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            enabled: file.enabled.unwrap_or(defaults.enabled),
            db_path: file.db_path.map(PathBuf::from).unwrap_or(defaults.db_path),
            binding: file.binding.unwrap_or(defaults.binding),
        }
    }
}
