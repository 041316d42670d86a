//! Configuration for the visit tracker
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/sitevisits/config.toml)
//! 3. Built-in defaults (lowest priority)

use anyhow::Context;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod observability;
mod serialization;
mod storage;
mod tracking;


// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (maintain public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use observability::{FileLogging, LogRotation, LoggingConfig};
pub use storage::{FileStorage, StorageConfig};
pub use tracking::{FileTracking, TrackingConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default listen address
const DEFAULT_BIND: &str = "127.0.0.1:4321";

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the HTTP server to
    pub bind_addr: SocketAddr,

    /// Visit database settings
    pub storage: StorageConfig,

    /// Client script and collection settings
    pub tracking: TrackingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 4321)),
            storage: StorageConfig::default(),
            tracking: TrackingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub bind_addr: Option<String>,

    /// Optional [storage] section
    pub storage: Option<FileStorage>,

    /// Optional [tracking] section
    pub tracking: Option<FileTracking>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: ~/.config/sitevisits/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("sitevisits").join("config.toml"))
    }

    /// Create config file with defaults if it doesn't exist
    /// Called during startup to help users discover configuration options
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };

        // Don't overwrite existing config
        if path.exists() {
            return;
        }

        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return; // Config is optional
            }
        }

        // Use Config::default().to_toml() as single source of truth
        let template = Self::default().to_toml();

        if let Err(e) = std::fs::write(&path, template) {
            tracing::debug!("Could not write default config to {}: {}", path.display(), e);
        }
    }

    /// Load file config if it exists
    ///
    /// A config file that exists but cannot be read or parsed is an error:
    /// silently falling back to defaults hides the typo the user is hunting for.
    fn load_file_config() -> anyhow::Result<FileConfig> {
        let Some(path) = Self::config_path() else {
            return Ok(FileConfig::default());
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents).with_context(|| {
                format!(
                    "Failed to parse {} (check quoting, true/false values and section names)",
                    path.display()
                )
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
            Err(e) => Err(e).with_context(|| format!("Cannot read {}", path.display())),
        }
    }

    /// Load configuration: file -> env vars -> defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let file = Self::load_file_config()?;
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merge a parsed file with an environment lookup
    pub(crate) fn resolve(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        // Bind address: env > file > default
        let bind = env("SITEVISITS_BIND")
            .or(file.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind
            .parse()
            .with_context(|| format!("Invalid bind address: {}", bind))?;

        let mut storage = StorageConfig::from_file(file.storage);
        if let Some(db_path) = env("SITEVISITS_DB") {
            storage.db_path = PathBuf::from(db_path);
        }
        if let Some(binding) = env("SITEVISITS_BINDING") {
            storage.binding = binding;
        }

        let mut tracking = TrackingConfig::from_file(file.tracking);
        // Dev mode: env only overrides when set
        if let Some(dev) = env("SITEVISITS_DEV") {
            tracking.dev_mode = dev == "1" || dev.to_lowercase() == "true";
        }
        tracking.validate()?;

        let logging = LoggingConfig::from_file(file.logging);

        Ok(Self {
            bind_addr,
            storage,
            tracking,
            logging,
        })
    }

    /// Whether visits are written to the database
    ///
    /// Dev mode always wins: visits are logged, never persisted.
    pub fn persist_visits(&self) -> bool {
        self.storage.enabled && !self.tracking.dev_mode
    }
}
