//! Tracking configuration: client script and collection rules

use serde::Deserialize;

use crate::script::DEFAULT_ENDPOINT;

/// Tracking configuration
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingConfig {
    /// Path the client script POSTs visits to
    pub endpoint: String,
    /// Paths never tracked; exact match or `*` wildcard
    pub ignore_paths: Vec<String>,
    /// Keep tracking when the page runs on a development host
    pub track_dev: bool,
    /// Log incoming visits instead of persisting them
    pub dev_mode: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            ignore_paths: Vec::new(),
            track_dev: false,
            dev_mode: false,
        }
    }
}

/// Tracking settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileTracking {
    pub endpoint: Option<String>,
    pub ignore_paths: Option<Vec<String>>,
    pub track_dev: Option<bool>,
    pub dev_mode: Option<bool>,
}

impl TrackingConfig {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileTracking>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            endpoint: file.endpoint.unwrap_or(defaults.endpoint),
            ignore_paths: file.ignore_paths.unwrap_or(defaults.ignore_paths),
            track_dev: file.track_dev.unwrap_or(defaults.track_dev),
            dev_mode: file.dev_mode.unwrap_or(defaults.dev_mode),
        }
    }

    /// Reject endpoints the router cannot mount
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.endpoint.starts_with('/') {
            anyhow::bail!("tracking.endpoint must start with '/': {}", self.endpoint);
        }
        let reserved = self.endpoint == "/visits.js"
            || self.endpoint == "/health"
            || self.endpoint == "/api/visits"
            || self.endpoint.starts_with("/api/visits/");
        if reserved {
            anyhow::bail!("tracking.endpoint collides with a built-in route: {}", self.endpoint);
        }
        Ok(())
    }

    /// The script stays silent on dev hosts unless `track_dev` is set
    pub fn disable_in_dev(&self) -> bool {
        !self.track_dev
    }
}
