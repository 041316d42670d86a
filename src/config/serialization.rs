//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

/// TOML string literal with escapes applied
fn quoted(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

fn string_array(values: &[String]) -> String {
    toml::Value::Array(values.iter().cloned().map(toml::Value::String).collect()).to_string()
}

impl Config {
    /// Serialize config to TOML string (single source of truth for format)
    pub fn to_toml(&self) -> String {
        format!(
            r#"# sitevisits configuration

# HTTP bind address (SITEVISITS_BIND overrides)
bind_addr = "{bind}"

# ─────────────────────────────────────────────────────────────────────────────
# STORAGE
# ─────────────────────────────────────────────────────────────────────────────
# SQLite database holding one row per visit.
# SITEVISITS_DB and SITEVISITS_BINDING override db_path and binding.

[storage]
enabled = {storage_enabled}
db_path = {db_path}
binding = {binding}

# ─────────────────────────────────────────────────────────────────────────────
# TRACKING
# ─────────────────────────────────────────────────────────────────────────────
# endpoint      - where the client script POSTs visits
# ignore_paths  - exact paths or "*" wildcards, e.g. ["/admin/*", "/health"]
# track_dev     - keep tracking on localhost / dev pages
# dev_mode      - log visits instead of storing them (SITEVISITS_DEV=1)

[tracking]
endpoint = {endpoint}
ignore_paths = {ignore_paths}
track_dev = {track_dev}
dev_mode = {dev_mode}

# Logging configuration (RUST_LOG env var overrides)
[logging]
level = {log_level}
# JSON file logging (in addition to stdout)
file_enabled = {log_file_enabled}
file_dir = {log_file_dir}
file_rotation = "{log_file_rotation}"  # hourly, daily, never
file_prefix = {log_file_prefix}
"#,
            bind = self.bind_addr,
            storage_enabled = self.storage.enabled,
            db_path = quoted(&self.storage.db_path.display().to_string()),
            binding = quoted(&self.storage.binding),
            endpoint = quoted(&self.tracking.endpoint),
            ignore_paths = string_array(&self.tracking.ignore_paths),
            track_dev = self.tracking.track_dev,
            dev_mode = self.tracking.dev_mode,
            log_level = quoted(&self.logging.level),
            log_file_enabled = self.logging.file_enabled,
            log_file_dir = quoted(&self.logging.file_dir.display().to_string()),
            log_file_rotation = self.logging.file_rotation.as_str(),
            log_file_prefix = quoted(&self.logging.file_prefix),
        )
    }

    /// Save current configuration to file
    pub fn save(&self) -> Result<(), std::io::Error> {
        let Some(path) = Self::config_path() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config path",
            ));
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, self.to_toml())
    }
}
