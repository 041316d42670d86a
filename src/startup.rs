// Startup module - displays banner and module loading status
//
// Printed once the store has been opened (or failed to), so the status
// column reflects what is actually running.

use crate::config::{Config, VERSION};

/// ANSI color codes for terminal output
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const MAGENTA: &str = "\x1b[35m";
}

/// Module loading result for display
pub struct ModuleStatus {
    pub name: &'static str,
    pub enabled: bool,
    pub description: String,
}

/// Status of all modules given the config and whether the store opened
fn get_module_status(config: &Config, storage_active: bool) -> Vec<ModuleStatus> {
    let storage_description = if storage_active {
        format!(
            "SQLite {} ({})",
            config.storage.db_path.display(),
            config.storage.binding
        )
    } else if config.tracking.dev_mode {
        "disabled (dev mode)".to_string()
    } else {
        "disabled".to_string()
    };

    vec![
        ModuleStatus {
            name: "collector",
            enabled: true, // Core, always on
            description: format!("POST {}", config.tracking.endpoint),
        },
        ModuleStatus {
            name: "script",
            enabled: true,
            description: "GET /visits.js".to_string(),
        },
        ModuleStatus {
            name: "storage",
            enabled: storage_active,
            description: storage_description,
        },
        ModuleStatus {
            name: "analytics",
            enabled: storage_active,
            description: "GET /api/visits/*".to_string(),
        },
        ModuleStatus {
            name: "file-log",
            enabled: config.logging.file_enabled,
            description: config.logging.file_dir.display().to_string(),
        },
    ]
}

/// Print the startup banner and module loading status
pub fn print_startup(config: &Config, storage_active: bool) {
    use colors::*;

    println!();
    println!("  {BOLD}{CYAN}sitevisits{RESET} {DIM}v{VERSION}{RESET}");
    println!("  {DIM}Self-hosted website visit tracker{RESET}");
    println!();

    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("  {DIM}Config:{RESET} {GREEN}✓{RESET} {}", path.display());
        } else {
            println!("  {DIM}Config:{RESET} {DIM}(using defaults){RESET}");
        }
    }
    println!();

    println!("  {DIM}Loading modules...{RESET}");
    for module in &get_module_status(config, storage_active) {
        print_module_status(module);
    }
    println!();

    println!(
        "  {MAGENTA}▸{RESET} Listening on {BOLD}http://{}{RESET}",
        config.bind_addr
    );
    if config.tracking.dev_mode {
        println!("  {YELLOW}▸{RESET} {YELLOW}Dev mode active{RESET} {DIM}(visits are logged, not stored){RESET}");
    }
    if !config.tracking.ignore_paths.is_empty() {
        println!(
            "  {DIM}▸ Ignoring {} path pattern(s){RESET}",
            config.tracking.ignore_paths.len()
        );
    }
    println!();
}

/// Print a single module's status
fn print_module_status(module: &ModuleStatus) {
    use colors::*;

    let (icon, style) = if module.enabled {
        (format!("{GREEN}✓{RESET}"), "")
    } else {
        (format!("{DIM}○{RESET}"), DIM)
    };

    println!(
        "    {icon} {style}{:<12}{RESET} {DIM}{}{RESET}",
        module.name, module.description
    );
}

/// Mirror the banner into the log stream (file logs keep a record of each boot)
pub fn log_startup(config: &Config, storage_active: bool) {
    tracing::info!("sitevisits v{} starting", VERSION);

    for module in &get_module_status(config, storage_active) {
        let icon = if module.enabled { "✓" } else { "○" };
        tracing::info!("  {} {} - {}", icon, module.name, module.description);
    }

    if config.tracking.dev_mode {
        tracing::info!("Dev mode active: visits are logged, not stored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_status_follows_activation() {
        let config = Config::default();

        let active = get_module_status(&config, true);
        let storage = active.iter().find(|m| m.name == "storage").unwrap();
        assert!(storage.enabled);
        assert!(storage.description.contains("VISITS_DB"));

        let mut dev = Config::default();
        dev.tracking.dev_mode = true;
        let inactive = get_module_status(&dev, false);
        let storage = inactive.iter().find(|m| m.name == "storage").unwrap();
        assert!(!storage.enabled);
        assert_eq!(storage.description, "disabled (dev mode)");
    }
}
