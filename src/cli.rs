// CLI module - command-line argument parsing and handlers
//
// With no subcommand (or `serve`) the HTTP server runs. The other
// subcommands work directly against the config file or the database:
// - config --show|--path|--reset
// - script: print the embeddable <script> tag
// - classify: run the User-Agent classifier on one string
// - stats / list / delete: inspect or prune stored visits

use crate::config::{Config, VERSION};
use crate::query::{VisitQueryOptions, VisitsQuery};
use crate::script;
use crate::storage::VisitStore;
use crate::user_agent;
use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use std::io::Write;

/// sitevisits - self-hosted website visit tracker
#[derive(Parser)]
#[command(name = "sitevisits")]
#[command(version = VERSION)]
#[command(about = "Self-hosted website visit tracker", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Reset config file to defaults
        #[arg(long)]
        reset: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Print the <script> tag to embed in pages
    Script,

    /// Classify a User-Agent string and print the result as JSON
    Classify {
        /// The User-Agent string
        user_agent: String,
    },

    /// Print summary statistics as JSON
    Stats,

    /// List stored visits as JSON (newest first)
    #[command(group(ArgGroup::new("filter").args(["url", "ip", "from"])))]
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 20)]
        limit: u32,

        /// Only URLs containing this substring
        #[arg(long)]
        url: Option<String>,

        /// Only visits from this IP
        #[arg(long)]
        ip: Option<String>,

        /// Only visits at or after this timestamp (requires --to)
        #[arg(long, requires = "to")]
        from: Option<String>,

        /// Only visits at or before this timestamp
        #[arg(long, requires = "from")]
        to: Option<String>,
    },

    /// Delete visits by id
    Delete {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
}

/// Handle CLI commands. Returns true if a command was handled (exit after).
pub fn handle_cli() -> anyhow::Result<bool> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Commands::Serve) => Ok(false),
        Some(Commands::Config { show, reset, path }) => {
            if path {
                handle_config_path()?;
            } else if show {
                handle_config_show()?;
            } else if reset {
                handle_config_reset()?;
            } else {
                // No flag provided, show help
                println!("Usage: sitevisits config [--show|--reset|--path]");
                println!();
                println!("Options:");
                println!("  --show    Display effective configuration");
                println!("  --reset   Reset config file to defaults");
                println!("  --path    Show config file path");
            }
            Ok(true)
        }
        Some(Commands::Script) => {
            let config = Config::from_env()?;
            println!(
                "{}",
                script::script_tag(
                    &config.tracking.ignore_paths,
                    &config.tracking.endpoint,
                    config.tracking.disable_in_dev(),
                )
            );
            Ok(true)
        }
        Some(Commands::Classify { user_agent }) => {
            let parsed = user_agent::parse_user_agent(&user_agent);
            println!("{}", serde_json::to_string_pretty(&parsed)?);
            Ok(true)
        }
        Some(Commands::Stats) => {
            let query = VisitsQuery::from_store(&open_store()?);
            println!("{}", serde_json::to_string_pretty(&query.get_stats()?)?);
            Ok(true)
        }
        Some(Commands::List {
            page,
            limit,
            url,
            ip,
            from,
            to,
        }) => {
            let query = VisitsQuery::from_store(&open_store()?);
            let options = VisitQueryOptions {
                page,
                limit,
                ..Default::default()
            };
            // At most one filter is set (enforced by the arg group)
            let result = match (url, ip, from.zip(to)) {
                (Some(url), _, _) => query.get_visits_by_url(&url, &options)?,
                (_, Some(ip), _) => query.get_visits_by_ip(&ip, &options)?,
                (_, _, Some((from, to))) => query.get_visits_by_date_range(&from, &to, &options)?,
                _ => query.get_visits(&options)?,
            };
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(true)
        }
        Some(Commands::Delete { ids }) => {
            let store = open_store()?;
            let deleted = store.delete_visits(&ids)?;
            println!("Deleted {} of {} visit(s)", deleted, ids.len());
            Ok(true)
        }
    }
}

/// Open the configured database for a one-shot command
fn open_store() -> anyhow::Result<VisitStore> {
    let config = Config::from_env()?;
    VisitStore::open(&config.storage.db_path)
        .with_context(|| format!("Failed to open {}", config.storage.db_path.display()))
}

fn handle_config_path() -> anyhow::Result<()> {
    let path = Config::config_path().context("Could not determine config path")?;
    println!("{}", path.display());
    Ok(())
}

fn handle_config_show() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    println!("# Effective configuration (env > file > defaults)");
    println!();
    print!("{}", config.to_toml());

    // Show source info
    println!();
    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("# Source: {}", path.display());
        } else {
            println!("# Source: defaults (no config file)");
        }
    }
    Ok(())
}

fn handle_config_reset() -> anyhow::Result<()> {
    let path = Config::config_path().context("Could not determine config path")?;

    // Confirm if file exists
    if path.exists() {
        eprint!(
            "Config file exists at {}. Overwrite? [y/N] ",
            path.display()
        );
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    // Config's single source of truth
    Config::default()
        .save()
        .with_context(|| format!("Error writing config to {}", path.display()))?;

    println!("Config reset to defaults: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_list_flags() {
        let cli = Cli::try_parse_from(["sitevisits", "list", "--page", "2", "--ip", "1.2.3.4"])
            .unwrap();
        match cli.command {
            Some(Commands::List {
                page, limit, ip, url, ..
            }) => {
                assert_eq!(page, 2);
                assert_eq!(limit, 20);
                assert_eq!(ip.as_deref(), Some("1.2.3.4"));
                assert!(url.is_none());
            }
            _ => panic!("expected list command"),
        }
    }

    #[test]
    fn test_list_filters_are_exclusive() {
        assert!(Cli::try_parse_from(["sitevisits", "list", "--url", "/a", "--ip", "1.1.1.1"]).is_err());
        assert!(Cli::try_parse_from(["sitevisits", "list", "--from", "2024-01-01"]).is_err());
        assert!(
            Cli::try_parse_from(["sitevisits", "list", "--from", "2024-01-01", "--to", "2024-02-01"])
                .is_ok()
        );
    }

    #[test]
    fn test_delete_requires_ids() {
        assert!(Cli::try_parse_from(["sitevisits", "delete"]).is_err());
        assert!(Cli::try_parse_from(["sitevisits", "delete", "abc"]).is_err());
        assert!(Cli::try_parse_from(["sitevisits", "delete", "1", "2"]).is_ok());
    }
}
