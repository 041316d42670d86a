// Logging module - tracing subscriber setup
//
// Console output always goes to stdout. When file logging is enabled, a
// second JSON layer writes to a rolling file through a non-blocking worker,
// whose guard must stay alive until exit so buffered lines are flushed.

use crate::config::{LogRotation, LoggingConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive for a configured level
///
/// Precedence: RUST_LOG env var > config file > "info"
pub fn default_filter(level: &str) -> String {
    format!("sitevisits={},tower_http=debug,axum=debug", level)
}

/// Rolling appender for the configured rotation
fn file_appender(config: &LoggingConfig) -> RollingFileAppender {
    match config.file_rotation {
        LogRotation::Hourly => {
            tracing_appender::rolling::hourly(&config.file_dir, &config.file_prefix)
        }
        LogRotation::Daily => tracing_appender::rolling::daily(&config.file_dir, &config.file_prefix),
        LogRotation::Never => tracing_appender::rolling::never(&config.file_dir, &config.file_prefix),
    }
}

/// Install the global subscriber
///
/// Returns the file writer's guard when file logging is active. Hold it for
/// the lifetime of the program.
pub fn init_tracing(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter(&config.level).into());

    let (file_layer, guard) = if config.file_enabled {
        match std::fs::create_dir_all(&config.file_dir) {
            Ok(()) => {
                // Writes happen on a background thread
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender(config));
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_ansi(false);
                (Some(layer), Some(guard))
            }
            Err(e) => {
                // Subscriber isn't up yet, so this can't go through tracing
                eprintln!(
                    "Warning: Could not create log directory {:?}: {}",
                    config.file_dir, e
                );
                (None, None)
            }
        }
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_uses_configured_level() {
        assert_eq!(
            default_filter("debug"),
            "sitevisits=debug,tower_http=debug,axum=debug"
        );
        assert!(default_filter("warn").parse::<EnvFilter>().is_ok());
    }

    #[test]
    fn test_file_appender_writes_into_configured_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            file_dir: dir.path().to_path_buf(),
            file_rotation: LogRotation::Never,
            file_prefix: "test".to_string(),
            ..Default::default()
        };

        let mut appender = file_appender(&config);
        std::io::Write::write_all(&mut appender, b"hello\n").unwrap();
        assert!(dir.path().join("test").exists());
    }
}
