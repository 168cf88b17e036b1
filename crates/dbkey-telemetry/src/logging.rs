//! Log file setup

use anyhow::{Context, Result};
use dbkey_core::{LogFileMode, LoggingConfig};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Keeps the background log writer alive. Dropping it flushes pending lines.
#[must_use = "dropping the guard stops log file output"]
pub struct LoggingGuard {
    _appender: WorkerGuard,
}

/// Install the global subscriber described by `config`.
///
/// Writes plain-text lines to the configured log file (created along with its
/// parent directory), and optionally mirrors them to stderr. `RUST_LOG`
/// overrides the configured level.
///
/// # Example
///
/// ```rust,no_run
/// use dbkey_core::LoggingConfig;
/// use dbkey_telemetry::init_logging;
///
/// let _guard = init_logging(&LoggingConfig::default())?;
/// tracing::info!("logging to ./logs/dbkey.log");
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard> {
    let file = open_log_file(&config.file, config.mode)
        .with_context(|| format!("Failed to open log file: {:?}", config.file))?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let filter = build_filter(&config.level)?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);

    let console_layer = config
        .console
        .then(|| tracing_subscriber::fmt::layer().with_writer(io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if LevelFilter::current() == LevelFilter::TRACE {
        tracing::warn!("TRACE logging is enabled; identity tokens will be written to the log");
    }

    Ok(LoggingGuard { _appender: guard })
}

/// Open the log file, truncating or appending per `mode`
pub fn open_log_file(path: &Path, mode: LogFileMode) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut options = OpenOptions::new();
    options.create(true);
    match mode {
        LogFileMode::Overwrite => options.write(true).truncate(true),
        LogFileMode::Append => options.append(true),
    };
    options.open(path)
}

/// `RUST_LOG` if set, otherwise the configured level
pub fn build_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).with_context(|| format!("Invalid log level: {}", level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_overwrite_truncates_existing_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("conjursvc.log");

        {
            let mut file = open_log_file(&path, LogFileMode::Overwrite).unwrap();
            writeln!(file, "first run").unwrap();
        }
        {
            let mut file = open_log_file(&path, LogFileMode::Overwrite).unwrap();
            writeln!(file, "second run").unwrap();
        }

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "second run\n");
    }

    #[test]
    fn test_append_keeps_existing_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dbkey.log");

        for line in ["first run", "second run"] {
            let mut file = open_log_file(&path, LogFileMode::Append).unwrap();
            writeln!(file, "{}", line).unwrap();
        }

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first run\nsecond run\n");
    }

    #[test]
    fn test_build_filter_accepts_levels() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        assert!(build_filter("info").is_ok());
        assert!(build_filter("dbkey_vault=debug,warn").is_ok());
        assert!(build_filter("dbkey_vault=notalevel").is_err());
    }
}
