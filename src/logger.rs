use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Unable to create log file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Logger already initialized: {0}")]
    AlreadyInitialized(#[from] log::SetLoggerError),
}

struct CliLogger {
    sink: Mutex<Box<dyn Write + Send>>,
    filter: LevelFilter,
    start: Instant,
}

/// Formats one log line
#[must_use]
pub fn format_line(elapsed_secs: f64, level: Level, target: &str, message: &str) -> String {
    format!("[{elapsed_secs:.3}s] [{level}] {target}: {message}")
}

impl Log for CliLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let elapsed = self.start.elapsed().as_secs_f64();
        let line = format_line(
            elapsed,
            record.level(),
            record.target(),
            &record.args().to_string(),
        );
        let _ = writeln!(self.sink.lock(), "{line}");
    }

    fn flush(&self) {
        let _ = self.sink.lock().flush();
    }
}

/// Level filter from `RUST_LOG`, warnings and errors only by default
#[must_use]
pub fn filter_from(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(LevelFilter::Warn)
}

/// Initialize the global logger, writing to `log_file` or stderr.
///
/// # Errors
///
/// Returns `LoggerError::File` if the log file cannot be created, or
/// `LoggerError::AlreadyInitialized` if a logger is already installed.
pub fn init(log_file: Option<&Path>) -> Result<(), LoggerError> {
    let filter = filter_from(std::env::var("RUST_LOG").ok().as_deref());

    let sink: Box<dyn Write + Send> = match log_file {
        Some(path) => Box::new(std::fs::File::create(path).map_err(|source| {
            LoggerError::File {
                path: path.to_path_buf(),
                source,
            }
        })?),
        None => Box::new(std::io::stderr()),
    };

    let logger = CliLogger {
        sink: Mutex::new(sink),
        filter,
        start: Instant::now(),
    };

    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(filter);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line() {
        assert_eq!(
            format_line(1.23456, Level::Info, "lz_cli::tree", "attached"),
            "[1.235s] [INFO] lz_cli::tree: attached"
        );
    }

    #[test]
    fn test_filter_from_env_value() {
        assert_eq!(filter_from(Some("debug")), LevelFilter::Debug);
        assert_eq!(filter_from(Some(" TRACE ")), LevelFilter::Trace);
        assert_eq!(filter_from(Some("nonsense")), LevelFilter::Warn);
        assert_eq!(filter_from(None), LevelFilter::Warn);
    }
}
