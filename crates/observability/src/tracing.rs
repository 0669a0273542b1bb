//! Tracing/logging initialization.
//!
//! Console output is JSON (production) or human-readable (local runs). When a
//! log directory is configured every event is also appended to
//! `combined.log` through a non-blocking writer.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// File name used under [`LogConfig::log_dir`].
pub const COMBINED_LOG: &str = "combined.log";

/// Console output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl core::str::FromStr for LogFormat {
    type Err = ObservabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(ObservabilityError::UnknownFormat(other.to_string())),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Directory for `combined.log`; console only when `None`.
    pub log_dir: Option<PathBuf>,
    /// Filter used when `RUST_LOG` is not set.
    pub default_filter: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ObservabilityError {
    #[error("unknown log format: {0}")]
    UnknownFormat(String),

    #[error("failed to prepare log directory: {0}")]
    LogDir(#[from] std::io::Error),
}

/// Keeps the background file writer alive; drop it last so buffered lines flush.
#[derive(Debug, Default)]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls leave the first subscriber
/// in place).
pub fn init(config: &LogConfig) -> Result<LogGuard, ObservabilityError> {
    let default_filter = config.default_filter.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let (file_layer, file_guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, COMBINED_LOG);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let json_layer = (config.format == LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .with_timer(fmt::time::SystemTime)
            .with_target(false)
    });
    let pretty_layer = (config.format == LogFormat::Pretty).then(|| fmt::layer().with_target(false));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(pretty_layer)
        .with(file_layer)
        .try_init();

    Ok(LogGuard { _file: file_guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" Pretty ".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!(matches!(
            "xml".parse::<LogFormat>(),
            Err(ObservabilityError::UnknownFormat(f)) if f == "xml"
        ));
    }

    #[test]
    fn init_is_idempotent_and_creates_log_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("logs");
        let config = LogConfig {
            format: LogFormat::Pretty,
            log_dir: Some(dir.clone()),
            default_filter: Some("debug".to_string()),
        };

        let first = init(&config).unwrap();
        let second = init(&LogConfig::default()).unwrap();
        assert!(dir.is_dir());
        drop(second);
        drop(first);
    }
}
