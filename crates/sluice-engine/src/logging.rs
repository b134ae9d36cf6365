//! Structured logging setup
//!
//! Human-readable console output for development, JSON for production, and
//! optional daily-rotated log files. Processing-log entries arrive under the
//! `sluice::processing` target and can be filtered like any other module.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt as layer_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

const LOG_FILE_NAME: &str = "sluice.log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Unknown log format '{0}'. Expected pretty, json or compact")]
    UnknownFormat(String),

    #[error("Unknown log output '{0}'. Expected stdout, file or both")]
    UnknownOutput(String),

    #[error("Invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("Failed to create log directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to install logger: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format for development
    Pretty,
    /// Structured JSON for production
    Json,
    Compact,
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(LoggingError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => f.write_str("pretty"),
            LogFormat::Json => f.write_str("json"),
            LogFormat::Compact => f.write_str("compact"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    File,
    Both,
}

impl LogOutput {
    fn writes_file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }

    fn writes_stdout(self) -> bool {
        matches!(self, LogOutput::Stdout | LogOutput::Both)
    }
}

impl FromStr for LogOutput {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdout" => Ok(LogOutput::Stdout),
            "file" => Ok(LogOutput::File),
            "both" => Ok(LogOutput::Both),
            _ => Err(LoggingError::UnknownOutput(s.to_string())),
        }
    }
}

/// Install the global subscriber described by `config`.
///
/// Fails if a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let format: LogFormat = config.format.parse()?;
    let output: LogOutput = config.output.parse()?;
    let env_filter = build_filter(&config.level)?;

    let stdout_layer = output.writes_stdout().then(|| match format {
        LogFormat::Pretty => layer_fmt::layer()
            .pretty()
            .with_thread_ids(true)
            .with_target(true)
            .boxed(),
        LogFormat::Json => layer_fmt::layer().json().with_current_span(true).boxed(),
        LogFormat::Compact => layer_fmt::layer().compact().boxed(),
    });

    let file_layer = if output.writes_file() {
        std::fs::create_dir_all(&config.directory)?;
        let appender = RollingFileAppender::new(Rotation::DAILY, &config.directory, LOG_FILE_NAME);
        let layer = layer_fmt::layer().with_writer(appender).with_ansi(false);
        Some(match format {
            LogFormat::Json => layer.json().boxed(),
            _ => layer.boxed(),
        })
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!(
        format = %format,
        output = ?output,
        level = %config.level,
        "logging initialized"
    );
    if output.writes_file() {
        tracing::debug!(directory = %config.directory, "writing log files");
    }

    Ok(())
}

fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    Ok(EnvFilter::try_new(level)?)
}
