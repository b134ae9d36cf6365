//! Per-record error sink
//!
//! Row-level failures never abort a running query. They are reported here and
//! the row is dropped.

use std::fmt;

use sluice_ir::{EngineConfig, GenericRow};
use tracing::error;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordProcessingError {
    message: String,
    cause: Option<String>,
    record: Option<GenericRow>,
}

impl RecordProcessingError {
    pub fn new(message: impl Into<String>, record: Option<GenericRow>) -> Self {
        Self {
            message: message.into(),
            cause: None,
            record,
        }
    }

    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }

    pub fn record(&self) -> Option<&GenericRow> {
        self.record.as_ref()
    }
}

pub trait ProcessingLogger: Send + Sync {
    fn error(&self, error: RecordProcessingError);
}

/// Emits processing errors as `tracing` events under the `sluice::processing` target.
#[derive(Debug, Clone)]
pub struct TracingProcessingLogger {
    name: String,
    include_rows: bool,
}

impl TracingProcessingLogger {
    pub fn new(name: impl Into<String>, config: &EngineConfig) -> Self {
        Self {
            name: name.into(),
            include_rows: config.processing_log_include_rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ProcessingLogger for TracingProcessingLogger {
    fn error(&self, err: RecordProcessingError) {
        let record = if self.include_rows {
            err.record().map(|row| format!("{:?}", row.values()))
        } else {
            None
        };

        error!(
            target: "sluice::processing",
            logger = %self.name,
            cause = err.cause(),
            record = record.as_deref(),
            "{}",
            err.message()
        );
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProcessingLogger;

impl ProcessingLogger for NoopProcessingLogger {
    fn error(&self, _error: RecordProcessingError) {}
}
