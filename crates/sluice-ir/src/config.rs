//! Engine configuration shared by every compilation stage

use serde::{Deserialize, Serialize};

/// Read-only engine settings, passed by reference into each builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Allow key columns with any name instead of only `ROWKEY`.
    pub any_key_name_enabled: bool,

    /// Default for `WRAP_SINGLE_VALUE` when a statement does not set it.
    pub wrap_single_values: bool,

    /// Schema registry endpoint, required by formats that store schemas remotely.
    pub schema_registry_url: Option<String>,

    /// Attach the offending row to processing-log entries.
    pub processing_log_include_rows: bool,

    /// Fail the record instead of skipping it when its timestamp cannot be extracted.
    pub timestamp_throw_on_invalid: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            any_key_name_enabled: false,
            wrap_single_values: true,
            schema_registry_url: None,
            processing_log_include_rows: false,
            timestamp_throw_on_invalid: false,
        }
    }
}

impl EngineConfig {
    pub fn with_any_key_name(mut self, enabled: bool) -> Self {
        self.any_key_name_enabled = enabled;
        self
    }

    pub fn with_wrap_single_values(mut self, wrap: bool) -> Self {
        self.wrap_single_values = wrap;
        self
    }

    pub fn with_schema_registry_url(mut self, url: impl Into<String>) -> Self {
        self.schema_registry_url = Some(url.into());
        self
    }
}
