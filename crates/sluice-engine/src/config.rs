//! Configuration for the sluice engine
//!
//! Loads configuration from a YAML file with `engine` and `logging` sections.
//! Environment variables always override file values.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use sluice_ir::EngineConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for environment variable {name}: '{value}'")]
    InvalidEnvVar { name: String, value: String },
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or module-specific directives
    pub level: String,

    /// Output format: pretty, json, compact
    pub format: String,

    /// Output destination: stdout, file, both
    pub output: String,

    /// Directory for log files
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            output: "stdout".to_string(),
            directory: "./logs".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file with environment variable overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// Like [`Config::load`], reading overrides from `lookup` instead of the process environment.
    pub fn load_with<P, F>(path: P, lookup: F) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_with(&contents, lookup)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Self::from_yaml_with(contents, |name| std::env::var(name).ok())
    }

    pub fn from_yaml_with<F>(contents: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Config = serde_yaml::from_str(contents)?;
        config.apply_env_overrides(lookup)?;
        Ok(config)
    }

    /// Apply overrides from `lookup`, which maps variable names to values.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("SLUICE_ANY_KEY_NAME_ENABLED") {
            self.engine.any_key_name_enabled = parse_bool("SLUICE_ANY_KEY_NAME_ENABLED", value)?;
        }
        if let Some(value) = lookup("SLUICE_WRAP_SINGLE_VALUES") {
            self.engine.wrap_single_values = parse_bool("SLUICE_WRAP_SINGLE_VALUES", value)?;
        }
        if let Some(url) = lookup("SLUICE_SCHEMA_REGISTRY_URL") {
            self.engine.schema_registry_url = Some(url);
        }

        if let Some(level) = lookup("RUST_LOG") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Some(output) = lookup("LOG_OUTPUT") {
            self.logging.output = output;
        }
        if let Some(dir) = lookup("LOG_DIR") {
            self.logging.directory = dir;
        }

        Ok(())
    }
}

fn parse_bool(name: &str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidEnvVar {
            name: name.to_string(),
            value,
        }),
    }
}
