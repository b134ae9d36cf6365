//! Schema registry contract

use std::fmt;
use std::sync::Arc;

use sluice_ir::EngineConfig;

use crate::error::SerdeError;

/// Connection to a schema registry. Only the handle is needed at compile time;
/// schemas are registered when the query starts.
pub trait SchemaRegistryClient: fmt::Debug + Send + Sync {
    fn url(&self) -> &str;
}

pub trait SchemaRegistryClientFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn SchemaRegistryClient>, SerdeError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSchemaRegistry {
    url: String,
}

impl SchemaRegistryClient for RemoteSchemaRegistry {
    fn url(&self) -> &str {
        &self.url
    }
}

/// Creates clients for the registry named in the engine config.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredSchemaRegistry {
    url: Option<String>,
}

impl ConfiguredSchemaRegistry {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            url: config.schema_registry_url.clone(),
        }
    }
}

impl SchemaRegistryClientFactory for ConfiguredSchemaRegistry {
    fn create(&self) -> Result<Arc<dyn SchemaRegistryClient>, SerdeError> {
        match &self.url {
            Some(url) if !url.trim().is_empty() => {
                Ok(Arc::new(RemoteSchemaRegistry { url: url.clone() }))
            }
            _ => Err(SerdeError::SchemaRegistryNotConfigured),
        }
    }
}
