//! External services the engine consults while compiling statements

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, RwLock};

use sluice_ir::EngineConfig;
use sluice_serde::{ConfiguredSchemaRegistry, SchemaRegistryClientFactory};

/// Read-only view of the message broker's topics.
pub trait TopicClient: Send + Sync {
    fn is_topic_exists(&self, topic: &str) -> bool;
}

/// Topic client over a fixed, in-process topic list.
#[derive(Debug, Default)]
pub struct InMemoryTopicClient {
    topics: RwLock<BTreeSet<String>>,
}

impl InMemoryTopicClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_topics<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            topics: RwLock::new(topics.into_iter().map(Into::into).collect()),
        }
    }

    pub fn create_topic(&self, topic: impl Into<String>) {
        let mut topics = self.topics.write().unwrap_or_else(|e| e.into_inner());
        topics.insert(topic.into());
    }
}

impl TopicClient for InMemoryTopicClient {
    fn is_topic_exists(&self, topic: &str) -> bool {
        let topics = self.topics.read().unwrap_or_else(|e| e.into_inner());
        topics.contains(topic)
    }
}

/// Handles to the services a statement may need.
#[derive(Clone)]
pub struct ServiceContext {
    topic_client: Arc<dyn TopicClient>,
    schema_registry: Arc<dyn SchemaRegistryClientFactory>,
}

impl ServiceContext {
    pub fn new(
        topic_client: Arc<dyn TopicClient>,
        schema_registry: Arc<dyn SchemaRegistryClientFactory>,
    ) -> Self {
        Self {
            topic_client,
            schema_registry,
        }
    }

    /// Context whose schema registry is the one named in `config`.
    pub fn from_config(topic_client: Arc<dyn TopicClient>, config: &EngineConfig) -> Self {
        Self::new(
            topic_client,
            Arc::new(ConfiguredSchemaRegistry::from_config(config)),
        )
    }

    pub fn topic_client(&self) -> &dyn TopicClient {
        self.topic_client.as_ref()
    }

    pub fn schema_registry(&self) -> &dyn SchemaRegistryClientFactory {
        self.schema_registry.as_ref()
    }
}

impl fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContext").finish_non_exhaustive()
    }
}
