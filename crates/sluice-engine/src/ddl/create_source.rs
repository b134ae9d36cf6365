//! `CREATE STREAM` / `CREATE TABLE` compilation
//!
//! Each statement is checked in a fixed order: topic, schema, `KEY`,
//! `TIMESTAMP`, serde options, serde compatibility. The first failure aborts
//! the build and nothing is returned.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use sluice_ast::{CreateSource, CreateSourceProperties, TableElements};
use sluice_ir::{system_columns, ColumnName, EngineConfig, LogicalSchema, SchemaError};
use sluice_serde::{
    Format, GenericKeySerde, GenericRowSerde, KeySerdeFactory, PhysicalSchema, SerdeError,
    SerdeOptions, ValueSerdeFactory,
};
use sluice_streams::{TimestampColumn, TimestampError, TimestampExtractionPolicyFactory};

use crate::ddl::commands::{CreateSourceCommand, Formats};
use crate::services::ServiceContext;
use crate::topic::{Topic, TopicFactory};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CreateSourceError {
    #[error("Kafka topic does not exist: {0}")]
    TopicNotFound(String),

    #[error("The statement does not define any columns.")]
    NoColumns,

    #[error("'{0}' is a reserved column name.")]
    ReservedColumnName(ColumnName),

    #[error("'{0}' is an invalid KEY column name. Sluice currently only supports KEY columns named ROWKEY.")]
    InvalidKeyColumnName(ColumnName),

    #[error("'{0}' is a reserved column name. It can only be used for KEY columns.")]
    RowKeyAsValueColumn(ColumnName),

    #[error("The KEY column set in the WITH clause does not exist in the schema: '{0}'")]
    KeyFieldNotFound(ColumnName),

    #[error(transparent)]
    Timestamp(#[from] TimestampError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Serde(#[from] SerdeError),

    #[error("The key or value format cannot handle the schema: {0}")]
    SchemaIncompatible(#[source] SerdeError),
}

/// Chooses the serde options of a new source.
pub trait SerdeOptionsSupplier: Send + Sync {
    fn build(
        &self,
        schema: &LogicalSchema,
        value_format: Format,
        wrap_single_values: Option<bool>,
        config: &EngineConfig,
    ) -> Result<SerdeOptions, SerdeError>;
}

impl<F> SerdeOptionsSupplier for F
where
    F: Fn(&LogicalSchema, Format, Option<bool>, &EngineConfig) -> Result<SerdeOptions, SerdeError>
        + Send
        + Sync,
{
    fn build(
        &self,
        schema: &LogicalSchema,
        value_format: Format,
        wrap_single_values: Option<bool>,
        config: &EngineConfig,
    ) -> Result<SerdeOptions, SerdeError> {
        self(schema, value_format, wrap_single_values, config)
    }
}

pub struct CreateSourceFactory {
    service_context: ServiceContext,
    serde_options_supplier: Arc<dyn SerdeOptionsSupplier>,
    key_serde_factory: Arc<dyn KeySerdeFactory>,
    value_serde_factory: Arc<dyn ValueSerdeFactory>,
}

impl CreateSourceFactory {
    pub fn new(service_context: ServiceContext) -> Self {
        Self::with_dependencies(
            service_context,
            Arc::new(SerdeOptions::build_for_create_statement),
            Arc::new(GenericKeySerde),
            Arc::new(GenericRowSerde),
        )
    }

    pub fn with_dependencies(
        service_context: ServiceContext,
        serde_options_supplier: Arc<dyn SerdeOptionsSupplier>,
        key_serde_factory: Arc<dyn KeySerdeFactory>,
        value_serde_factory: Arc<dyn ValueSerdeFactory>,
    ) -> Self {
        Self {
            service_context,
            serde_options_supplier,
            key_serde_factory,
            value_serde_factory,
        }
    }

    /// Compile a statement into a command. Nothing outside the returned value is
    /// modified, whether or not the build succeeds.
    pub fn create_command(
        &self,
        statement: &CreateSource,
        config: &EngineConfig,
    ) -> Result<CreateSourceCommand, CreateSourceError> {
        let properties = &statement.properties;

        let topic = self.build_topic(properties)?;
        debug!(source = %statement.name, topic = topic.kafka_topic_name(), "resolved topic");

        let schema = build_schema(&statement.elements, config)?;
        debug!(source = %statement.name, schema = %schema, "built schema");

        let key_field = build_key_field(properties, &schema)?;
        let timestamp_column = build_timestamp_column(properties, &schema, config)?;

        let options = self.serde_options_supplier.build(
            &schema,
            topic.value_format().format(),
            properties.wrap_single_values(),
            config,
        )?;

        self.validate_serdes_can_handle_schema(&schema, &options, &topic, config)
            .map_err(CreateSourceError::SchemaIncompatible)?;

        info!(
            source = %statement.name,
            source_type = %statement.source_type,
            topic = topic.kafka_topic_name(),
            "compiled create source statement"
        );

        let window_info = topic.key_format().window().copied();
        Ok(CreateSourceCommand {
            source_type: statement.source_type,
            source_name: statement.name.clone(),
            schema,
            key_field,
            timestamp_column,
            topic_name: topic.kafka_topic_name().to_string(),
            formats: Formats::new(
                topic.key_format().clone(),
                topic.value_format().clone(),
                options,
            ),
            window_info,
        })
    }

    fn build_topic(&self, properties: &CreateSourceProperties) -> Result<Topic, CreateSourceError> {
        let name = properties.kafka_topic();
        if !self.service_context.topic_client().is_topic_exists(name) {
            return Err(CreateSourceError::TopicNotFound(name.to_string()));
        }
        Ok(TopicFactory::create(properties)?)
    }

    fn validate_serdes_can_handle_schema(
        &self,
        schema: &LogicalSchema,
        options: &SerdeOptions,
        topic: &Topic,
        config: &EngineConfig,
    ) -> Result<(), SerdeError> {
        let physical = PhysicalSchema::from_logical(schema, options)?;
        let registry = self.service_context.schema_registry();

        self.key_serde_factory
            .create(topic.key_format(), physical.key_schema(), config, registry, "")?
            .close();

        self.value_serde_factory
            .create(
                topic.value_format().format_info(),
                physical.value_schema(),
                config,
                registry,
                "",
            )?
            .close();

        Ok(())
    }
}

impl fmt::Debug for CreateSourceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateSourceFactory")
            .field("service_context", &self.service_context)
            .finish_non_exhaustive()
    }
}

fn build_schema(
    elements: &TableElements,
    config: &EngineConfig,
) -> Result<LogicalSchema, CreateSourceError> {
    if elements.is_empty() {
        return Err(CreateSourceError::NoColumns);
    }

    for element in elements {
        if system_columns::is_system_column(&element.name) {
            return Err(CreateSourceError::ReservedColumnName(element.name.clone()));
        }

        if !config.any_key_name_enabled {
            let is_rowkey = element.name.text() == system_columns::ROWKEY;
            if element.namespace.is_key() && !is_rowkey {
                return Err(CreateSourceError::InvalidKeyColumnName(element.name.clone()));
            }
            if !element.namespace.is_key() && is_rowkey {
                return Err(CreateSourceError::RowKeyAsValueColumn(element.name.clone()));
            }
        }
    }

    Ok(elements.to_logical_schema(!config.any_key_name_enabled)?)
}

fn build_key_field(
    properties: &CreateSourceProperties,
    schema: &LogicalSchema,
) -> Result<Option<ColumnName>, CreateSourceError> {
    let Some(column) = properties.key_field() else {
        return Ok(None);
    };
    if schema.find_value_column(column).is_none() {
        return Err(CreateSourceError::KeyFieldNotFound(column.clone()));
    }
    Ok(Some(column.clone()))
}

fn build_timestamp_column(
    properties: &CreateSourceProperties,
    schema: &LogicalSchema,
    config: &EngineConfig,
) -> Result<Option<TimestampColumn>, CreateSourceError> {
    let timestamp_column = properties.timestamp_column().map(|column| {
        TimestampColumn::new(
            column.clone(),
            properties.timestamp_format().map(str::to_string),
        )
    });

    TimestampExtractionPolicyFactory::validate_timestamp_column(
        config,
        schema,
        timestamp_column.as_ref(),
    )?;
    Ok(timestamp_column)
}
