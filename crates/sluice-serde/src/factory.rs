//! Key and value serde construction
//!
//! Building a serde validates that the format can represent the schema. The
//! returned handles hold no codec state at this layer; the runtime attaches
//! codecs when a query starts.

use std::sync::Arc;

use sluice_ir::{Column, EngineConfig, SqlType};
use tracing::debug;

use crate::error::SerdeError;
use crate::format::{is_valid_avro_name, Format, FormatInfo, KeyFormat};
use crate::physical::PersistenceSchema;
use crate::registry::{SchemaRegistryClient, SchemaRegistryClientFactory};

#[derive(Debug)]
pub struct KeySerde {
    format: KeyFormat,
    schema: PersistenceSchema,
    logger_name: String,
}

impl KeySerde {
    pub fn format(&self) -> &KeyFormat {
        &self.format
    }

    pub fn schema(&self) -> &PersistenceSchema {
        &self.schema
    }

    pub fn logger_name(&self) -> &str {
        &self.logger_name
    }

    pub fn close(self) {
        debug!(logger = %self.logger_name, "closed key serde");
    }
}

#[derive(Debug)]
pub struct ValueSerde {
    format: FormatInfo,
    schema: PersistenceSchema,
    logger_name: String,
    registry: Option<Arc<dyn SchemaRegistryClient>>,
}

impl ValueSerde {
    pub fn format(&self) -> &FormatInfo {
        &self.format
    }

    pub fn schema(&self) -> &PersistenceSchema {
        &self.schema
    }

    pub fn logger_name(&self) -> &str {
        &self.logger_name
    }

    pub fn registry(&self) -> Option<&Arc<dyn SchemaRegistryClient>> {
        self.registry.as_ref()
    }

    pub fn close(self) {
        debug!(logger = %self.logger_name, "closed value serde");
    }
}

pub trait KeySerdeFactory: Send + Sync {
    fn create(
        &self,
        format: &KeyFormat,
        schema: &PersistenceSchema,
        config: &EngineConfig,
        registry: &dyn SchemaRegistryClientFactory,
        logger_name: &str,
    ) -> Result<KeySerde, SerdeError>;
}

pub trait ValueSerdeFactory: Send + Sync {
    fn create(
        &self,
        format: &FormatInfo,
        schema: &PersistenceSchema,
        config: &EngineConfig,
        registry: &dyn SchemaRegistryClientFactory,
        logger_name: &str,
    ) -> Result<ValueSerde, SerdeError>;
}

/// Key serdes for `KAFKA` keys of at most one primitive column.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericKeySerde;

impl KeySerdeFactory for GenericKeySerde {
    fn create(
        &self,
        format: &KeyFormat,
        schema: &PersistenceSchema,
        _config: &EngineConfig,
        _registry: &dyn SchemaRegistryClientFactory,
        logger_name: &str,
    ) -> Result<KeySerde, SerdeError> {
        if format.format() != Format::Kafka {
            return Err(SerdeError::UnsupportedKeyFormat(format.format()));
        }
        if schema.columns().len() > 1 {
            return Err(SerdeError::SingleFieldRequired {
                format: Format::Kafka,
                columns: schema.describe_columns(),
            });
        }
        check_types(Format::Kafka, schema.columns(), is_kafka_type)?;

        debug!(
            logger = logger_name,
            windowed = format.is_windowed(),
            "created key serde"
        );
        Ok(KeySerde {
            format: format.clone(),
            schema: schema.clone(),
            logger_name: logger_name.to_string(),
        })
    }
}

/// Row serdes for every value format.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericRowSerde;

impl ValueSerdeFactory for GenericRowSerde {
    fn create(
        &self,
        format: &FormatInfo,
        schema: &PersistenceSchema,
        _config: &EngineConfig,
        registry: &dyn SchemaRegistryClientFactory,
        logger_name: &str,
    ) -> Result<ValueSerde, SerdeError> {
        let mut client = None;

        match format.format() {
            Format::Kafka => {
                if schema.columns().len() != 1 {
                    return Err(SerdeError::SingleFieldRequired {
                        format: Format::Kafka,
                        columns: schema.describe_columns(),
                    });
                }
                check_types(Format::Kafka, schema.columns(), is_kafka_type)?;
            }
            Format::Delimited => {
                check_types(Format::Delimited, schema.columns(), SqlType::is_primitive)?;
            }
            Format::Json => {}
            Format::Avro => {
                client = Some(registry.create()?);
                for column in schema.columns() {
                    check_avro_names(column.name().text(), column.sql_type())?;
                }
            }
        }

        debug!(
            logger = logger_name,
            format = %format,
            unwrapped = schema.is_unwrapped(),
            "created value serde"
        );
        Ok(ValueSerde {
            format: format.clone(),
            schema: schema.clone(),
            logger_name: logger_name.to_string(),
            registry: client,
        })
    }
}

fn is_kafka_type(sql_type: &SqlType) -> bool {
    matches!(
        sql_type,
        SqlType::Integer | SqlType::Bigint | SqlType::Double | SqlType::String
    )
}

fn check_types(
    format: Format,
    columns: &[Column],
    supported: impl Fn(&SqlType) -> bool,
) -> Result<(), SerdeError> {
    match columns.iter().find(|c| !supported(c.sql_type())) {
        Some(column) => Err(SerdeError::UnsupportedType {
            format,
            sql_type: column.sql_type().to_string(),
        }),
        None => Ok(()),
    }
}

fn check_avro_names(name: &str, sql_type: &SqlType) -> Result<(), SerdeError> {
    if !is_valid_avro_name(name) {
        return Err(SerdeError::InvalidName {
            format: Format::Avro,
            name: name.to_string(),
        });
    }
    check_nested_avro_names(sql_type)
}

/// Struct fields at any depth, including inside arrays and maps.
fn check_nested_avro_names(sql_type: &SqlType) -> Result<(), SerdeError> {
    match sql_type {
        SqlType::Struct(fields) => fields
            .fields()
            .iter()
            .try_for_each(|f| check_avro_names(&f.name, &f.sql_type)),
        SqlType::Array(element) => check_nested_avro_names(element),
        SqlType::Map(value) => check_nested_avro_names(value),
        _ => Ok(()),
    }
}
