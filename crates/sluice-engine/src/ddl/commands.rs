use sluice_ir::{ColumnName, DataSourceType, LogicalSchema, SourceName};
use sluice_serde::{KeyFormat, PhysicalSchema, SerdeError, SerdeOptions, ValueFormat, WindowInfo};
use sluice_streams::TimestampColumn;

/// Key format, value format and serde options of a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formats {
    pub key_format: KeyFormat,
    pub value_format: ValueFormat,
    pub options: SerdeOptions,
}

impl Formats {
    pub fn new(key_format: KeyFormat, value_format: ValueFormat, options: SerdeOptions) -> Self {
        Self {
            key_format,
            value_format,
            options,
        }
    }
}

/// A validated `CREATE STREAM` / `CREATE TABLE`, ready to register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSourceCommand {
    pub source_type: DataSourceType,
    pub source_name: SourceName,
    pub schema: LogicalSchema,
    pub key_field: Option<ColumnName>,
    pub timestamp_column: Option<TimestampColumn>,
    pub topic_name: String,
    pub formats: Formats,
    pub window_info: Option<WindowInfo>,
}

impl CreateSourceCommand {
    pub fn physical_schema(&self) -> Result<PhysicalSchema, SerdeError> {
        PhysicalSchema::from_logical(&self.schema, &self.formats.options)
    }
}
