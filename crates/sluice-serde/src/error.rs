use thiserror::Error;

use crate::format::Format;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeError {
    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    #[error("Unknown window type: {0}")]
    UnknownWindowType(String),

    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    #[error("'WRAP_SINGLE_VALUE' is only valid for single-field value schemas")]
    WrapSingleValueMultiField,

    #[error("'WRAP_SINGLE_VALUE' can not be used with format '{0}' as it does not support wrapping")]
    UnsupportedWrapping(Format),

    #[error("Format '{format}' does not support property '{property}'")]
    UnsupportedFormatProperty { format: Format, property: String },

    #[error("Invalid value for property '{property}' of format '{format}': '{value}'")]
    InvalidFormatProperty {
        format: Format,
        property: String,
        value: String,
    },

    #[error("Format '{0}' is not supported for keys")]
    UnsupportedKeyFormat(Format),

    #[error("The '{format}' format does not support type '{sql_type}'")]
    UnsupportedType { format: Format, sql_type: String },

    #[error("The '{format}' format only supports a single field. Got: [{columns}]")]
    SingleFieldRequired { format: Format, columns: String },

    #[error("Unwrapped value schemas require exactly one value column, got {0}")]
    UnwrappedMultiField(usize),

    #[error("Illegal name for format '{format}': '{name}'")]
    InvalidName { format: Format, name: String },

    #[error("Schema registry URL is not configured")]
    SchemaRegistryNotConfigured,
}
