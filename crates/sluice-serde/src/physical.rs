use sluice_ir::{Column, LogicalSchema};

use crate::error::SerdeError;
use crate::options::{SerdeOption, SerdeOptions};

/// The columns one side of a record (key or value) is persisted with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceSchema {
    columns: Vec<Column>,
    unwrapped: bool,
}

impl PersistenceSchema {
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// True when the single column is written bare rather than inside a record.
    pub fn is_unwrapped(&self) -> bool {
        self.unwrapped
    }

    pub(crate) fn describe_columns(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A logical schema as it is laid out on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalSchema {
    logical: LogicalSchema,
    options: SerdeOptions,
    key: PersistenceSchema,
    value: PersistenceSchema,
}

impl PhysicalSchema {
    pub fn from_logical(
        schema: &LogicalSchema,
        options: &SerdeOptions,
    ) -> Result<Self, SerdeError> {
        let unwrap_value = options.contains(SerdeOption::UnwrapSingleValues);
        if unwrap_value && schema.value().len() != 1 {
            return Err(SerdeError::UnwrappedMultiField(schema.value().len()));
        }

        Ok(Self {
            logical: schema.clone(),
            options: options.clone(),
            key: PersistenceSchema {
                columns: schema.key().to_vec(),
                unwrapped: true,
            },
            value: PersistenceSchema {
                columns: schema.value().to_vec(),
                unwrapped: unwrap_value,
            },
        })
    }

    pub fn logical_schema(&self) -> &LogicalSchema {
        &self.logical
    }

    pub fn serde_options(&self) -> &SerdeOptions {
        &self.options
    }

    pub fn key_schema(&self) -> &PersistenceSchema {
        &self.key
    }

    pub fn value_schema(&self) -> &PersistenceSchema {
        &self.value
    }
}
