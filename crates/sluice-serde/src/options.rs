use serde::Serialize;
use std::collections::BTreeSet;

use sluice_ir::{EngineConfig, LogicalSchema};

use crate::error::SerdeError;
use crate::format::Format;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SerdeOption {
    /// Write a single value column bare instead of inside a record.
    UnwrapSingleValues,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SerdeOptions(BTreeSet<SerdeOption>);

impl SerdeOptions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn of(options: impl IntoIterator<Item = SerdeOption>) -> Self {
        Self(options.into_iter().collect())
    }

    pub fn contains(&self, option: SerdeOption) -> bool {
        self.0.contains(&option)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = SerdeOption> + '_ {
        self.0.iter().copied()
    }

    /// Options for a `CREATE STREAM/TABLE` statement.
    ///
    /// `wrap_single_value` is the statement's `WRAP_SINGLE_VALUE` property, if set;
    /// otherwise the engine default applies to single-column schemas in formats
    /// that support wrapping.
    pub fn build_for_create_statement(
        schema: &LogicalSchema,
        value_format: Format,
        wrap_single_value: Option<bool>,
        config: &EngineConfig,
    ) -> Result<Self, SerdeError> {
        let single_field = schema.value().len() == 1;
        let mut options = BTreeSet::new();

        match wrap_single_value {
            Some(wrap) => {
                if !single_field {
                    return Err(SerdeError::WrapSingleValueMultiField);
                }
                if !value_format.supports_wrapping() {
                    return Err(SerdeError::UnsupportedWrapping(value_format));
                }
                if !wrap {
                    options.insert(SerdeOption::UnwrapSingleValues);
                }
            }
            None => {
                if !config.wrap_single_values && single_field && value_format.supports_wrapping()
                {
                    options.insert(SerdeOption::UnwrapSingleValues);
                }
            }
        }

        Ok(Self(options))
    }
}
