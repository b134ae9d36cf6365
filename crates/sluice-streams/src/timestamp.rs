//! Timestamp extraction policies
//!
//! A source either takes record timestamps from topic metadata or reads them
//! from a column named by `TIMESTAMP`, optionally parsed with `TIMESTAMP_FORMAT`.

use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use sluice_ir::{ColumnName, EngineConfig, GenericRow, LogicalSchema, SqlType, Value};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("The TIMESTAMP column set in the WITH clause does not exist in the schema: '{0}'")]
    ColumnNotFound(ColumnName),

    #[error("Timestamp column, `{column}`, should be STRING when TIMESTAMP_FORMAT is set, but was {sql_type}")]
    FormatRequiresString { column: ColumnName, sql_type: String },

    #[error("Timestamp column, `{0}`, is STRING, which requires TIMESTAMP_FORMAT to be set")]
    MissingFormat(ColumnName),

    #[error("Timestamp column, `{column}`, should be BIGINT or a STRING with a TIMESTAMP_FORMAT specified, but was {sql_type}")]
    UnsupportedType { column: ColumnName, sql_type: String },

    #[error("Invalid TIMESTAMP_FORMAT: '{0}'")]
    InvalidFormat(String),

    #[error("Unable to extract a timestamp from column `{column}`: '{value}'")]
    InvalidTimestamp { column: ColumnName, value: String },
}

/// The `TIMESTAMP` / `TIMESTAMP_FORMAT` pair of a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampColumn {
    column: ColumnName,
    format: Option<String>,
}

impl TimestampColumn {
    pub fn new(column: ColumnName, format: Option<String>) -> Self {
        Self { column, format }
    }

    pub fn column(&self) -> &ColumnName {
        &self.column
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampExtractionPolicy {
    /// Record timestamp from the topic.
    Metadata,
    /// Epoch milliseconds held in a `BIGINT` value column.
    LongColumn {
        column: ColumnName,
        index: usize,
        throw_on_invalid: bool,
    },
    /// A `STRING` value column parsed with a strftime pattern, read as UTC.
    StringColumn {
        column: ColumnName,
        index: usize,
        format: String,
        throw_on_invalid: bool,
    },
}

impl TimestampExtractionPolicy {
    pub fn timestamp_column(&self) -> Option<&ColumnName> {
        match self {
            TimestampExtractionPolicy::Metadata => None,
            TimestampExtractionPolicy::LongColumn { column, .. }
            | TimestampExtractionPolicy::StringColumn { column, .. } => Some(column),
        }
    }

    /// Epoch milliseconds for `row`. `Ok(None)` means the row should be skipped.
    pub fn extract(
        &self,
        row: &GenericRow,
        metadata_timestamp: i64,
    ) -> Result<Option<i64>, TimestampError> {
        let (column, throw_on_invalid, parsed) = match self {
            TimestampExtractionPolicy::Metadata => return Ok(Some(metadata_timestamp)),
            TimestampExtractionPolicy::LongColumn {
                column,
                index,
                throw_on_invalid,
            } => {
                let parsed = match row.get(*index) {
                    Some(Value::Bigint(millis)) => Ok(*millis),
                    other => Err(describe(other)),
                };
                (column, *throw_on_invalid, parsed)
            }
            TimestampExtractionPolicy::StringColumn {
                column,
                index,
                format,
                throw_on_invalid,
            } => {
                let parsed = match row.get(*index) {
                    Some(Value::String(text)) => parse_timestamp(text, format).ok_or_else(|| text.clone()),
                    other => Err(describe(other)),
                };
                (column, *throw_on_invalid, parsed)
            }
        };

        match parsed {
            Ok(millis) => Ok(Some(millis)),
            Err(value) if throw_on_invalid => Err(TimestampError::InvalidTimestamp {
                column: column.clone(),
                value,
            }),
            Err(value) => {
                tracing::warn!(column = %column, value = %value, "skipping record with invalid timestamp");
                Ok(None)
            }
        }
    }
}

fn describe(value: Option<&Value>) -> String {
    value.map_or_else(|| "<missing>".to_string(), |v| v.to_string())
}

fn parse_timestamp(text: &str, format: &str) -> Option<i64> {
    if let Ok(date_time) = NaiveDateTime::parse_from_str(text, format) {
        return Some(date_time.and_utc().timestamp_millis());
    }
    NaiveDate::parse_from_str(text, format)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date_time| date_time.and_utc().timestamp_millis())
}

pub struct TimestampExtractionPolicyFactory;

impl TimestampExtractionPolicyFactory {
    pub fn create(
        config: &EngineConfig,
        schema: &LogicalSchema,
        timestamp_column: Option<&TimestampColumn>,
    ) -> Result<TimestampExtractionPolicy, TimestampError> {
        let Some(timestamp_column) = timestamp_column else {
            return Ok(TimestampExtractionPolicy::Metadata);
        };

        let name = timestamp_column.column();
        let column = schema
            .find_value_column(name)
            .ok_or_else(|| TimestampError::ColumnNotFound(name.clone()))?;
        let throw_on_invalid = config.timestamp_throw_on_invalid;

        match (timestamp_column.format(), column.sql_type()) {
            (Some(format), SqlType::String) => {
                validate_format(format)?;
                Ok(TimestampExtractionPolicy::StringColumn {
                    column: name.clone(),
                    index: column.index(),
                    format: format.to_string(),
                    throw_on_invalid,
                })
            }
            (Some(_), other) => Err(TimestampError::FormatRequiresString {
                column: name.clone(),
                sql_type: other.to_string(),
            }),
            (None, SqlType::Bigint) => Ok(TimestampExtractionPolicy::LongColumn {
                column: name.clone(),
                index: column.index(),
                throw_on_invalid,
            }),
            (None, SqlType::String) => Err(TimestampError::MissingFormat(name.clone())),
            (None, other) => Err(TimestampError::UnsupportedType {
                column: name.clone(),
                sql_type: other.to_string(),
            }),
        }
    }

    /// Builds and discards the policy; only the validation matters.
    pub fn validate_timestamp_column(
        config: &EngineConfig,
        schema: &LogicalSchema,
        timestamp_column: Option<&TimestampColumn>,
    ) -> Result<(), TimestampError> {
        Self::create(config, schema, timestamp_column).map(|_| ())
    }
}

fn validate_format(format: &str) -> Result<(), TimestampError> {
    let mut items = StrftimeItems::new(format).peekable();
    if items.peek().is_none() || items.any(|item| matches!(item, Item::Error)) {
        return Err(TimestampError::InvalidFormat(format.to_string()));
    }
    Ok(())
}
