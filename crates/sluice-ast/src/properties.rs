//! `WITH (...)` clause of `CREATE STREAM` / `CREATE TABLE`

use std::collections::BTreeMap;
use std::time::Duration;

use sluice_ir::{ColumnName, Literal};
use sluice_serde::{Format, SerdeError, WindowInfo, WindowType};
use thiserror::Error;

pub const KAFKA_TOPIC: &str = "KAFKA_TOPIC";
pub const VALUE_FORMAT: &str = "VALUE_FORMAT";
pub const KEY: &str = "KEY";
pub const TIMESTAMP: &str = "TIMESTAMP";
pub const TIMESTAMP_FORMAT: &str = "TIMESTAMP_FORMAT";
pub const WRAP_SINGLE_VALUE: &str = "WRAP_SINGLE_VALUE";
pub const WINDOW_TYPE: &str = "WINDOW_TYPE";
pub const WINDOW_SIZE: &str = "WINDOW_SIZE";
pub const VALUE_DELIMITER: &str = "VALUE_DELIMITER";
pub const VALUE_AVRO_SCHEMA_FULL_NAME: &str = "VALUE_AVRO_SCHEMA_FULL_NAME";

const KNOWN_PROPERTIES: &[&str] = &[
    KAFKA_TOPIC,
    VALUE_FORMAT,
    KEY,
    TIMESTAMP,
    TIMESTAMP_FORMAT,
    WRAP_SINGLE_VALUE,
    WINDOW_TYPE,
    WINDOW_SIZE,
    VALUE_DELIMITER,
    VALUE_AVRO_SCHEMA_FULL_NAME,
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertiesError {
    #[error("Invalid config variable(s) in the WITH clause: {0}")]
    UnknownProperty(String),

    #[error("Duplicate property in the WITH clause: {0}")]
    DuplicateProperty(String),

    #[error("Missing required property \"{0}\" which has no default value.")]
    MissingRequired(&'static str),

    #[error("Invalid value for property {property}: expected {expected}, got {actual}")]
    InvalidType {
        property: &'static str,
        expected: &'static str,
        actual: String,
    },

    #[error("Invalid WINDOW_SIZE '{0}'. Expected '<number> <unit>', e.g. '10 SECONDS'")]
    InvalidWindowSize(String),

    #[error("WINDOW_SIZE set without WINDOW_TYPE")]
    WindowSizeWithoutType,

    #[error("Invalid VALUE_DELIMITER '{0}'. Expected a single character, 'TAB' or 'SPACE'")]
    InvalidDelimiter(String),

    #[error(transparent)]
    Serde(#[from] SerdeError),
}

/// Typed, validated `WITH` properties.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateSourceProperties {
    kafka_topic: String,
    value_format: Format,
    key_field: Option<ColumnName>,
    timestamp_column: Option<ColumnName>,
    timestamp_format: Option<String>,
    wrap_single_values: Option<bool>,
    window: Option<WindowInfo>,
    value_delimiter: Option<char>,
    value_avro_schema_full_name: Option<String>,
}

impl CreateSourceProperties {
    /// Minimal properties: a topic and a value format.
    pub fn new(kafka_topic: impl Into<String>, value_format: Format) -> Self {
        Self {
            kafka_topic: kafka_topic.into(),
            value_format,
            key_field: None,
            timestamp_column: None,
            timestamp_format: None,
            wrap_single_values: None,
            window: None,
            value_delimiter: None,
            value_avro_schema_full_name: None,
        }
    }

    /// Validate raw `name = literal` pairs. Names are case-insensitive.
    pub fn from_literals(literals: BTreeMap<String, Literal>) -> Result<Self, PropertiesError> {
        let mut props: BTreeMap<String, Literal> = BTreeMap::new();
        let mut unknown = Vec::new();
        for (name, value) in literals {
            let upper = name.to_ascii_uppercase();
            if !KNOWN_PROPERTIES.contains(&upper.as_str()) {
                unknown.push(name);
                continue;
            }
            if props.insert(upper.clone(), value).is_some() {
                return Err(PropertiesError::DuplicateProperty(upper));
            }
        }
        if !unknown.is_empty() {
            return Err(PropertiesError::UnknownProperty(unknown.join(", ")));
        }

        let kafka_topic =
            string(&props, KAFKA_TOPIC)?.ok_or(PropertiesError::MissingRequired(KAFKA_TOPIC))?;
        let value_format = string(&props, VALUE_FORMAT)?
            .ok_or(PropertiesError::MissingRequired(VALUE_FORMAT))?;
        let value_format = Format::of(&value_format)?;

        let window_type = string(&props, WINDOW_TYPE)?
            .map(|t| WindowType::of(&t))
            .transpose()?;
        let window_size = string(&props, WINDOW_SIZE)?
            .map(|s| parse_window_size(&s))
            .transpose()?;
        let window = match (window_type, window_size) {
            (Some(window_type), size) => Some(WindowInfo::new(window_type, size)?),
            (None, Some(_)) => return Err(PropertiesError::WindowSizeWithoutType),
            (None, None) => None,
        };

        let value_delimiter = string(&props, VALUE_DELIMITER)?
            .map(|d| parse_delimiter(&d))
            .transpose()?;

        Ok(Self {
            kafka_topic,
            value_format,
            key_field: string(&props, KEY)?.map(|k| column_name(&k)),
            timestamp_column: string(&props, TIMESTAMP)?.map(|t| column_name(&t)),
            timestamp_format: string(&props, TIMESTAMP_FORMAT)?,
            wrap_single_values: boolean(&props, WRAP_SINGLE_VALUE)?,
            window,
            value_delimiter,
            value_avro_schema_full_name: string(&props, VALUE_AVRO_SCHEMA_FULL_NAME)?,
        })
    }

    pub fn with_key_field(mut self, column: ColumnName) -> Self {
        self.key_field = Some(column);
        self
    }

    pub fn with_timestamp(mut self, column: ColumnName, format: Option<String>) -> Self {
        self.timestamp_column = Some(column);
        self.timestamp_format = format;
        self
    }

    pub fn with_wrap_single_values(mut self, wrap: bool) -> Self {
        self.wrap_single_values = Some(wrap);
        self
    }

    pub fn with_window(mut self, window: WindowInfo) -> Self {
        self.window = Some(window);
        self
    }

    pub fn kafka_topic(&self) -> &str {
        &self.kafka_topic
    }

    pub fn value_format(&self) -> Format {
        self.value_format
    }

    pub fn key_field(&self) -> Option<&ColumnName> {
        self.key_field.as_ref()
    }

    pub fn timestamp_column(&self) -> Option<&ColumnName> {
        self.timestamp_column.as_ref()
    }

    pub fn timestamp_format(&self) -> Option<&str> {
        self.timestamp_format.as_deref()
    }

    pub fn wrap_single_values(&self) -> Option<bool> {
        self.wrap_single_values
    }

    pub fn window(&self) -> Option<&WindowInfo> {
        self.window.as_ref()
    }

    pub fn value_delimiter(&self) -> Option<char> {
        self.value_delimiter
    }

    pub fn value_avro_schema_full_name(&self) -> Option<&str> {
        self.value_avro_schema_full_name.as_deref()
    }
}

fn string(
    props: &BTreeMap<String, Literal>,
    name: &'static str,
) -> Result<Option<String>, PropertiesError> {
    match props.get(name) {
        None => Ok(None),
        Some(Literal::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(PropertiesError::InvalidType {
            property: name,
            expected: "a string",
            actual: other.to_string(),
        }),
    }
}

fn boolean(
    props: &BTreeMap<String, Literal>,
    name: &'static str,
) -> Result<Option<bool>, PropertiesError> {
    match props.get(name) {
        None => Ok(None),
        Some(Literal::Boolean(b)) => Ok(Some(*b)),
        Some(Literal::String(s)) if s.eq_ignore_ascii_case("true") => Ok(Some(true)),
        Some(Literal::String(s)) if s.eq_ignore_ascii_case("false") => Ok(Some(false)),
        Some(other) => Err(PropertiesError::InvalidType {
            property: name,
            expected: "a boolean",
            actual: other.to_string(),
        }),
    }
}

/// Unquoted names are upper-cased; backtick-quoted names are taken verbatim.
fn column_name(text: &str) -> ColumnName {
    match text
        .strip_prefix('`')
        .and_then(|inner| inner.strip_suffix('`'))
    {
        Some(quoted) => ColumnName::of(quoted),
        None => ColumnName::of(text.to_ascii_uppercase()),
    }
}

fn parse_window_size(text: &str) -> Result<Duration, PropertiesError> {
    let invalid = || PropertiesError::InvalidWindowSize(text.to_string());

    let mut parts = text.split_whitespace();
    let (amount, unit) = match (parts.next(), parts.next(), parts.next()) {
        (Some(amount), Some(unit), None) => (amount, unit),
        _ => return Err(invalid()),
    };
    let amount: u64 = amount.parse().map_err(|_| invalid())?;

    let unit = unit.to_ascii_uppercase();
    let unit = unit.strip_suffix('S').unwrap_or(&unit);
    let millis_per_unit = match unit {
        "MILLISECOND" => 1,
        "SECOND" => 1_000,
        "MINUTE" => 60_000,
        "HOUR" => 3_600_000,
        "DAY" => 86_400_000,
        _ => return Err(invalid()),
    };

    amount
        .checked_mul(millis_per_unit)
        .map(Duration::from_millis)
        .ok_or_else(invalid)
}

fn parse_delimiter(text: &str) -> Result<char, PropertiesError> {
    match text.to_ascii_uppercase().as_str() {
        "TAB" => return Ok('\t'),
        "SPACE" => return Ok(' '),
        _ => {}
    }
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(PropertiesError::InvalidDelimiter(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn literals(pairs: &[(&str, Literal)]) -> BTreeMap<String, Literal> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn s(value: &str) -> Literal {
        Literal::String(value.to_string())
    }

    #[test]
    fn test_minimal_properties() {
        let props = CreateSourceProperties::from_literals(literals(&[
            ("kafka_topic", s("orders")),
            ("value_format", s("json")),
        ]))
        .unwrap();

        assert_eq!(props.kafka_topic(), "orders");
        assert_eq!(props.value_format(), Format::Json);
        assert_eq!(props.key_field(), None);
        assert_eq!(props.window(), None);
        assert_eq!(props.wrap_single_values(), None);
    }

    #[test]
    fn test_all_properties() {
        let props = CreateSourceProperties::from_literals(literals(&[
            (KAFKA_TOPIC, s("orders")),
            (VALUE_FORMAT, s("DELIMITED")),
            (KEY, s("id")),
            (TIMESTAMP, s("`eventTime`")),
            (TIMESTAMP_FORMAT, s("%Y-%m-%d")),
            (WRAP_SINGLE_VALUE, Literal::Boolean(false)),
            (WINDOW_TYPE, s("hopping")),
            (WINDOW_SIZE, s("30 SECONDS")),
            (VALUE_DELIMITER, s("TAB")),
        ]))
        .unwrap();

        assert_eq!(props.key_field(), Some(&ColumnName::of("ID")));
        assert_eq!(props.timestamp_column(), Some(&ColumnName::of("eventTime")));
        assert_eq!(props.timestamp_format(), Some("%Y-%m-%d"));
        assert_eq!(props.wrap_single_values(), Some(false));
        assert_eq!(props.value_delimiter(), Some('\t'));

        let window = props.window().unwrap();
        assert_eq!(window.window_type(), WindowType::Hopping);
        assert_eq!(window.size(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_missing_required() {
        let result = CreateSourceProperties::from_literals(literals(&[(VALUE_FORMAT, s("JSON"))]));
        assert_matches!(result, Err(PropertiesError::MissingRequired(KAFKA_TOPIC)));

        let result = CreateSourceProperties::from_literals(literals(&[(KAFKA_TOPIC, s("t"))]));
        assert_matches!(result, Err(PropertiesError::MissingRequired(VALUE_FORMAT)));
    }

    #[test]
    fn test_unknown_and_mistyped() {
        let result = CreateSourceProperties::from_literals(literals(&[
            (KAFKA_TOPIC, s("t")),
            (VALUE_FORMAT, s("JSON")),
            ("PARTITIONS", Literal::Integer(4)),
        ]));
        assert_matches!(result, Err(PropertiesError::UnknownProperty(name)) if name == "PARTITIONS");

        let result = CreateSourceProperties::from_literals(literals(&[
            (KAFKA_TOPIC, Literal::Integer(1)),
            (VALUE_FORMAT, s("JSON")),
        ]));
        assert_matches!(result, Err(PropertiesError::InvalidType { property: KAFKA_TOPIC, .. }));
    }

    #[test]
    fn test_duplicate_after_case_folding() {
        let result = CreateSourceProperties::from_literals(literals(&[
            ("KAFKA_TOPIC", s("a")),
            ("kafka_topic", s("b")),
            (VALUE_FORMAT, s("JSON")),
        ]));

        assert_matches!(result, Err(PropertiesError::DuplicateProperty(name)) if name == KAFKA_TOPIC);
    }

    #[test]
    fn test_window_rules() {
        let base = [(KAFKA_TOPIC, s("t")), (VALUE_FORMAT, s("JSON"))];

        let mut size_only = base.to_vec();
        size_only.push((WINDOW_SIZE, s("1 MINUTE")));
        assert_matches!(
            CreateSourceProperties::from_literals(literals(&size_only)),
            Err(PropertiesError::WindowSizeWithoutType)
        );

        let mut tumbling = base.to_vec();
        tumbling.push((WINDOW_TYPE, s("TUMBLING")));
        assert_matches!(
            CreateSourceProperties::from_literals(literals(&tumbling)),
            Err(PropertiesError::Serde(SerdeError::InvalidWindow(_)))
        );

        let mut bad_size = base.to_vec();
        bad_size.push((WINDOW_TYPE, s("TUMBLING")));
        bad_size.push((WINDOW_SIZE, s("ten SECONDS")));
        assert_matches!(
            CreateSourceProperties::from_literals(literals(&bad_size)),
            Err(PropertiesError::InvalidWindowSize(_))
        );

        let mut session = base.to_vec();
        session.push((WINDOW_TYPE, s("SESSION")));
        let props = CreateSourceProperties::from_literals(literals(&session)).unwrap();
        assert_eq!(props.window().map(|w| w.window_type()), Some(WindowType::Session));
    }

    #[test]
    fn test_window_size_units() {
        assert_eq!(parse_window_size("500 MILLISECONDS").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_window_size("1 hour").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_window_size("2 DAYS").unwrap(), Duration::from_secs(172_800));
        assert!(parse_window_size("2").is_err());
        assert!(parse_window_size("2 WEEKS").is_err());
    }

    #[test]
    fn test_unknown_format() {
        let result = CreateSourceProperties::from_literals(literals(&[
            (KAFKA_TOPIC, s("t")),
            (VALUE_FORMAT, s("XML")),
        ]));

        assert_matches!(result, Err(PropertiesError::Serde(SerdeError::UnknownFormat(_))));
    }
}
