//! Serialization formats and the key/value format descriptors of a topic

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::SerdeError;

/// Single-character field separator of `DELIMITED` values.
pub const DELIMITER_PROPERTY: &str = "delimiter";

/// Dotted record name used when registering `AVRO` value schemas.
pub const FULL_SCHEMA_NAME_PROPERTY: &str = "fullSchemaName";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Format {
    Kafka,
    Delimited,
    Json,
    Avro,
}

impl Format {
    /// Case-insensitive lookup by name.
    pub fn of(name: &str) -> Result<Self, SerdeError> {
        match name.to_ascii_uppercase().as_str() {
            "KAFKA" => Ok(Format::Kafka),
            "DELIMITED" => Ok(Format::Delimited),
            "JSON" => Ok(Format::Json),
            "AVRO" => Ok(Format::Avro),
            _ => Err(SerdeError::UnknownFormat(name.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Format::Kafka => "KAFKA",
            Format::Delimited => "DELIMITED",
            Format::Json => "JSON",
            Format::Avro => "AVRO",
        }
    }

    /// Whether a single value column can be written either wrapped in a record or bare.
    pub fn supports_wrapping(self) -> bool {
        matches!(self, Format::Json | Format::Avro)
    }

    pub fn requires_schema_registry(self) -> bool {
        matches!(self, Format::Avro)
    }

    fn supported_properties(self) -> &'static [&'static str] {
        match self {
            Format::Delimited => &[DELIMITER_PROPERTY],
            Format::Avro => &[FULL_SCHEMA_NAME_PROPERTY],
            Format::Kafka | Format::Json => &[],
        }
    }
}

impl FromStr for Format {
    type Err = SerdeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::of(s)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A format plus its validated properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatInfo {
    format: Format,
    properties: BTreeMap<String, String>,
}

impl FormatInfo {
    pub fn of(format: Format) -> Self {
        Self {
            format,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_properties(
        format: Format,
        properties: BTreeMap<String, String>,
    ) -> Result<Self, SerdeError> {
        for (name, value) in &properties {
            if !format.supported_properties().contains(&name.as_str()) {
                return Err(SerdeError::UnsupportedFormatProperty {
                    format,
                    property: name.clone(),
                });
            }

            let valid = match name.as_str() {
                DELIMITER_PROPERTY => value.chars().count() == 1,
                FULL_SCHEMA_NAME_PROPERTY => is_valid_avro_full_name(value),
                _ => true,
            };
            if !valid {
                return Err(SerdeError::InvalidFormatProperty {
                    format,
                    property: name.clone(),
                    value: value.clone(),
                });
            }
        }

        Ok(Self { format, properties })
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn delimiter(&self) -> Option<char> {
        self.property(DELIMITER_PROPERTY)
            .and_then(|d| d.chars().next())
    }

    pub fn full_schema_name(&self) -> Option<&str> {
        self.property(FULL_SCHEMA_NAME_PROPERTY)
    }
}

impl fmt::Display for FormatInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format)?;
        if !self.properties.is_empty() {
            let props: Vec<String> = self
                .properties
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, "({})", props.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WindowType {
    Session,
    Hopping,
    Tumbling,
}

impl WindowType {
    pub fn of(name: &str) -> Result<Self, SerdeError> {
        match name.to_ascii_uppercase().as_str() {
            "SESSION" => Ok(WindowType::Session),
            "HOPPING" => Ok(WindowType::Hopping),
            "TUMBLING" => Ok(WindowType::Tumbling),
            _ => Err(SerdeError::UnknownWindowType(name.to_string())),
        }
    }

    /// Fixed-size windows carry their size; session windows never do.
    pub fn requires_size(self) -> bool {
        !matches!(self, WindowType::Session)
    }
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowType::Session => f.write_str("SESSION"),
            WindowType::Hopping => f.write_str("HOPPING"),
            WindowType::Tumbling => f.write_str("TUMBLING"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct WindowInfo {
    window_type: WindowType,
    size: Option<Duration>,
}

impl WindowInfo {
    pub fn new(window_type: WindowType, size: Option<Duration>) -> Result<Self, SerdeError> {
        match (window_type.requires_size(), size) {
            (true, None) => Err(SerdeError::InvalidWindow(format!(
                "{} windows require a size",
                window_type
            ))),
            (false, Some(_)) => Err(SerdeError::InvalidWindow(format!(
                "{} windows do not have a size",
                window_type
            ))),
            (_, Some(size)) if size.is_zero() => Err(SerdeError::InvalidWindow(
                "window size must be positive".to_string(),
            )),
            _ => Ok(Self { window_type, size }),
        }
    }

    pub fn window_type(&self) -> WindowType {
        self.window_type
    }

    pub fn size(&self) -> Option<Duration> {
        self.size
    }
}

/// Key format of a topic. Keys are always `KAFKA` encoded, optionally windowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyFormat {
    format_info: FormatInfo,
    window: Option<WindowInfo>,
}

impl KeyFormat {
    pub fn non_windowed(format_info: FormatInfo) -> Self {
        Self {
            format_info,
            window: None,
        }
    }

    pub fn windowed(format_info: FormatInfo, window: WindowInfo) -> Self {
        Self {
            format_info,
            window: Some(window),
        }
    }

    pub fn format(&self) -> Format {
        self.format_info.format()
    }

    pub fn format_info(&self) -> &FormatInfo {
        &self.format_info
    }

    pub fn window(&self) -> Option<&WindowInfo> {
        self.window.as_ref()
    }

    pub fn is_windowed(&self) -> bool {
        self.window.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueFormat {
    format_info: FormatInfo,
}

impl ValueFormat {
    pub fn of(format_info: FormatInfo) -> Self {
        Self { format_info }
    }

    pub fn format(&self) -> Format {
        self.format_info.format()
    }

    pub fn format_info(&self) -> &FormatInfo {
        &self.format_info
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_avro_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Dot-separated Avro names, e.g. `io.sluice.Order`.
pub fn is_valid_avro_full_name(name: &str) -> bool {
    name.split('.').all(is_valid_avro_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_format_lookup_case_insensitive() {
        assert_eq!(Format::of("json").unwrap(), Format::Json);
        assert_eq!("Avro".parse::<Format>().unwrap(), Format::Avro);
        assert_matches!(Format::of("protobuf"), Err(SerdeError::UnknownFormat(name)) if name == "protobuf");
    }

    #[test]
    fn test_wrapping_support() {
        assert!(Format::Json.supports_wrapping());
        assert!(Format::Avro.supports_wrapping());
        assert!(!Format::Kafka.supports_wrapping());
        assert!(!Format::Delimited.supports_wrapping());
    }

    #[test]
    fn test_format_properties_validated_per_format() {
        let props = BTreeMap::from([(DELIMITER_PROPERTY.to_string(), "|".to_string())]);
        let info = FormatInfo::with_properties(Format::Delimited, props.clone()).unwrap();
        assert_eq!(info.delimiter(), Some('|'));

        assert_matches!(
            FormatInfo::with_properties(Format::Json, props),
            Err(SerdeError::UnsupportedFormatProperty { format: Format::Json, .. })
        );

        let long = BTreeMap::from([(DELIMITER_PROPERTY.to_string(), "||".to_string())]);
        assert_matches!(
            FormatInfo::with_properties(Format::Delimited, long),
            Err(SerdeError::InvalidFormatProperty { .. })
        );
    }

    #[test]
    fn test_avro_names() {
        assert!(is_valid_avro_name("SLUICE_COL_0"));
        assert!(is_valid_avro_name("_hidden"));
        assert!(!is_valid_avro_name("1st"));
        assert!(!is_valid_avro_name("with space"));
        assert!(!is_valid_avro_name(""));
        assert!(is_valid_avro_full_name("io.sluice.Order"));
        assert!(!is_valid_avro_full_name("io..Order"));
    }

    #[test]
    fn test_window_size_rules() {
        assert!(WindowInfo::new(WindowType::Session, None).is_ok());
        assert!(WindowInfo::new(WindowType::Tumbling, Some(Duration::from_secs(60))).is_ok());
        assert_matches!(
            WindowInfo::new(WindowType::Hopping, None),
            Err(SerdeError::InvalidWindow(_))
        );
        assert_matches!(
            WindowInfo::new(WindowType::Session, Some(Duration::from_secs(1))),
            Err(SerdeError::InvalidWindow(_))
        );
    }
}
