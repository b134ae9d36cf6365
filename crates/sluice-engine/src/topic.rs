//! Topic descriptors built from `WITH` properties

use std::collections::BTreeMap;

use sluice_ast::CreateSourceProperties;
use sluice_serde::{
    Format, FormatInfo, KeyFormat, SerdeError, ValueFormat, DELIMITER_PROPERTY,
    FULL_SCHEMA_NAME_PROPERTY,
};

/// The topic a source reads from and how its records are encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    kafka_topic_name: String,
    key_format: KeyFormat,
    value_format: ValueFormat,
}

impl Topic {
    pub fn new(kafka_topic_name: impl Into<String>, key_format: KeyFormat, value_format: ValueFormat) -> Self {
        Self {
            kafka_topic_name: kafka_topic_name.into(),
            key_format,
            value_format,
        }
    }

    pub fn kafka_topic_name(&self) -> &str {
        &self.kafka_topic_name
    }

    pub fn key_format(&self) -> &KeyFormat {
        &self.key_format
    }

    pub fn value_format(&self) -> &ValueFormat {
        &self.value_format
    }
}

pub struct TopicFactory;

impl TopicFactory {
    /// Keys are always `KAFKA`, windowed when the statement names a window.
    pub fn create(properties: &CreateSourceProperties) -> Result<Topic, SerdeError> {
        let key_info = FormatInfo::of(Format::Kafka);
        let key_format = match properties.window() {
            Some(window) => KeyFormat::windowed(key_info, *window),
            None => KeyFormat::non_windowed(key_info),
        };

        let mut format_properties = BTreeMap::new();
        if let Some(delimiter) = properties.value_delimiter() {
            format_properties.insert(DELIMITER_PROPERTY.to_string(), delimiter.to_string());
        }
        if let Some(name) = properties.value_avro_schema_full_name() {
            format_properties.insert(FULL_SCHEMA_NAME_PROPERTY.to_string(), name.to_string());
        }
        let value_info = FormatInfo::with_properties(properties.value_format(), format_properties)?;

        Ok(Topic::new(
            properties.kafka_topic(),
            key_format,
            ValueFormat::of(value_info),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use sluice_ir::Literal;
    use sluice_serde::{WindowInfo, WindowType};
    use std::time::Duration;

    #[test]
    fn test_plain_topic() {
        let topic = TopicFactory::create(&CreateSourceProperties::new("orders", Format::Json)).unwrap();

        assert_eq!(topic.kafka_topic_name(), "orders");
        assert_eq!(topic.key_format().format(), Format::Kafka);
        assert!(!topic.key_format().is_windowed());
        assert_eq!(topic.value_format().format(), Format::Json);
        assert!(topic.value_format().format_info().properties().is_empty());
    }

    #[test]
    fn test_windowed_key() {
        let window = WindowInfo::new(WindowType::Tumbling, Some(Duration::from_secs(10))).unwrap();
        let props = CreateSourceProperties::new("orders", Format::Json).with_window(window);

        let topic = TopicFactory::create(&props).unwrap();

        assert_eq!(topic.key_format().window(), Some(&window));
    }

    fn properties(pairs: &[(&str, &str)]) -> CreateSourceProperties {
        CreateSourceProperties::from_literals(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), Literal::String(v.to_string())))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_avro_full_name_property() {
        let props = properties(&[
            ("KAFKA_TOPIC", "orders"),
            ("VALUE_FORMAT", "AVRO"),
            ("VALUE_AVRO_SCHEMA_FULL_NAME", "io.sluice.Order"),
        ]);

        let topic = TopicFactory::create(&props).unwrap();

        assert_eq!(
            topic.value_format().format_info().full_schema_name(),
            Some("io.sluice.Order")
        );
    }

    #[test]
    fn test_invalid_avro_name_rejected() {
        let props = properties(&[
            ("KAFKA_TOPIC", "orders"),
            ("VALUE_FORMAT", "AVRO"),
            ("VALUE_AVRO_SCHEMA_FULL_NAME", "io..Order"),
        ]);

        assert_matches!(
            TopicFactory::create(&props),
            Err(SerdeError::InvalidFormatProperty { .. })
        );
    }

    #[test]
    fn test_delimiter_only_for_delimited() {
        let delimited = properties(&[
            ("KAFKA_TOPIC", "orders"),
            ("VALUE_FORMAT", "DELIMITED"),
            ("VALUE_DELIMITER", "TAB"),
        ]);
        let json = properties(&[
            ("KAFKA_TOPIC", "orders"),
            ("VALUE_FORMAT", "JSON"),
            ("VALUE_DELIMITER", "|"),
        ]);

        let topic = TopicFactory::create(&delimited).unwrap();
        assert_eq!(topic.value_format().format_info().delimiter(), Some('\t'));
        assert_matches!(
            TopicFactory::create(&json),
            Err(SerdeError::UnsupportedFormatProperty { .. })
        );
    }
}
