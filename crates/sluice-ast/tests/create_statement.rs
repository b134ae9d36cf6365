use std::collections::BTreeMap;

use sluice_ast::{CreateSource, CreateSourceProperties, TableElement, TableElements};
use sluice_ir::{DataSourceType, Literal, SqlType};
use sluice_serde::Format;

#[test]
fn test_stream_statement_from_with_clause() {
    let with_clause = BTreeMap::from([
        ("KAFKA_TOPIC".to_string(), Literal::String("pageviews".to_string())),
        ("VALUE_FORMAT".to_string(), Literal::String("avro".to_string())),
        (
            "VALUE_AVRO_SCHEMA_FULL_NAME".to_string(),
            Literal::String("io.sluice.PageView".to_string()),
        ),
    ]);
    let properties = CreateSourceProperties::from_literals(with_clause).unwrap();

    let statement = CreateSource::stream(
        "PAGEVIEWS",
        TableElements::of(vec![
            TableElement::value("VIEWTIME", SqlType::Bigint),
            TableElement::value("USERID", SqlType::String),
        ]),
        properties,
    )
    .if_not_exists();

    assert_eq!(statement.source_type, DataSourceType::Stream);
    assert!(statement.not_exists);
    assert_eq!(statement.properties.value_format(), Format::Avro);
    assert_eq!(
        statement.properties.value_avro_schema_full_name(),
        Some("io.sluice.PageView")
    );

    let schema = statement.elements.to_logical_schema(true).unwrap();
    assert_eq!(
        schema.to_string(),
        "`ROWKEY` STRING KEY, `VIEWTIME` BIGINT, `USERID` STRING"
    );
}

#[test]
fn test_table_elements_collect() {
    let elements: TableElements = ["A", "B"]
        .into_iter()
        .map(|name| TableElement::value(name, SqlType::Double))
        .collect();

    let table = CreateSource::table(
        "T",
        elements,
        CreateSourceProperties::new("t", Format::Json),
    );

    assert_eq!(table.source_type, DataSourceType::Table);
    assert_eq!(table.elements.len(), 2);
    assert!(!table.not_exists);
}
