//! Convert declared table elements to a logical schema

use sluice_ir::{system_columns, LogicalSchema, SchemaError};

use crate::ast::TableElements;

impl TableElements {
    /// Key elements become key columns and the rest value columns, in declaration
    /// order. With `add_implicit_key`, a statement that declares no key column gets
    /// `ROWKEY STRING` as its key.
    pub fn to_logical_schema(&self, add_implicit_key: bool) -> Result<LogicalSchema, SchemaError> {
        let mut builder = LogicalSchema::builder();

        let has_key = self.iter().any(|e| e.namespace.is_key());
        if add_implicit_key && !has_key {
            builder = builder.key_column(system_columns::rowkey_name(), system_columns::ROWKEY_TYPE);
        }

        for element in self {
            builder = if element.namespace.is_key() {
                builder.key_column(element.name.clone(), element.sql_type.clone())
            } else {
                builder.value_column(element.name.clone(), element.sql_type.clone())
            };
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TableElement;
    use assert_matches::assert_matches;
    use sluice_ir::{ColumnName, SqlType};

    #[test]
    fn test_implicit_key_added() {
        let elements = TableElements::of(vec![
            TableElement::value("ID", SqlType::Bigint),
            TableElement::value("NAME", SqlType::String),
        ]);

        let schema = elements.to_logical_schema(true).unwrap();

        assert_eq!(
            schema.to_string(),
            "`ROWKEY` STRING KEY, `ID` BIGINT, `NAME` STRING"
        );
    }

    #[test]
    fn test_declared_key_kept() {
        let elements = TableElements::of(vec![
            TableElement::value("ID", SqlType::Bigint),
            TableElement::key("ROWKEY", SqlType::Bigint),
        ]);

        let schema = elements.to_logical_schema(true).unwrap();

        assert_eq!(schema.key().len(), 1);
        assert_eq!(schema.key()[0].sql_type(), &SqlType::Bigint);
        assert_eq!(schema.value()[0].name(), &ColumnName::of("ID"));
    }

    #[test]
    fn test_no_implicit_key() {
        let elements = TableElements::of(vec![TableElement::value("ID", SqlType::Bigint)]);

        let schema = elements.to_logical_schema(false).unwrap();

        assert!(schema.key().is_empty());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let elements = TableElements::of(vec![
            TableElement::value("ID", SqlType::Bigint),
            TableElement::value("ID", SqlType::String),
        ]);

        assert_matches!(
            elements.to_logical_schema(true),
            Err(SchemaError::DuplicateColumn(name)) if name.text() == "ID"
        );
    }
}
