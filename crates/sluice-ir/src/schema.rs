//! Logical schemas: ordered key and value columns

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::name::ColumnName;
use crate::types::SqlType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Duplicate column name in schema: '{0}'")]
    DuplicateColumn(ColumnName),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Namespace {
    Key,
    Value,
}

impl Namespace {
    pub fn is_key(self) -> bool {
        self == Namespace::Key
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Column {
    name: ColumnName,
    sql_type: SqlType,
    namespace: Namespace,
    /// Position within the column's namespace.
    index: usize,
}

impl Column {
    pub fn name(&self) -> &ColumnName {
        &self.name
    }

    pub fn sql_type(&self) -> &SqlType {
        &self.sql_type
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` {}", self.name, self.sql_type)?;
        if self.namespace.is_key() {
            f.write_str(" KEY")?;
        }
        Ok(())
    }
}

/// Immutable schema of a stream, table or intermediate plan result.
///
/// Column names are unique across both namespaces. Schemas are never modified in
/// place: every derivation (`with_key_column`, the builder) produces a new value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LogicalSchema {
    key: Vec<Column>,
    value: Vec<Column>,
}

impl LogicalSchema {
    pub fn builder() -> LogicalSchemaBuilder {
        LogicalSchemaBuilder::default()
    }

    pub fn key(&self) -> &[Column] {
        &self.key
    }

    pub fn value(&self) -> &[Column] {
        &self.value
    }

    /// Key columns followed by value columns.
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.key.iter().chain(self.value.iter())
    }

    pub fn find_column(&self, name: &ColumnName) -> Option<&Column> {
        self.columns().find(|c| c.name() == name)
    }

    pub fn find_key_column(&self, name: &ColumnName) -> Option<&Column> {
        self.key.iter().find(|c| c.name() == name)
    }

    pub fn find_value_column(&self, name: &ColumnName) -> Option<&Column> {
        self.value.iter().find(|c| c.name() == name)
    }

    /// Copy of this schema whose key is the single column `name`, keeping the value columns.
    pub fn with_key_column(
        &self,
        name: ColumnName,
        sql_type: SqlType,
    ) -> Result<LogicalSchema, SchemaError> {
        LogicalSchema::builder()
            .key_column(name, sql_type)
            .value_columns(&self.value)
            .build()
    }
}

impl fmt::Display for LogicalSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, column) in self.columns().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", column)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct LogicalSchemaBuilder {
    key: Vec<(ColumnName, SqlType)>,
    value: Vec<(ColumnName, SqlType)>,
}

impl LogicalSchemaBuilder {
    pub fn key_column(mut self, name: ColumnName, sql_type: SqlType) -> Self {
        self.key.push((name, sql_type));
        self
    }

    pub fn value_column(mut self, name: ColumnName, sql_type: SqlType) -> Self {
        self.value.push((name, sql_type));
        self
    }

    /// Append copies of `columns` as value columns, whatever their original namespace.
    pub fn value_columns<'a>(mut self, columns: impl IntoIterator<Item = &'a Column>) -> Self {
        self.value.extend(
            columns
                .into_iter()
                .map(|c| (c.name().clone(), c.sql_type().clone())),
        );
        self
    }

    pub fn build(self) -> Result<LogicalSchema, SchemaError> {
        let mut seen = HashSet::new();
        for (name, _) in self.key.iter().chain(self.value.iter()) {
            if !seen.insert(name) {
                return Err(SchemaError::DuplicateColumn(name.clone()));
            }
        }

        Ok(LogicalSchema {
            key: to_columns(self.key, Namespace::Key),
            value: to_columns(self.value, Namespace::Value),
        })
    }
}

fn to_columns(columns: Vec<(ColumnName, SqlType)>, namespace: Namespace) -> Vec<Column> {
    columns
        .into_iter()
        .enumerate()
        .map(|(index, (name, sql_type))| Column {
            name,
            sql_type,
            namespace,
            index,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn schema() -> LogicalSchema {
        LogicalSchema::builder()
            .key_column(ColumnName::of("ROWKEY"), SqlType::String)
            .value_column(ColumnName::of("ID"), SqlType::Bigint)
            .value_column(ColumnName::of("NAME"), SqlType::String)
            .build()
            .unwrap()
    }

    #[test]
    fn test_columns_are_indexed_per_namespace() {
        let schema = schema();

        let id = schema.find_value_column(&ColumnName::of("ID")).unwrap();
        let name = schema.find_value_column(&ColumnName::of("NAME")).unwrap();
        let key = schema.find_key_column(&ColumnName::of("ROWKEY")).unwrap();

        assert_eq!((id.index(), name.index(), key.index()), (0, 1, 0));
        assert_eq!(key.namespace(), Namespace::Key);
        assert!(schema.find_value_column(&ColumnName::of("ROWKEY")).is_none());
    }

    #[test]
    fn test_duplicate_names_rejected_across_namespaces() {
        let result = LogicalSchema::builder()
            .key_column(ColumnName::of("ID"), SqlType::Bigint)
            .value_column(ColumnName::of("ID"), SqlType::Bigint)
            .build();

        assert_matches!(result, Err(SchemaError::DuplicateColumn(name)) if name.text() == "ID");
    }

    #[test]
    fn test_with_key_column_returns_new_schema() {
        let original = schema();

        let rekeyed = original
            .with_key_column(ColumnName::of("K"), SqlType::Integer)
            .unwrap();

        assert_eq!(rekeyed.key().len(), 1);
        assert_eq!(rekeyed.key()[0].name(), &ColumnName::of("K"));
        assert_eq!(rekeyed.value(), original.value());
        assert_eq!(original.key()[0].name(), &ColumnName::of("ROWKEY"));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            schema().to_string(),
            "`ROWKEY` STRING KEY, `ID` BIGINT, `NAME` STRING"
        );
    }
}
