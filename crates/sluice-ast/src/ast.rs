//! AST types for `CREATE STREAM` / `CREATE TABLE` statements

use serde::Serialize;

use sluice_ir::{ColumnName, DataSourceType, Namespace, SourceName, SqlType};

use crate::properties::CreateSourceProperties;

/// One declared column, e.g. `ID BIGINT` or `ROWKEY STRING KEY`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableElement {
    pub namespace: Namespace,
    pub name: ColumnName,
    pub sql_type: SqlType,
}

impl TableElement {
    pub fn key(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            namespace: Namespace::Key,
            name: ColumnName::of(name),
            sql_type,
        }
    }

    pub fn value(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            namespace: Namespace::Value,
            name: ColumnName::of(name),
            sql_type,
        }
    }
}

/// Declared columns in statement order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableElements(Vec<TableElement>);

impl TableElements {
    pub fn of(elements: Vec<TableElement>) -> Self {
        Self(elements)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TableElement> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a TableElements {
    type Item = &'a TableElement;
    type IntoIter = std::slice::Iter<'a, TableElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<TableElement> for TableElements {
    fn from_iter<I: IntoIterator<Item = TableElement>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A parsed `CREATE [STREAM|TABLE] [IF NOT EXISTS] name (elements) WITH (properties)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateSource {
    pub source_type: DataSourceType,
    pub name: SourceName,
    pub elements: TableElements,
    pub not_exists: bool,
    pub properties: CreateSourceProperties,
}

impl CreateSource {
    pub fn stream(
        name: impl Into<String>,
        elements: TableElements,
        properties: CreateSourceProperties,
    ) -> Self {
        Self::new(DataSourceType::Stream, name, elements, properties)
    }

    pub fn table(
        name: impl Into<String>,
        elements: TableElements,
        properties: CreateSourceProperties,
    ) -> Self {
        Self::new(DataSourceType::Table, name, elements, properties)
    }

    fn new(
        source_type: DataSourceType,
        name: impl Into<String>,
        elements: TableElements,
        properties: CreateSourceProperties,
    ) -> Self {
        Self {
            source_type,
            name: SourceName::of(name),
            elements,
            not_exists: false,
            properties,
        }
    }

    pub fn if_not_exists(mut self) -> Self {
        self.not_exists = true;
        self
    }
}
