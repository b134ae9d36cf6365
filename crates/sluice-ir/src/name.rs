//! Identifiers for columns and sources

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::schema::LogicalSchema;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnName(String);

impl ColumnName {
    pub fn of(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn text(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceName(String);

impl SourceName {
    pub fn of(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn text(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a source is an append-only stream or a changelog table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataSourceType {
    Stream,
    Table,
}

impl fmt::Display for DataSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceType::Stream => f.write_str("STREAM"),
            DataSourceType::Table => f.write_str("TABLE"),
        }
    }
}

/// Names the engine reserves for itself.
pub mod system_columns {
    use super::ColumnName;
    use crate::types::SqlType;

    pub const ROWKEY: &str = "ROWKEY";
    pub const ROWTIME: &str = "ROWTIME";
    pub const WINDOWSTART: &str = "WINDOWSTART";
    pub const WINDOWEND: &str = "WINDOWEND";

    /// Type of the implicit key column.
    pub const ROWKEY_TYPE: SqlType = SqlType::String;

    pub fn rowkey_name() -> ColumnName {
        ColumnName::of(ROWKEY)
    }

    /// Pseudo columns that can never be declared by a user. `ROWKEY` is not one of
    /// them: it is the conventional key column name.
    pub fn is_system_column(name: &ColumnName) -> bool {
        matches!(name.text(), ROWTIME | WINDOWSTART | WINDOWEND)
    }
}

/// Prefix of engine-generated column names.
pub const GENERATED_ALIAS_PREFIX: &str = "SLUICE_COL_";

/// Hands out `SLUICE_COL_<n>` names that no column in the seed schemas already uses.
///
/// A fresh generator seeded from the same schemas yields the same sequence, so
/// names are stable for a given query.
#[derive(Debug, Clone)]
pub struct ColumnAliasGenerator {
    next: usize,
    used: BTreeSet<usize>,
}

impl ColumnAliasGenerator {
    pub fn new<'a>(schemas: impl IntoIterator<Item = &'a LogicalSchema>) -> Self {
        let used = schemas
            .into_iter()
            .flat_map(|schema| schema.columns())
            .filter_map(|column| generated_index(column.name()))
            .collect();

        Self { next: 0, used }
    }

    pub fn next_alias(&mut self) -> ColumnName {
        while self.used.contains(&self.next) {
            self.next += 1;
        }
        let alias = ColumnName::of(format!("{}{}", GENERATED_ALIAS_PREFIX, self.next));
        self.used.insert(self.next);
        self.next += 1;
        alias
    }
}

fn generated_index(name: &ColumnName) -> Option<usize> {
    name.text()
        .strip_prefix(GENERATED_ALIAS_PREFIX)
        .filter(|suffix| !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|suffix| suffix.parse().ok())
}
