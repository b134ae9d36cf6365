//! Runtime values, rows and key records

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::name::ColumnName;
use crate::types::SqlType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i32),
    Bigint(i64),
    Double(f64),
    String(String),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Struct fields in declaration order.
    Struct(Vec<(String, Value)>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn struct_field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

/// String form used when values are concatenated into composite keys.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Bigint(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{:?}", d),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                f.write_str("}")
            }
            Value::Struct(fields) => {
                f.write_str("Struct{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                f.write_str("}")
            }
        }
    }
}

/// A row of value columns, positionally matching a schema's value columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericRow {
    values: Vec<Value>,
}

impl GenericRow {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Single-field record holding a row's key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyStruct {
    field: ColumnName,
    sql_type: SqlType,
    value: Value,
}

impl KeyStruct {
    pub fn new(field: ColumnName, sql_type: SqlType, value: Value) -> Self {
        Self {
            field,
            sql_type,
            value,
        }
    }

    pub fn field(&self) -> &ColumnName {
        &self.field
    }

    pub fn sql_type(&self) -> &SqlType {
        &self.sql_type
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}
