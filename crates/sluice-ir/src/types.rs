//! Type system for sluice schemas

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    // Primitives
    Boolean,
    Integer,
    Bigint,
    Double,
    String,
    Decimal { precision: u8, scale: u8 },

    // Complex
    Array(Box<SqlType>),
    /// Map keys are always `STRING`.
    Map(Box<SqlType>),
    Struct(SqlStruct),
}

/// The type family of a [`SqlType`], ignoring parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlBaseType {
    Boolean,
    Integer,
    Bigint,
    Double,
    String,
    Decimal,
    Array,
    Map,
    Struct,
}

impl SqlType {
    pub fn array(element: SqlType) -> Self {
        SqlType::Array(Box::new(element))
    }

    pub fn map(value: SqlType) -> Self {
        SqlType::Map(Box::new(value))
    }

    pub fn base_type(&self) -> SqlBaseType {
        match self {
            SqlType::Boolean => SqlBaseType::Boolean,
            SqlType::Integer => SqlBaseType::Integer,
            SqlType::Bigint => SqlBaseType::Bigint,
            SqlType::Double => SqlBaseType::Double,
            SqlType::String => SqlBaseType::String,
            SqlType::Decimal { .. } => SqlBaseType::Decimal,
            SqlType::Array(_) => SqlBaseType::Array,
            SqlType::Map(_) => SqlBaseType::Map,
            SqlType::Struct(_) => SqlBaseType::Struct,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            SqlType::Integer | SqlType::Bigint | SqlType::Double | SqlType::Decimal { .. }
        )
    }

    /// True for types that are not containers.
    pub fn is_primitive(&self) -> bool {
        !matches!(self, SqlType::Array(_) | SqlType::Map(_) | SqlType::Struct(_))
    }
}

impl fmt::Display for SqlBaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SqlBaseType::Boolean => "BOOLEAN",
            SqlBaseType::Integer => "INTEGER",
            SqlBaseType::Bigint => "BIGINT",
            SqlBaseType::Double => "DOUBLE",
            SqlBaseType::String => "STRING",
            SqlBaseType::Decimal => "DECIMAL",
            SqlBaseType::Array => "ARRAY",
            SqlBaseType::Map => "MAP",
            SqlBaseType::Struct => "STRUCT",
        };
        f.write_str(name)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Decimal { precision, scale } => write!(f, "DECIMAL({}, {})", precision, scale),
            SqlType::Array(element) => write!(f, "ARRAY<{}>", element),
            SqlType::Map(value) => write!(f, "MAP<STRING, {}>", value),
            SqlType::Struct(s) => write!(f, "{}", s),
            other => write!(f, "{}", other.base_type()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub sql_type: SqlType,
}

/// Ordered set of named fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SqlStruct {
    fields: Vec<Field>,
}

impl SqlStruct {
    pub fn builder() -> SqlStructBuilder {
        SqlStructBuilder::default()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl fmt::Display for SqlStruct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("STRUCT<")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "`{}` {}", field.name, field.sql_type)?;
        }
        f.write_str(">")
    }
}

#[derive(Debug, Default)]
pub struct SqlStructBuilder {
    fields: Vec<Field>,
}

impl SqlStructBuilder {
    pub fn field(mut self, name: impl Into<String>, sql_type: SqlType) -> Self {
        self.fields.push(Field {
            name: name.into(),
            sql_type,
        });
        self
    }

    pub fn build(self) -> SqlStruct {
        SqlStruct {
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_nested_types() {
        let address = SqlStruct::builder()
            .field("street", SqlType::String)
            .field("zip", SqlType::Integer)
            .build();
        let sql_type = SqlType::map(SqlType::array(SqlType::Struct(address)));

        assert_eq!(
            sql_type.to_string(),
            "MAP<STRING, ARRAY<STRUCT<`street` STRING, `zip` INTEGER>>>"
        );
        assert_eq!(
            SqlType::Decimal { precision: 10, scale: 2 }.to_string(),
            "DECIMAL(10, 2)"
        );
    }

    #[test]
    fn test_struct_field_lookup_is_exact() {
        let s = SqlStruct::builder().field("someField", SqlType::Bigint).build();

        assert_eq!(s.field("someField").map(|f| &f.sql_type), Some(&SqlType::Bigint));
        assert!(s.field("SOMEFIELD").is_none());
    }
}
