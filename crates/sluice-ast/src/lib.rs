//! Sluice AST - parsed `CREATE STREAM` / `CREATE TABLE` statements

pub mod ast;
pub mod properties;
mod to_schema;

pub use ast::*;
pub use properties::{CreateSourceProperties, PropertiesError};
