//! Sluice Intermediate Representation (IR)
//!
//! Types, names, logical schemas, expressions and the immutable plan-node tree
//! shared by every compilation stage. Everything here is pure data: no I/O and
//! no global state.

mod config;
mod expr;
mod name;
pub mod plan;
mod schema;
mod types;
mod value;

pub use config::EngineConfig;
pub use expr::{ArithmeticOp, ComparisonOp, Expression, Literal};
pub use name::{
    system_columns, ColumnAliasGenerator, ColumnName, DataSourceType, SourceName,
    GENERATED_ALIAS_PREFIX,
};
pub use plan::{PlanError, PlanNode, PlanNodeId};
pub use schema::{Column, LogicalSchema, LogicalSchemaBuilder, Namespace, SchemaError};
pub use types::{Field, SqlBaseType, SqlStruct, SqlStructBuilder, SqlType};
pub use value::{GenericRow, KeyStruct, Value};
