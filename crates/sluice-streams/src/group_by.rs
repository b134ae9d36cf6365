//! Group-by key derivation
//!
//! Turns the compiled `GROUP BY` expressions of an aggregation into the re-keyed
//! schema and a mapper that computes each row's new key.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use sluice_ir::{
    system_columns, ColumnAliasGenerator, ColumnName, EngineConfig, Expression, GenericRow,
    KeyStruct, LogicalSchema, SchemaError, SqlType, Value,
};

use crate::expression::CompiledExpression;
use crate::processing_log::{ProcessingLogger, RecordProcessingError};

/// Joins the values of a multi-expression key.
pub const GROUP_BY_VALUE_SEPARATOR: &str = "|+|";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GroupByError {
    #[error("GROUP BY requires at least one expression")]
    NoExpressions,

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Re-keyed schema plus the key mapper, built together so they always agree.
#[derive(Debug, Clone)]
pub struct GroupByParams {
    schema: LogicalSchema,
    mapper: GroupByMapper,
}

impl GroupByParams {
    pub fn schema(&self) -> &LogicalSchema {
        &self.schema
    }

    pub fn mapper(&self) -> &GroupByMapper {
        &self.mapper
    }

    pub fn into_parts(self) -> (LogicalSchema, GroupByMapper) {
        (self.schema, self.mapper)
    }
}

/// Computes the group-by key of a row.
///
/// Stateless apart from the shared logger, so one mapper can serve any number
/// of threads.
#[derive(Clone)]
pub struct GroupByMapper {
    key_name: ColumnName,
    key_type: SqlType,
    expressions: Vec<Arc<dyn CompiledExpression>>,
    logger: Arc<dyn ProcessingLogger>,
}

impl GroupByMapper {
    pub fn key_name(&self) -> &ColumnName {
        &self.key_name
    }

    pub fn key_type(&self) -> &SqlType {
        &self.key_type
    }

    /// `None` when any expression fails or yields null; the row is then excluded
    /// and one processing error is logged per offending expression.
    pub fn apply(&self, row: &GenericRow) -> Option<KeyStruct> {
        let value = match self.expressions.as_slice() {
            [single] => self.evaluate(0, single.as_ref(), row)?,
            expressions => {
                // every expression is evaluated so each failure gets reported
                let parts: Vec<Option<Value>> = expressions
                    .iter()
                    .enumerate()
                    .map(|(i, expression)| self.evaluate(i, expression.as_ref(), row))
                    .collect();

                let mut joined = String::new();
                for (i, part) in parts.into_iter().enumerate() {
                    if i > 0 {
                        joined.push_str(GROUP_BY_VALUE_SEPARATOR);
                    }
                    joined.push_str(&part?.to_string());
                }
                Value::String(joined)
            }
        };

        Some(KeyStruct::new(
            self.key_name.clone(),
            self.key_type.clone(),
            value,
        ))
    }

    fn evaluate(
        &self,
        index: usize,
        expression: &dyn CompiledExpression,
        row: &GenericRow,
    ) -> Option<Value> {
        match expression.evaluate(row) {
            Ok(value) if value.is_null() => {
                self.logger.error(RecordProcessingError::new(
                    format!(
                        "Group-by column with index {} resolved to null. \
                         The source row will be excluded from the table.",
                        index
                    ),
                    Some(row.clone()),
                ));
                None
            }
            Ok(value) => Some(value),
            Err(err) => {
                self.logger.error(
                    RecordProcessingError::new(
                        format!(
                            "Error calculating group-by column with index {}. \
                             The source row will be excluded from the table.",
                            index
                        ),
                        Some(row.clone()),
                    )
                    .with_cause(err),
                );
                None
            }
        }
    }
}

impl fmt::Debug for GroupByMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupByMapper")
            .field("key_name", &self.key_name)
            .field("key_type", &self.key_type)
            .field("expressions", &self.expressions)
            .finish_non_exhaustive()
    }
}

pub struct GroupByParamsFactory;

impl GroupByParamsFactory {
    /// Derive the key and build the mapper that computes it.
    ///
    /// The source's value columns are kept, so with any key name enabled a bare
    /// column key such as `GROUP BY REGION` collides with the value column of the
    /// same name and fails with [`SchemaError::DuplicateColumn`]. Alias such keys.
    pub fn build(
        source_schema: &LogicalSchema,
        expressions: Vec<Arc<dyn CompiledExpression>>,
        alias: Option<&ColumnName>,
        logger: Arc<dyn ProcessingLogger>,
        config: &EngineConfig,
    ) -> Result<GroupByParams, GroupByError> {
        let (key_name, key_type) = derive_key(source_schema, &expressions, alias, config)?;
        let schema = source_schema.with_key_column(key_name.clone(), key_type.clone())?;

        let mapper = GroupByMapper {
            key_name,
            key_type,
            expressions,
            logger,
        };

        Ok(GroupByParams { schema, mapper })
    }

    /// The source's value columns under a single derived key column.
    pub fn build_schema(
        source_schema: &LogicalSchema,
        expressions: &[Arc<dyn CompiledExpression>],
        alias: Option<&ColumnName>,
        config: &EngineConfig,
    ) -> Result<LogicalSchema, GroupByError> {
        let (key_name, key_type) = derive_key(source_schema, expressions, alias, config)?;
        Ok(source_schema.with_key_column(key_name, key_type)?)
    }
}

fn derive_key(
    source_schema: &LogicalSchema,
    expressions: &[Arc<dyn CompiledExpression>],
    alias: Option<&ColumnName>,
    config: &EngineConfig,
) -> Result<(ColumnName, SqlType), GroupByError> {
    let key_type = match expressions {
        [] => return Err(GroupByError::NoExpressions),
        [single] => single.expression_type().clone(),
        _ => SqlType::String,
    };

    Ok((key_name(source_schema, expressions, alias, config), key_type))
}

fn key_name(
    source_schema: &LogicalSchema,
    expressions: &[Arc<dyn CompiledExpression>],
    alias: Option<&ColumnName>,
    config: &EngineConfig,
) -> ColumnName {
    if !config.any_key_name_enabled {
        // legacy naming only honours an alias on composite keys
        return match (expressions.len(), alias) {
            (n, Some(alias)) if n > 1 => alias.clone(),
            _ => system_columns::rowkey_name(),
        };
    }

    if let Some(alias) = alias {
        return alias.clone();
    }

    if let [single] = expressions {
        match single.expression() {
            Expression::ColumnReference { column } => return column.clone(),
            Expression::Dereference { field, .. } => return ColumnName::of(field.as_str()),
            _ => {}
        }
    }

    ColumnAliasGenerator::new([source_schema]).next_alias()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::compile_expression;
    use crate::processing_log::NoopProcessingLogger;
    use assert_matches::assert_matches;
    use sluice_ir::Literal;

    fn schema() -> LogicalSchema {
        LogicalSchema::builder()
            .key_column(ColumnName::of("ROWKEY"), SqlType::String)
            .value_column(ColumnName::of("A"), SqlType::Integer)
            .value_column(ColumnName::of("B"), SqlType::String)
            .build()
            .unwrap()
    }

    fn compile(expression: Expression) -> Arc<dyn CompiledExpression> {
        compile_expression(&expression, &schema()).unwrap()
    }

    #[test]
    fn test_rekeyed_schema_keeps_value_columns() {
        let schema = GroupByParamsFactory::build_schema(
            &schema(),
            &[compile(Expression::literal(Literal::Integer(1)))],
            None,
            &EngineConfig::default(),
        )
        .unwrap();

        assert_eq!(schema.key().len(), 1);
        assert_eq!(schema.key()[0].name().text(), "ROWKEY");
        assert_eq!(schema.key()[0].sql_type(), &SqlType::Integer);
        assert_eq!(schema.value(), self::schema().value());
    }

    #[test]
    fn test_generated_key_name() {
        let config = EngineConfig::default().with_any_key_name(true);
        let expressions = [compile(Expression::literal(Literal::Integer(1)))];

        let name = key_name(&schema(), &expressions, None, &config);

        assert_eq!(name.text(), "SLUICE_COL_0");
    }

    #[test]
    fn test_mapper_reads_row() {
        let params = GroupByParamsFactory::build(
            &schema(),
            vec![compile(Expression::column("A")), compile(Expression::column("B"))],
            None,
            Arc::new(NoopProcessingLogger),
            &EngineConfig::default(),
        )
        .unwrap();
        let row = GenericRow::new(vec![Value::Integer(4), Value::String("x".to_string())]);

        let key = params.mapper().apply(&row).unwrap();

        assert_eq!(key.field().text(), "ROWKEY");
        assert_eq!(key.value(), &Value::String("4|+|x".to_string()));
        assert_matches!(key.sql_type(), SqlType::String);
    }
}
