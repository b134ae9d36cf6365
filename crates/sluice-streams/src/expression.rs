//! Compiled expressions evaluated against value rows

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use sluice_ir::{
    ArithmeticOp, ColumnName, ComparisonOp, Expression, GenericRow, LogicalSchema, SqlType, Value,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionCompileError {
    #[error("Column '{0}' cannot be resolved.")]
    UnknownColumn(ColumnName),

    #[error("Key column '{0}' is not available to row expressions")]
    KeyColumn(ColumnName),

    #[error("Field '{field}' does not exist in {sql_type}")]
    UnknownField { field: String, sql_type: String },

    #[error("Cannot dereference field '{field}' of non-struct expression {expression}")]
    NotAStruct { expression: String, field: String },

    #[error("Cannot apply '{op}' to {left} and {right}")]
    IncompatibleOperands {
        op: String,
        left: String,
        right: String,
    },

    #[error("Cannot infer the type of {0}")]
    UntypedExpression(String),

    #[error("Unsupported expression: {0}")]
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("Division by zero: {0}")]
    DivisionByZero(String),

    #[error("Integer overflow: {0}")]
    Overflow(String),

    #[error("Row has {len} values, no value at index {index}")]
    MissingValue { index: usize, len: usize },

    #[error("Unexpected value {value} evaluating {expression}")]
    TypeMismatch { expression: String, value: String },
}

/// An expression resolved against a schema, ready to run once per row.
pub trait CompiledExpression: fmt::Debug + Send + Sync {
    fn expression(&self) -> &Expression;

    fn expression_type(&self) -> &SqlType;

    /// `Ok(Value::Null)` follows SQL null semantics; `Err` is a row-level failure.
    fn evaluate(&self, row: &GenericRow) -> Result<Value, EvaluationError>;
}

/// Resolve `expression` against the value columns of `schema`.
///
/// Supports column references, struct field access, literals, arithmetic on
/// `INTEGER`/`BIGINT`/`DOUBLE` and comparisons.
pub fn compile_expression(
    expression: &Expression,
    schema: &LogicalSchema,
) -> Result<Arc<dyn CompiledExpression>, ExpressionCompileError> {
    let (node, sql_type) = resolve(expression, schema)?;
    let sql_type =
        sql_type.ok_or_else(|| ExpressionCompileError::UntypedExpression(expression.to_string()))?;

    Ok(Arc::new(InterpretedExpression {
        expression: expression.clone(),
        sql_type,
        node,
    }))
}

#[derive(Debug)]
struct InterpretedExpression {
    expression: Expression,
    sql_type: SqlType,
    node: Node,
}

impl CompiledExpression for InterpretedExpression {
    fn expression(&self) -> &Expression {
        &self.expression
    }

    fn expression_type(&self) -> &SqlType {
        &self.sql_type
    }

    fn evaluate(&self, row: &GenericRow) -> Result<Value, EvaluationError> {
        self.node.eval(row)
    }
}

#[derive(Debug)]
enum Node {
    Column(usize),
    Field { base: Box<Node>, field: String },
    Constant(Value),
    Arithmetic {
        op: ArithmeticOp,
        result: SqlType,
        left: Box<Node>,
        right: Box<Node>,
        text: String,
    },
    Comparison {
        op: ComparisonOp,
        left: Box<Node>,
        right: Box<Node>,
        text: String,
    },
}

/// `None` type only for a bare `NULL` literal.
fn resolve(
    expression: &Expression,
    schema: &LogicalSchema,
) -> Result<(Node, Option<SqlType>), ExpressionCompileError> {
    match expression {
        Expression::ColumnReference { column } => match schema.find_value_column(column) {
            Some(c) => Ok((Node::Column(c.index()), Some(c.sql_type().clone()))),
            None if schema.find_key_column(column).is_some() => {
                Err(ExpressionCompileError::KeyColumn(column.clone()))
            }
            None => Err(ExpressionCompileError::UnknownColumn(column.clone())),
        },
        Expression::Dereference { base, field } => {
            let (base_node, base_type) = resolve(base, schema)?;
            let fields = match base_type {
                Some(SqlType::Struct(fields)) => fields,
                _ => {
                    return Err(ExpressionCompileError::NotAStruct {
                        expression: base.to_string(),
                        field: field.clone(),
                    })
                }
            };
            let field_type = fields
                .field(field)
                .map(|f| f.sql_type.clone())
                .ok_or_else(|| ExpressionCompileError::UnknownField {
                    field: field.clone(),
                    sql_type: SqlType::Struct(fields.clone()).to_string(),
                })?;
            Ok((
                Node::Field {
                    base: Box::new(base_node),
                    field: field.clone(),
                },
                Some(field_type),
            ))
        }
        Expression::Literal { value } => Ok((Node::Constant(value.to_value()), value.sql_type())),
        Expression::Arithmetic { op, left, right } => {
            let (left_node, left_type) = resolve(left, schema)?;
            let (right_node, right_type) = resolve(right, schema)?;
            let result = arithmetic_type(left_type.as_ref(), right_type.as_ref()).ok_or_else(|| {
                incompatible(op.to_string(), left_type.as_ref(), right_type.as_ref())
            })?;
            Ok((
                Node::Arithmetic {
                    op: *op,
                    result: result.clone(),
                    left: Box::new(left_node),
                    right: Box::new(right_node),
                    text: expression.to_string(),
                },
                Some(result),
            ))
        }
        Expression::Comparison { op, left, right } => {
            let (left_node, left_type) = resolve(left, schema)?;
            let (right_node, right_type) = resolve(right, schema)?;
            if !comparable(left_type.as_ref(), right_type.as_ref()) {
                return Err(incompatible(
                    op.to_string(),
                    left_type.as_ref(),
                    right_type.as_ref(),
                ));
            }
            Ok((
                Node::Comparison {
                    op: *op,
                    left: Box::new(left_node),
                    right: Box::new(right_node),
                    text: expression.to_string(),
                },
                Some(SqlType::Boolean),
            ))
        }
        Expression::FunctionCall { .. } => {
            Err(ExpressionCompileError::Unsupported(expression.to_string()))
        }
    }
}

fn incompatible(
    op: String,
    left: Option<&SqlType>,
    right: Option<&SqlType>,
) -> ExpressionCompileError {
    let name = |t: Option<&SqlType>| t.map_or_else(|| "NULL".to_string(), |t| t.to_string());
    ExpressionCompileError::IncompatibleOperands {
        op,
        left: name(left),
        right: name(right),
    }
}

fn numeric_rank(sql_type: &SqlType) -> Option<u8> {
    match sql_type {
        SqlType::Integer => Some(0),
        SqlType::Bigint => Some(1),
        SqlType::Double => Some(2),
        _ => None,
    }
}

/// Widest of the two numeric operand types; an untyped `NULL` takes the other side's type.
fn arithmetic_type(left: Option<&SqlType>, right: Option<&SqlType>) -> Option<SqlType> {
    match (left, right) {
        (Some(l), Some(r)) => {
            let (lr, rr) = (numeric_rank(l)?, numeric_rank(r)?);
            Some(if lr >= rr { l.clone() } else { r.clone() })
        }
        (Some(t), None) | (None, Some(t)) => numeric_rank(t).map(|_| t.clone()),
        (None, None) => None,
    }
}

fn comparable(left: Option<&SqlType>, right: Option<&SqlType>) -> bool {
    match (left, right) {
        (Some(l), Some(r)) => {
            (numeric_rank(l).is_some() && numeric_rank(r).is_some())
                || (l == r && l.is_primitive())
        }
        (Some(t), None) | (None, Some(t)) => t.is_primitive(),
        (None, None) => true,
    }
}

impl Node {
    fn eval(&self, row: &GenericRow) -> Result<Value, EvaluationError> {
        match self {
            Node::Column(index) => row.get(*index).cloned().ok_or(EvaluationError::MissingValue {
                index: *index,
                len: row.len(),
            }),
            Node::Field { base, field } => match base.eval(row)? {
                Value::Null => Ok(Value::Null),
                value @ Value::Struct(_) => Ok(value.struct_field(field).cloned().unwrap_or(Value::Null)),
                other => Err(EvaluationError::TypeMismatch {
                    expression: field.clone(),
                    value: other.to_string(),
                }),
            },
            Node::Constant(value) => Ok(value.clone()),
            Node::Arithmetic {
                op,
                result,
                left,
                right,
                text,
            } => {
                let (l, r) = (left.eval(row)?, right.eval(row)?);
                if l.is_null() || r.is_null() {
                    return Ok(Value::Null);
                }
                arithmetic(*op, result, &l, &r, text)
            }
            Node::Comparison {
                op,
                left,
                right,
                text,
            } => {
                let (l, r) = (left.eval(row)?, right.eval(row)?);
                if l.is_null() || r.is_null() {
                    return Ok(Value::Null);
                }
                let ordering = compare(&l, &r).ok_or_else(|| EvaluationError::TypeMismatch {
                    expression: text.clone(),
                    value: format!("{} and {}", l, r),
                })?;
                Ok(Value::Boolean(match op {
                    ComparisonOp::Eq => ordering == Ordering::Equal,
                    ComparisonOp::Ne => ordering != Ordering::Equal,
                    ComparisonOp::Lt => ordering == Ordering::Less,
                    ComparisonOp::Le => ordering != Ordering::Greater,
                    ComparisonOp::Gt => ordering == Ordering::Greater,
                    ComparisonOp::Ge => ordering != Ordering::Less,
                }))
            }
        }
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(i64::from(*i)),
        Value::Bigint(i) => Some(*i),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(f64::from(*i)),
        Value::Bigint(i) => Some(*i as f64),
        Value::Double(d) => Some(*d),
        _ => None,
    }
}

fn arithmetic(
    op: ArithmeticOp,
    result: &SqlType,
    left: &Value,
    right: &Value,
    text: &str,
) -> Result<Value, EvaluationError> {
    let mismatch = || EvaluationError::TypeMismatch {
        expression: text.to_string(),
        value: format!("{} and {}", left, right),
    };

    match result {
        SqlType::Double => {
            let (l, r) = (as_f64(left).ok_or_else(mismatch)?, as_f64(right).ok_or_else(mismatch)?);
            Ok(Value::Double(match op {
                ArithmeticOp::Add => l + r,
                ArithmeticOp::Sub => l - r,
                ArithmeticOp::Mul => l * r,
                ArithmeticOp::Div => l / r,
                ArithmeticOp::Mod => l % r,
            }))
        }
        SqlType::Integer | SqlType::Bigint => {
            let (l, r) = (as_i64(left).ok_or_else(mismatch)?, as_i64(right).ok_or_else(mismatch)?);
            if matches!(op, ArithmeticOp::Div | ArithmeticOp::Mod) && r == 0 {
                return Err(EvaluationError::DivisionByZero(text.to_string()));
            }
            let value = match op {
                ArithmeticOp::Add => l.checked_add(r),
                ArithmeticOp::Sub => l.checked_sub(r),
                ArithmeticOp::Mul => l.checked_mul(r),
                ArithmeticOp::Div => l.checked_div(r),
                ArithmeticOp::Mod => l.checked_rem(r),
            }
            .ok_or_else(|| EvaluationError::Overflow(text.to_string()))?;

            if *result == SqlType::Integer {
                i32::try_from(value)
                    .map(Value::Integer)
                    .map_err(|_| EvaluationError::Overflow(text.to_string()))
            } else {
                Ok(Value::Bigint(value))
            }
        }
        _ => Err(mismatch()),
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Boolean(l), Value::Boolean(r)) => Some(l.cmp(r)),
        (Value::Double(_), _) | (_, Value::Double(_)) => as_f64(left)?.partial_cmp(&as_f64(right)?),
        _ => Some(as_i64(left)?.cmp(&as_i64(right)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use sluice_ir::{Literal, SqlStruct};

    fn schema() -> LogicalSchema {
        LogicalSchema::builder()
            .key_column(ColumnName::of("ROWKEY"), SqlType::String)
            .value_column(ColumnName::of("I"), SqlType::Integer)
            .value_column(ColumnName::of("B"), SqlType::Bigint)
            .value_column(ColumnName::of("D"), SqlType::Double)
            .value_column(
                ColumnName::of("S"),
                SqlType::Struct(SqlStruct::builder().field("f", SqlType::Bigint).build()),
            )
            .build()
            .unwrap()
    }

    fn row() -> GenericRow {
        GenericRow::new(vec![
            Value::Integer(7),
            Value::Bigint(-3),
            Value::Double(1.5),
            Value::Struct(vec![("f".to_string(), Value::Bigint(42))]),
        ])
    }

    #[test]
    fn test_column_and_dereference() {
        let deref = compile_expression(
            &Expression::dereference(Expression::column("S"), "f"),
            &schema(),
        )
        .unwrap();

        assert_eq!(deref.expression_type(), &SqlType::Bigint);
        assert_eq!(deref.evaluate(&row()).unwrap(), Value::Bigint(42));
    }

    #[test]
    fn test_arithmetic_widens() {
        let expr = Expression::arithmetic(
            ArithmeticOp::Add,
            Expression::column("I"),
            Expression::column("B"),
        );
        let compiled = compile_expression(&expr, &schema()).unwrap();

        assert_eq!(compiled.expression_type(), &SqlType::Bigint);
        assert_eq!(compiled.evaluate(&row()).unwrap(), Value::Bigint(4));

        let expr = Expression::arithmetic(
            ArithmeticOp::Mul,
            Expression::column("D"),
            Expression::column("I"),
        );
        let compiled = compile_expression(&expr, &schema()).unwrap();
        assert_eq!(compiled.evaluate(&row()).unwrap(), Value::Double(10.5));
    }

    #[test]
    fn test_null_propagates() {
        let expr = Expression::arithmetic(
            ArithmeticOp::Add,
            Expression::column("I"),
            Expression::literal(Literal::Null),
        );
        let compiled = compile_expression(&expr, &schema()).unwrap();

        assert_eq!(compiled.expression_type(), &SqlType::Integer);
        assert_eq!(compiled.evaluate(&row()).unwrap(), Value::Null);
    }

    #[test]
    fn test_division_by_zero_is_row_error() {
        let expr = Expression::arithmetic(
            ArithmeticOp::Div,
            Expression::column("I"),
            Expression::literal(Literal::Integer(0)),
        );
        let compiled = compile_expression(&expr, &schema()).unwrap();

        assert_matches!(compiled.evaluate(&row()), Err(EvaluationError::DivisionByZero(_)));
    }

    #[test]
    fn test_comparison() {
        let expr = Expression::comparison(
            ComparisonOp::Ge,
            Expression::column("B"),
            Expression::literal(Literal::Double(-3.0)),
        );
        let compiled = compile_expression(&expr, &schema()).unwrap();

        assert_eq!(compiled.expression_type(), &SqlType::Boolean);
        assert_eq!(compiled.evaluate(&row()).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_compile_errors() {
        let schema = schema();

        assert_matches!(
            compile_expression(&Expression::column("X"), &schema),
            Err(ExpressionCompileError::UnknownColumn(_))
        );
        assert_matches!(
            compile_expression(&Expression::column("ROWKEY"), &schema),
            Err(ExpressionCompileError::KeyColumn(_))
        );
        assert_matches!(
            compile_expression(&Expression::dereference(Expression::column("I"), "f"), &schema),
            Err(ExpressionCompileError::NotAStruct { .. })
        );
        assert_matches!(
            compile_expression(&Expression::dereference(Expression::column("S"), "g"), &schema),
            Err(ExpressionCompileError::UnknownField { .. })
        );
        assert_matches!(
            compile_expression(&Expression::literal(Literal::Null), &schema),
            Err(ExpressionCompileError::UntypedExpression(_))
        );
        assert_matches!(
            compile_expression(
                &Expression::arithmetic(
                    ArithmeticOp::Add,
                    Expression::column("S"),
                    Expression::column("I")
                ),
                &schema
            ),
            Err(ExpressionCompileError::IncompatibleOperands { .. })
        );
    }
}
