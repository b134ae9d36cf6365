//! Expression trees referenced by plan nodes and group-by clauses

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::name::ColumnName;
use crate::types::SqlType;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Expression {
    ColumnReference { column: ColumnName },
    /// Access of a named field of a struct-typed expression.
    Dereference { base: Box<Expression>, field: String },
    Literal { value: Literal },
    Arithmetic { op: ArithmeticOp, left: Box<Expression>, right: Box<Expression> },
    Comparison { op: ComparisonOp, left: Box<Expression>, right: Box<Expression> },
    FunctionCall { name: String, args: Vec<Expression> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithmeticOp {
    Add, Sub, Mul, Div, Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    Eq, Ne, Lt, Le, Gt, Ge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i32),
    Bigint(i64),
    Double(f64),
    String(String),
}

impl Expression {
    pub fn column(name: impl Into<String>) -> Self {
        Expression::ColumnReference {
            column: ColumnName::of(name),
        }
    }

    pub fn dereference(base: Expression, field: impl Into<String>) -> Self {
        Expression::Dereference {
            base: Box::new(base),
            field: field.into(),
        }
    }

    pub fn literal(value: Literal) -> Self {
        Expression::Literal { value }
    }

    pub fn arithmetic(op: ArithmeticOp, left: Expression, right: Expression) -> Self {
        Expression::Arithmetic {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn comparison(op: ComparisonOp, left: Expression, right: Expression) -> Self {
        Expression::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Every column this expression reads, in first-seen order.
    pub fn referenced_columns(&self) -> Vec<&ColumnName> {
        let mut columns = Vec::new();
        self.collect_columns(&mut columns);
        columns
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a ColumnName>) {
        match self {
            Expression::ColumnReference { column } => {
                if !out.contains(&column) {
                    out.push(column);
                }
            }
            Expression::Dereference { base, .. } => base.collect_columns(out),
            Expression::Literal { .. } => {}
            Expression::Arithmetic { left, right, .. }
            | Expression::Comparison { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expression::FunctionCall { args, .. } => {
                for arg in args {
                    arg.collect_columns(out);
                }
            }
        }
    }
}

impl Literal {
    /// `None` for `NULL`, which has no type of its own.
    pub fn sql_type(&self) -> Option<SqlType> {
        match self {
            Literal::Null => None,
            Literal::Boolean(_) => Some(SqlType::Boolean),
            Literal::Integer(_) => Some(SqlType::Integer),
            Literal::Bigint(_) => Some(SqlType::Bigint),
            Literal::Double(_) => Some(SqlType::Double),
            Literal::String(_) => Some(SqlType::String),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Integer(i) => Value::Integer(*i),
            Literal::Bigint(i) => Value::Bigint(*i),
            Literal::Double(d) => Value::Double(*d),
            Literal::String(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub => "-",
            ArithmeticOp::Mul => "*",
            ArithmeticOp::Div => "/",
            ArithmeticOp::Mod => "%",
        };
        f.write_str(symbol)
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Ne => "<>",
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
        };
        f.write_str(symbol)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("NULL"),
            Literal::Boolean(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Bigint(i) => write!(f, "{}", i),
            Literal::Double(d) => write!(f, "{:?}", d),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::ColumnReference { column } => write!(f, "{}", column),
            Expression::Dereference { base, field } => write!(f, "{}->{}", base, field),
            Expression::Literal { value } => write!(f, "{}", value),
            Expression::Arithmetic { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Expression::Comparison { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Expression::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referenced_columns_deduplicated() {
        let expr = Expression::comparison(
            ComparisonOp::Gt,
            Expression::arithmetic(
                ArithmeticOp::Add,
                Expression::column("A"),
                Expression::dereference(Expression::column("S"), "f"),
            ),
            Expression::FunctionCall {
                name: "ABS".to_string(),
                args: vec![Expression::column("A")],
            },
        );

        let names: Vec<&str> = expr.referenced_columns().iter().map(|c| c.text()).collect();
        assert_eq!(names, vec!["A", "S"]);
    }

    #[test]
    fn test_display() {
        let expr = Expression::arithmetic(
            ArithmeticOp::Mul,
            Expression::dereference(Expression::column("COL3"), "someField"),
            Expression::literal(Literal::Double(2.0)),
        );
        assert_eq!(expr.to_string(), "(COL3->someField * 2.0)");
        assert_eq!(Literal::String("it's".into()).to_string(), "'it''s'");
    }
}
