use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use super::{PlanError, PlanNode, PlanNodeId};
use crate::expr::Expression;
use crate::name::{ColumnName, DataSourceType, SourceName};
use crate::schema::LogicalSchema;

/// Leaf node reading a registered stream or table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSourceNode {
    id: PlanNodeId,
    source_name: SourceName,
    source_type: DataSourceType,
    alias: SourceName,
    schema: LogicalSchema,
    timestamp_column: Option<ColumnName>,
}

impl DataSourceNode {
    pub fn new(
        id: PlanNodeId,
        source_name: SourceName,
        source_type: DataSourceType,
        schema: LogicalSchema,
    ) -> Self {
        Self {
            id,
            alias: source_name.clone(),
            source_name,
            source_type,
            schema,
            timestamp_column: None,
        }
    }

    pub fn with_alias(mut self, alias: SourceName) -> Self {
        self.alias = alias;
        self
    }

    pub fn with_timestamp_column(mut self, column: ColumnName) -> Self {
        self.timestamp_column = Some(column);
        self
    }

    pub fn id(&self) -> &PlanNodeId {
        &self.id
    }

    pub fn source_name(&self) -> &SourceName {
        &self.source_name
    }

    pub fn source_type(&self) -> DataSourceType {
        self.source_type
    }

    pub fn alias(&self) -> &SourceName {
        &self.alias
    }

    pub fn schema(&self) -> &LogicalSchema {
        &self.schema
    }

    pub fn timestamp_column(&self) -> Option<&ColumnName> {
        self.timestamp_column.as_ref()
    }
}

/// Keeps rows matching a predicate. Its schema is always its source's schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterNode {
    id: PlanNodeId,
    source: Arc<PlanNode>,
    predicate: Expression,
    schema: LogicalSchema,
}

impl FilterNode {
    pub fn new(id: PlanNodeId, source: Arc<PlanNode>, predicate: Expression) -> Self {
        let schema = source.schema().clone();
        Self {
            id,
            source,
            predicate,
            schema,
        }
    }

    pub fn id(&self) -> &PlanNodeId {
        &self.id
    }

    pub fn source(&self) -> &Arc<PlanNode> {
        &self.source
    }

    pub fn predicate(&self) -> &Expression {
        &self.predicate
    }

    pub fn schema(&self) -> &LogicalSchema {
        &self.schema
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectExpression {
    pub alias: ColumnName,
    pub expression: Expression,
}

impl SelectExpression {
    pub fn new(alias: ColumnName, expression: Expression) -> Self {
        Self { alias, expression }
    }
}

impl fmt::Display for SelectExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} AS {}", self.expression, self.alias)
    }
}

/// Computes one value column per select expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectNode {
    id: PlanNodeId,
    source: Arc<PlanNode>,
    projection: Vec<SelectExpression>,
    schema: LogicalSchema,
}

impl ProjectNode {
    /// `projection` must line up with the value columns of `schema`, by count and by name.
    pub fn new(
        id: PlanNodeId,
        source: Arc<PlanNode>,
        projection: Vec<SelectExpression>,
        schema: LogicalSchema,
    ) -> Result<Self, PlanError> {
        if projection.len() != schema.value().len() {
            return Err(PlanError::ProjectionMismatch {
                expressions: projection.len(),
                columns: schema.value().len(),
            });
        }

        if let Some((select, column)) = projection
            .iter()
            .zip(schema.value())
            .find(|(select, column)| &select.alias != column.name())
        {
            return Err(PlanError::SchemaMismatch {
                node: "Project",
                id,
                reason: format!(
                    "alias '{}' does not match value column '{}'",
                    select.alias,
                    column.name()
                ),
            });
        }

        Ok(Self {
            id,
            source,
            projection,
            schema,
        })
    }

    pub fn id(&self) -> &PlanNodeId {
        &self.id
    }

    pub fn source(&self) -> &Arc<PlanNode> {
        &self.source
    }

    pub fn projection(&self) -> &[SelectExpression] {
        &self.projection
    }

    pub fn schema(&self) -> &LogicalSchema {
        &self.schema
    }
}

/// Groups its source by one or more expressions and computes aggregates per group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateNode {
    id: PlanNodeId,
    source: Arc<PlanNode>,
    group_by: Vec<Expression>,
    key_alias: Option<ColumnName>,
    aggregates: Vec<SelectExpression>,
    schema: LogicalSchema,
}

impl AggregateNode {
    pub fn new(
        id: PlanNodeId,
        source: Arc<PlanNode>,
        group_by: Vec<Expression>,
        key_alias: Option<ColumnName>,
        aggregates: Vec<SelectExpression>,
        schema: LogicalSchema,
    ) -> Result<Self, PlanError> {
        if group_by.is_empty() {
            return Err(PlanError::EmptyGroupBy(id));
        }

        Ok(Self {
            id,
            source,
            group_by,
            key_alias,
            aggregates,
            schema,
        })
    }

    pub fn id(&self) -> &PlanNodeId {
        &self.id
    }

    pub fn source(&self) -> &Arc<PlanNode> {
        &self.source
    }

    pub fn group_by(&self) -> &[Expression] {
        &self.group_by
    }

    pub fn key_alias(&self) -> Option<&ColumnName> {
        self.key_alias.as_ref()
    }

    pub fn aggregates(&self) -> &[SelectExpression] {
        &self.aggregates
    }

    pub fn schema(&self) -> &LogicalSchema {
        &self.schema
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JoinType {
    Inner,
    Left,
    Outer,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => f.write_str("INNER"),
            JoinType::Left => f.write_str("LEFT"),
            JoinType::Outer => f.write_str("OUTER"),
        }
    }
}

/// Joins two sources on their keys.
///
/// The result keeps the left key columns and every value column of both sides,
/// renamed `<alias>_<column>` so the two sides cannot collide.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinNode {
    id: PlanNodeId,
    join_type: JoinType,
    left: Arc<PlanNode>,
    right: Arc<PlanNode>,
    left_alias: SourceName,
    right_alias: SourceName,
    schema: LogicalSchema,
}

impl JoinNode {
    pub fn new(
        id: PlanNodeId,
        join_type: JoinType,
        left: Arc<PlanNode>,
        right: Arc<PlanNode>,
        left_alias: SourceName,
        right_alias: SourceName,
    ) -> Result<Self, PlanError> {
        let mut builder = LogicalSchema::builder();
        for key in left.schema().key() {
            builder = builder.key_column(key.name().clone(), key.sql_type().clone());
        }
        for (alias, side) in [(&left_alias, &left), (&right_alias, &right)] {
            for column in side.schema().value() {
                builder = builder.value_column(
                    ColumnName::of(format!("{}_{}", alias, column.name())),
                    column.sql_type().clone(),
                );
            }
        }
        let schema = builder.build()?;

        Ok(Self {
            id,
            join_type,
            left,
            right,
            left_alias,
            right_alias,
            schema,
        })
    }

    pub fn id(&self) -> &PlanNodeId {
        &self.id
    }

    pub fn join_type(&self) -> JoinType {
        self.join_type
    }

    pub fn left(&self) -> &Arc<PlanNode> {
        &self.left
    }

    pub fn right(&self) -> &Arc<PlanNode> {
        &self.right
    }

    pub fn left_alias(&self) -> &SourceName {
        &self.left_alias
    }

    pub fn right_alias(&self) -> &SourceName {
        &self.right_alias
    }

    pub fn schema(&self) -> &LogicalSchema {
        &self.schema
    }
}
