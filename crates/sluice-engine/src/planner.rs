//! Aggregation planning
//!
//! Binds `GROUP BY` expressions to the source schema, derives the re-keyed
//! schema for the aggregate node and, at query start, the key mapper.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use sluice_ir::plan::{AggregateNode, SelectExpression};
use sluice_ir::{ColumnName, EngineConfig, Expression, LogicalSchema, PlanError, PlanNode, PlanNodeId};
use sluice_streams::{
    compile_expression, CompiledExpression, ExpressionCompileError, GroupByError, GroupByParams,
    GroupByParamsFactory, ProcessingLogger,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanningError {
    #[error("Invalid GROUP BY expression: {0}")]
    Compile(#[from] ExpressionCompileError),

    #[error(transparent)]
    GroupBy(#[from] GroupByError),

    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// Build an aggregate node over `source`, keyed the way its group-by mapper
/// will key rows at runtime.
pub fn plan_aggregate(
    id: PlanNodeId,
    source: Arc<PlanNode>,
    group_by: Vec<Expression>,
    key_alias: Option<ColumnName>,
    aggregates: Vec<SelectExpression>,
    config: &EngineConfig,
) -> Result<Arc<PlanNode>, PlanningError> {
    if group_by.is_empty() {
        return Err(PlanError::EmptyGroupBy(id).into());
    }

    let compiled = compile_all(&group_by, source.schema())?;
    let schema = GroupByParamsFactory::build_schema(
        source.schema(),
        &compiled,
        key_alias.as_ref(),
        config,
    )?;
    debug!(node = %id, schema = %schema, "planned aggregate");

    let node = AggregateNode::new(id, source, group_by, key_alias, aggregates, schema)?;
    Ok(Arc::new(PlanNode::Aggregate(node)))
}

/// Group-by parameters for a planned aggregate, using `logger` for rows that
/// cannot be keyed.
pub fn group_by_params(
    node: &AggregateNode,
    logger: Arc<dyn ProcessingLogger>,
    config: &EngineConfig,
) -> Result<GroupByParams, PlanningError> {
    let source_schema = node.source().schema();
    let compiled = compile_all(node.group_by(), source_schema)?;

    Ok(GroupByParamsFactory::build(
        source_schema,
        compiled,
        node.key_alias(),
        logger,
        config,
    )?)
}

fn compile_all(
    expressions: &[Expression],
    schema: &LogicalSchema,
) -> Result<Vec<Arc<dyn CompiledExpression>>, ExpressionCompileError> {
    expressions
        .iter()
        .map(|expression| compile_expression(expression, schema))
        .collect()
}
