use std::collections::HashSet;

use super::{PlanError, PlanNode, PlanNodeId};
use crate::expr::Expression;
use crate::schema::LogicalSchema;

/// Structural checks over a whole plan.
///
/// Distinct nodes must carry distinct ids; a subtree shared through `Arc` is one
/// node and is checked once. Every column an expression reads must exist in the
/// schema of the node's source. Filters keep their source's schema, and
/// aggregates keep their source's value columns under the new key.
pub fn validate_plan(root: &PlanNode) -> Result<(), PlanError> {
    let mut visited = Visited::default();
    validate_node(root, &mut visited)
}

#[derive(Default)]
struct Visited<'a> {
    nodes: HashSet<*const PlanNode>,
    ids: HashSet<&'a PlanNodeId>,
}

fn validate_node<'a>(node: &'a PlanNode, visited: &mut Visited<'a>) -> Result<(), PlanError> {
    if !visited.nodes.insert(node as *const PlanNode) {
        return Ok(());
    }
    if !visited.ids.insert(node.id()) {
        return Err(PlanError::DuplicateNodeId(node.id().clone()));
    }

    match node {
        PlanNode::Source(_) | PlanNode::Join(_) | PlanNode::Output(_) => {}
        PlanNode::Filter(n) => {
            check_columns(node, n.source().schema(), [n.predicate()])?;
            if n.schema() != n.source().schema() {
                return Err(PlanError::SchemaMismatch {
                    node: node.kind(),
                    id: node.id().clone(),
                    reason: "filter schema differs from its source".to_string(),
                });
            }
        }
        PlanNode::Project(n) => {
            check_columns(
                node,
                n.source().schema(),
                n.projection().iter().map(|s| &s.expression),
            )?;
        }
        PlanNode::Aggregate(n) => {
            check_columns(
                node,
                n.source().schema(),
                n.group_by()
                    .iter()
                    .chain(n.aggregates().iter().map(|s| &s.expression)),
            )?;
            if n.schema().value() != n.source().schema().value() {
                return Err(PlanError::SchemaMismatch {
                    node: node.kind(),
                    id: node.id().clone(),
                    reason: "aggregate value columns differ from its source".to_string(),
                });
            }
        }
    }

    for source in node.sources() {
        validate_node(source, visited)?;
    }
    Ok(())
}

fn check_columns<'e>(
    node: &PlanNode,
    schema: &LogicalSchema,
    expressions: impl IntoIterator<Item = &'e Expression>,
) -> Result<(), PlanError> {
    for expression in expressions {
        if let Some(missing) = expression
            .referenced_columns()
            .into_iter()
            .find(|column| schema.find_column(column).is_none())
        {
            return Err(PlanError::UnknownColumn {
                node: node.kind(),
                id: node.id().clone(),
                column: missing.clone(),
            });
        }
    }
    Ok(())
}
