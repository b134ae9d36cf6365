//! Immutable plan-node tree for compiled queries
//!
//! Node kinds form a closed enum. Passes over a plan (`explain`, `validate_plan`,
//! `fingerprint`) are single functions that match on every kind, so adding a
//! kind fails to compile until each pass handles it.
//!
//! Children are held behind `Arc`, so rewritten plans share every subtree the
//! rewrite did not touch.

mod explain;
mod nodes;
mod output;
mod validate;

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::name::ColumnName;
use crate::schema::{LogicalSchema, SchemaError};

pub use explain::explain;
pub use nodes::{
    AggregateNode, DataSourceNode, FilterNode, JoinNode, JoinType, ProjectNode, SelectExpression,
};
pub use output::{OutputNode, OutputSink};
pub use validate::validate_plan;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("Error in projection: {expressions} expression(s) supplied for {columns} value column(s)")]
    ProjectionMismatch { expressions: usize, columns: usize },

    #[error("Aggregate node {0} requires at least one GROUP BY expression")]
    EmptyGroupBy(PlanNodeId),

    #[error("{node} node {id} expects {expected} source(s), got {actual}")]
    Arity {
        node: &'static str,
        id: PlanNodeId,
        expected: usize,
        actual: usize,
    },

    #[error("Duplicate plan node id: {0}")]
    DuplicateNodeId(PlanNodeId),

    #[error("{node} node {id} references unknown column '{column}'")]
    UnknownColumn {
        node: &'static str,
        id: PlanNodeId,
        column: ColumnName,
    },

    #[error("{node} node {id} has an inconsistent schema: {reason}")]
    SchemaMismatch {
        node: &'static str,
        id: PlanNodeId,
        reason: String,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Identifier of a node, unique within one plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PlanNodeId(String);

impl PlanNodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlanNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node")]
pub enum PlanNode {
    Source(DataSourceNode),
    Filter(FilterNode),
    Project(ProjectNode),
    Aggregate(AggregateNode),
    Join(JoinNode),
    Output(OutputNode),
}

impl PlanNode {
    pub fn id(&self) -> &PlanNodeId {
        match self {
            PlanNode::Source(n) => n.id(),
            PlanNode::Filter(n) => n.id(),
            PlanNode::Project(n) => n.id(),
            PlanNode::Aggregate(n) => n.id(),
            PlanNode::Join(n) => n.id(),
            PlanNode::Output(n) => n.id(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PlanNode::Source(_) => "Source",
            PlanNode::Filter(_) => "Filter",
            PlanNode::Project(_) => "Project",
            PlanNode::Aggregate(_) => "Aggregate",
            PlanNode::Join(_) => "Join",
            PlanNode::Output(_) => "Output",
        }
    }

    pub fn schema(&self) -> &LogicalSchema {
        match self {
            PlanNode::Source(n) => n.schema(),
            PlanNode::Filter(n) => n.schema(),
            PlanNode::Project(n) => n.schema(),
            PlanNode::Aggregate(n) => n.schema(),
            PlanNode::Join(n) => n.schema(),
            PlanNode::Output(n) => n.schema(),
        }
    }

    /// Child nodes in order: none for a source, left then right for a join, one otherwise.
    pub fn sources(&self) -> Vec<&Arc<PlanNode>> {
        match self {
            PlanNode::Source(_) => vec![],
            PlanNode::Filter(n) => vec![n.source()],
            PlanNode::Project(n) => vec![n.source()],
            PlanNode::Aggregate(n) => vec![n.source()],
            PlanNode::Join(n) => vec![n.left(), n.right()],
            PlanNode::Output(n) => vec![n.source()],
        }
    }

    /// Rebuild this node over new children, re-deriving any schema that depends on them.
    pub fn with_sources(&self, sources: Vec<Arc<PlanNode>>) -> Result<PlanNode, PlanError> {
        let node = match self {
            PlanNode::Source(n) => {
                self.check_arity(0, sources.len())?;
                PlanNode::Source(n.clone())
            }
            PlanNode::Filter(n) => PlanNode::Filter(FilterNode::new(
                n.id().clone(),
                self.single_source(sources)?,
                n.predicate().clone(),
            )),
            PlanNode::Project(n) => PlanNode::Project(ProjectNode::new(
                n.id().clone(),
                self.single_source(sources)?,
                n.projection().to_vec(),
                n.schema().clone(),
            )?),
            PlanNode::Aggregate(n) => {
                let source = self.single_source(sources)?;
                // re-key the new source's value columns under the existing key
                let schema = match n.schema().key() {
                    [key] => source
                        .schema()
                        .with_key_column(key.name().clone(), key.sql_type().clone())?,
                    _ => n.schema().clone(),
                };
                PlanNode::Aggregate(AggregateNode::new(
                    n.id().clone(),
                    source,
                    n.group_by().to_vec(),
                    n.key_alias().cloned(),
                    n.aggregates().to_vec(),
                    schema,
                )?)
            }
            PlanNode::Join(n) => {
                self.check_arity(2, sources.len())?;
                let mut sources = sources.into_iter();
                let (left, right) = match (sources.next(), sources.next()) {
                    (Some(left), Some(right)) => (left, right),
                    _ => return Err(self.arity_error(2, 0)),
                };
                PlanNode::Join(JoinNode::new(
                    n.id().clone(),
                    n.join_type(),
                    left,
                    right,
                    n.left_alias().clone(),
                    n.right_alias().clone(),
                )?)
            }
            PlanNode::Output(n) => PlanNode::Output(OutputNode::new(
                n.id().clone(),
                self.single_source(sources)?,
                n.schema().clone(),
                n.limit(),
                n.sink().clone(),
            )),
        };
        Ok(node)
    }

    /// SHA-256 of the serialized plan, stable for structurally equal plans.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("plan should always serialize");
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn single_source(&self, sources: Vec<Arc<PlanNode>>) -> Result<Arc<PlanNode>, PlanError> {
        let actual = sources.len();
        let [source]: [Arc<PlanNode>; 1] = sources
            .try_into()
            .map_err(|_| self.arity_error(1, actual))?;
        Ok(source)
    }

    fn check_arity(&self, expected: usize, actual: usize) -> Result<(), PlanError> {
        if expected == actual {
            Ok(())
        } else {
            Err(self.arity_error(expected, actual))
        }
    }

    fn arity_error(&self, expected: usize, actual: usize) -> PlanError {
        PlanError::Arity {
            node: self.kind(),
            id: self.id().clone(),
            expected,
            actual,
        }
    }
}

/// Apply `f` bottom-up and return the rewritten tree.
///
/// `f` sees each node after its children were rewritten and returns a replacement,
/// or `None` to keep it. Nodes whose children are unchanged and that `f` keeps are
/// returned as the original `Arc`.
pub fn rewrite<F>(node: &Arc<PlanNode>, f: &mut F) -> Result<Arc<PlanNode>, PlanError>
where
    F: FnMut(&PlanNode) -> Option<PlanNode>,
{
    let sources = node.sources();
    let mut rewritten = Vec::with_capacity(sources.len());
    let mut changed = false;
    for source in sources {
        let new_source = rewrite(source, f)?;
        changed |= !Arc::ptr_eq(source, &new_source);
        rewritten.push(new_source);
    }

    let rebuilt = if changed {
        Some(node.with_sources(rewritten)?)
    } else {
        None
    };

    let candidate: &PlanNode = rebuilt.as_ref().unwrap_or(node.as_ref());
    match f(candidate) {
        Some(replacement) => Ok(Arc::new(replacement)),
        None => Ok(match rebuilt {
            Some(rebuilt) => Arc::new(rebuilt),
            None => Arc::clone(node),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ComparisonOp, Expression, Literal};
    use crate::name::{DataSourceType, SourceName};
    use crate::types::SqlType;
    use assert_matches::assert_matches;

    fn source_schema() -> LogicalSchema {
        LogicalSchema::builder()
            .key_column(ColumnName::of("ROWKEY"), SqlType::String)
            .value_column(ColumnName::of("ID"), SqlType::Bigint)
            .value_column(ColumnName::of("AMOUNT"), SqlType::Double)
            .build()
            .unwrap()
    }

    fn source(id: &str) -> Arc<PlanNode> {
        Arc::new(PlanNode::Source(DataSourceNode::new(
            PlanNodeId::new(id),
            SourceName::of("ORDERS"),
            DataSourceType::Stream,
            source_schema(),
        )))
    }

    fn filter(id: &str, source: Arc<PlanNode>) -> Arc<PlanNode> {
        Arc::new(PlanNode::Filter(FilterNode::new(
            PlanNodeId::new(id),
            source,
            Expression::comparison(
                ComparisonOp::Gt,
                Expression::column("AMOUNT"),
                Expression::literal(Literal::Double(10.0)),
            ),
        )))
    }

    fn output(id: &str, source: Arc<PlanNode>) -> Arc<PlanNode> {
        Arc::new(PlanNode::Output(OutputNode::bare(PlanNodeId::new(id), source, Some(5))))
    }

    #[test]
    fn test_sources_per_kind() {
        let plan = output("3", filter("2", source("1")));

        assert_eq!(plan.sources().len(), 1);
        assert_eq!(plan.sources()[0].kind(), "Filter");
        assert!(plan.sources()[0].sources()[0].sources().is_empty());
    }

    #[test]
    fn test_filter_schema_is_source_schema() {
        let plan = filter("2", source("1"));
        assert_eq!(plan.schema(), &source_schema());
    }

    #[test]
    fn test_identity_rewrite_shares_whole_tree() {
        let plan = output("3", filter("2", source("1")));

        let rewritten = rewrite(&plan, &mut |_| None).unwrap();

        assert!(Arc::ptr_eq(&plan, &rewritten));
    }

    #[test]
    fn test_rewrite_shares_untouched_subtrees() {
        let scan = source("1");
        let plan = output("3", filter("2", Arc::clone(&scan)));

        // Drop the filter by replacing it with its input.
        let rewritten = rewrite(&plan, &mut |node| match node {
            PlanNode::Filter(f) => Some(f.source().as_ref().clone()),
            _ => None,
        })
        .unwrap();

        assert!(!Arc::ptr_eq(&plan, &rewritten));
        assert_eq!(rewritten.kind(), "Output");
        assert_eq!(rewritten.sources()[0].kind(), "Source");
        // The original tree is untouched.
        assert_eq!(plan.sources()[0].kind(), "Filter");
        assert!(Arc::ptr_eq(plan.sources()[0].sources()[0], &scan));
    }

    #[test]
    fn test_with_sources_checks_arity() {
        let plan = filter("2", source("1"));

        let result = plan.with_sources(vec![source("a"), source("b")]);

        assert_matches!(
            result,
            Err(PlanError::Arity { node: "Filter", expected: 1, actual: 2, .. })
        );
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let first = output("3", filter("2", source("1")));
        let second = output("3", filter("2", source("1")));
        let other = output("3", source("1"));

        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_ne!(first.fingerprint(), other.fingerprint());
    }
}
