use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use super::{PlanNode, PlanNodeId};
use crate::name::SourceName;
use crate::schema::LogicalSchema;

/// Where the rows of a query end up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum OutputSink {
    /// Transient result streamed back to the caller.
    Bare,
    /// Result persisted into a new stream or table backed by a topic.
    Persistent {
        sink_name: SourceName,
        topic_name: String,
    },
}

impl fmt::Display for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputSink::Bare => f.write_str("bare"),
            OutputSink::Persistent {
                sink_name,
                topic_name,
            } => write!(f, "{} (topic {})", sink_name, topic_name),
        }
    }
}

/// Terminal node of a query plan.
///
/// Adapts its single source to the final result schema, which is assigned
/// explicitly and may differ from the source's. The row limit is only carried
/// here; enforcing it is up to the runtime.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputNode {
    id: PlanNodeId,
    source: Arc<PlanNode>,
    schema: LogicalSchema,
    limit: Option<usize>,
    sink: OutputSink,
}

impl OutputNode {
    pub fn new(
        id: PlanNodeId,
        source: Arc<PlanNode>,
        schema: LogicalSchema,
        limit: Option<usize>,
        sink: OutputSink,
    ) -> Self {
        Self {
            id,
            source,
            schema,
            limit,
            sink,
        }
    }

    /// Transient output with the source's schema.
    pub fn bare(id: PlanNodeId, source: Arc<PlanNode>, limit: Option<usize>) -> Self {
        let schema = source.schema().clone();
        Self::new(id, source, schema, limit, OutputSink::Bare)
    }

    pub fn id(&self) -> &PlanNodeId {
        &self.id
    }

    pub fn source(&self) -> &Arc<PlanNode> {
        &self.source
    }

    pub fn schema(&self) -> &LogicalSchema {
        &self.schema
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn sink(&self) -> &OutputSink {
        &self.sink
    }
}
