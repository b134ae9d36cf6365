use super::PlanNode;

/// Render a plan as an indented tree, one node per line, root first.
///
/// ```text
/// Output[3] limit=5 sink=bare
/// └─ Filter[2] predicate=(AMOUNT > 10.0)
///    └─ Source[1] STREAM ORDERS
/// ```
pub fn explain(root: &PlanNode) -> String {
    let mut out = String::new();
    write_node(&mut out, root, "", "");
    out
}

fn write_node(out: &mut String, node: &PlanNode, prefix: &str, child_prefix: &str) {
    out.push_str(prefix);
    out.push_str(&describe(node));
    out.push('\n');

    let sources = node.sources();
    let count = sources.len();
    for (i, source) in sources.into_iter().enumerate() {
        let (connector, continuation) = if i + 1 == count {
            ("└─ ", "   ")
        } else {
            ("├─ ", "│  ")
        };
        write_node(
            out,
            source,
            &format!("{}{}", child_prefix, connector),
            &format!("{}{}", child_prefix, continuation),
        );
    }
}

fn describe(node: &PlanNode) -> String {
    let details = match node {
        PlanNode::Source(n) => {
            let mut details = format!("{} {}", n.source_type(), n.source_name());
            if n.alias() != n.source_name() {
                details.push_str(&format!(" AS {}", n.alias()));
            }
            if let Some(ts) = n.timestamp_column() {
                details.push_str(&format!(" timestamp={}", ts));
            }
            details
        }
        PlanNode::Filter(n) => format!("predicate={}", n.predicate()),
        PlanNode::Project(n) => format!("select=[{}]", join(n.projection())),
        PlanNode::Aggregate(n) => {
            let mut details = format!("group_by=[{}]", join(n.group_by()));
            if let Some(alias) = n.key_alias() {
                details.push_str(&format!(" AS {}", alias));
            }
            if !n.aggregates().is_empty() {
                details.push_str(&format!(" aggregates=[{}]", join(n.aggregates())));
            }
            details
        }
        PlanNode::Join(n) => format!(
            "{} {} x {}",
            n.join_type(),
            n.left_alias(),
            n.right_alias()
        ),
        PlanNode::Output(n) => {
            let limit = n
                .limit()
                .map(|l| l.to_string())
                .unwrap_or_else(|| "none".to_string());
            format!("limit={} sink={}", limit, n.sink())
        }
    };

    format!("{}[{}] {}", node.kind(), node.id(), details)
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
