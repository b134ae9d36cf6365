use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use sluice_engine::{group_by_params, plan_aggregate, PlanningError};
use sluice_ir::plan::{
    explain, rewrite, validate_plan, DataSourceNode, OutputNode, SelectExpression,
};
use sluice_ir::{
    ColumnName, DataSourceType, EngineConfig, Expression, GenericRow, LogicalSchema, PlanNode,
    PlanNodeId, SourceName, SqlStruct, SqlType, Value,
};
use sluice_streams::{GroupByError, ProcessingLogger, RecordProcessingError};

#[derive(Default)]
struct RecordingLogger {
    errors: Mutex<Vec<RecordProcessingError>>,
}

impl ProcessingLogger for RecordingLogger {
    fn error(&self, error: RecordProcessingError) {
        self.errors.lock().unwrap().push(error);
    }
}

fn orders() -> Arc<PlanNode> {
    let schema = LogicalSchema::builder()
        .key_column(ColumnName::of("ROWKEY"), SqlType::String)
        .value_column(ColumnName::of("REGION"), SqlType::String)
        .value_column(ColumnName::of("AMOUNT"), SqlType::Double)
        .value_column(
            ColumnName::of("ADDRESS"),
            SqlType::Struct(SqlStruct::builder().field("CITY", SqlType::String).build()),
        )
        .build()
        .unwrap();
    Arc::new(PlanNode::Source(DataSourceNode::new(
        PlanNodeId::new("source"),
        SourceName::of("ORDERS"),
        DataSourceType::Stream,
        schema,
    )))
}

fn row(region: Value, city: Value) -> GenericRow {
    GenericRow::new(vec![
        region,
        Value::Double(10.0),
        Value::Struct(vec![("CITY".to_string(), city)]),
    ])
}

fn totals() -> Vec<SelectExpression> {
    vec![SelectExpression::new(
        ColumnName::of("TOTAL"),
        Expression::column("AMOUNT"),
    )]
}

#[test]
fn test_default_mode_keys_by_rowkey() {
    let node = plan_aggregate(
        PlanNodeId::new("agg"),
        orders(),
        vec![Expression::column("REGION")],
        None,
        totals(),
        &EngineConfig::default(),
    )
    .unwrap();

    let key = &node.schema().key()[0];
    assert_eq!(key.name().text(), "ROWKEY");
    assert_eq!(key.sql_type(), &SqlType::String);
    assert_eq!(node.schema().value(), orders().schema().value());
    validate_plan(&node).unwrap();
}

#[test]
fn test_any_key_mode_keys_by_field_name() {
    let config = EngineConfig::default().with_any_key_name(true);

    let node = plan_aggregate(
        PlanNodeId::new("agg"),
        orders(),
        vec![Expression::dereference(Expression::column("ADDRESS"), "CITY")],
        None,
        totals(),
        &config,
    )
    .unwrap();

    assert_eq!(node.schema().key()[0].name().text(), "CITY");
}

#[test]
fn test_key_clashing_with_value_column() {
    let config = EngineConfig::default().with_any_key_name(true);

    let result = plan_aggregate(
        PlanNodeId::new("agg"),
        orders(),
        vec![Expression::column("REGION")],
        None,
        totals(),
        &config,
    );

    assert_matches!(result, Err(PlanningError::GroupBy(GroupByError::Schema(_))));
}

#[test]
fn test_aliased_column_key_avoids_clash() {
    let config = EngineConfig::default().with_any_key_name(true);

    let node = plan_aggregate(
        PlanNodeId::new("agg"),
        orders(),
        vec![Expression::column("REGION")],
        Some(ColumnName::of("REGION_KEY")),
        totals(),
        &config,
    )
    .unwrap();

    let key = &node.schema().key()[0];
    assert_eq!(key.name().text(), "REGION_KEY");
    assert_eq!(key.sql_type(), &SqlType::String);
    validate_plan(&node).unwrap();
}

#[test]
fn test_planned_schema_matches_runtime_params() {
    let config = EngineConfig::default().with_any_key_name(true);
    let alias = ColumnName::of("REGION_CITY");
    let node = plan_aggregate(
        PlanNodeId::new("agg"),
        orders(),
        vec![
            Expression::column("REGION"),
            Expression::dereference(Expression::column("ADDRESS"), "CITY"),
        ],
        Some(alias),
        totals(),
        &config,
    )
    .unwrap();
    let PlanNode::Aggregate(aggregate) = node.as_ref() else {
        panic!("expected an aggregate node, got {}", node.kind());
    };
    let logger = Arc::new(RecordingLogger::default());

    let params = group_by_params(aggregate, logger.clone(), &config).unwrap();

    assert_eq!(params.schema(), node.schema());
    let key = params
        .mapper()
        .apply(&row(
            Value::String("EU".to_string()),
            Value::String("Paris".to_string()),
        ))
        .unwrap();
    assert_eq!(key.field().text(), "REGION_CITY");
    assert_eq!(key.value(), &Value::String("EU|+|Paris".to_string()));

    let excluded = params
        .mapper()
        .apply(&row(Value::Null, Value::String("Paris".to_string())));
    assert_eq!(excluded, None);
    assert_eq!(logger.errors.lock().unwrap().len(), 1);
}

#[test]
fn test_rewritten_source_keeps_schema_and_params_in_step() {
    let config = EngineConfig::default();
    let planned = plan_aggregate(
        PlanNodeId::new("agg"),
        orders(),
        vec![Expression::column("REGION")],
        None,
        totals(),
        &config,
    )
    .unwrap();
    let widened = LogicalSchema::builder()
        .key_column(ColumnName::of("ROWKEY"), SqlType::String)
        .value_column(ColumnName::of("REGION"), SqlType::String)
        .value_column(ColumnName::of("AMOUNT"), SqlType::Double)
        .value_column(ColumnName::of("EXTRA"), SqlType::Bigint)
        .build()
        .unwrap();

    let rewritten = rewrite(&planned, &mut |node| match node {
        PlanNode::Source(n) => Some(PlanNode::Source(DataSourceNode::new(
            n.id().clone(),
            n.source_name().clone(),
            DataSourceType::Stream,
            widened.clone(),
        ))),
        _ => None,
    })
    .unwrap();
    let PlanNode::Aggregate(aggregate) = rewritten.as_ref() else {
        panic!("expected an aggregate node, got {}", rewritten.kind());
    };

    let params = group_by_params(aggregate, Arc::new(RecordingLogger::default()), &config).unwrap();

    assert_eq!(params.schema(), rewritten.schema());
    assert_eq!(rewritten.schema().value(), widened.value());
    validate_plan(&rewritten).unwrap();
}

#[test]
fn test_aggregate_under_output_explains() {
    let aggregate = plan_aggregate(
        PlanNodeId::new("agg"),
        orders(),
        vec![Expression::column("REGION")],
        None,
        totals(),
        &EngineConfig::default(),
    )
    .unwrap();
    let schema = aggregate.schema().clone();
    let output = PlanNode::Output(OutputNode::bare(
        PlanNodeId::new("out"),
        aggregate,
        Some(10),
    ));

    validate_plan(&output).unwrap();
    let text = explain(&output);

    assert!(text.starts_with("Output[out] limit=10 sink=bare\n"));
    assert!(text.contains("Aggregate[agg] group_by=[REGION]"));
    assert!(text.contains("Source[source] STREAM ORDERS"));
    assert_eq!(output.schema(), &schema);
}
