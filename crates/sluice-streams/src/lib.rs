//! Per-row building blocks handed to the streaming runtime
//!
//! Compiled expressions, the processing logger, group-by key derivation and
//! timestamp extraction. Everything built here is immutable and `Send + Sync`.

pub mod expression;
pub mod group_by;
pub mod processing_log;
pub mod timestamp;

pub use expression::{compile_expression, CompiledExpression, EvaluationError, ExpressionCompileError};
pub use group_by::{
    GroupByError, GroupByMapper, GroupByParams, GroupByParamsFactory, GROUP_BY_VALUE_SEPARATOR,
};
pub use processing_log::{
    NoopProcessingLogger, ProcessingLogger, RecordProcessingError, TracingProcessingLogger,
};
pub use timestamp::{
    TimestampColumn, TimestampError, TimestampExtractionPolicy, TimestampExtractionPolicyFactory,
};
