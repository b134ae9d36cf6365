//! Sluice engine - statement compilation for the streaming SQL layer
//!
//! Turns parsed `CREATE STREAM` / `CREATE TABLE` statements into validated
//! source commands and plans aggregations over the plan-node tree.

pub mod config;
pub mod ddl;
pub mod logging;
pub mod planner;
pub mod services;
pub mod topic;

pub use config::{Config, ConfigError, LoggingConfig};
pub use ddl::{
    CreateSourceCommand, CreateSourceError, CreateSourceFactory, Formats, SerdeOptionsSupplier,
};
pub use planner::{group_by_params, plan_aggregate, PlanningError};
pub use services::{InMemoryTopicClient, ServiceContext, TopicClient};
pub use topic::{Topic, TopicFactory};
