//! DDL statement compilation

mod commands;
mod create_source;

pub use commands::{CreateSourceCommand, Formats};
pub use create_source::{CreateSourceError, CreateSourceFactory, SerdeOptionsSupplier};
