//! Serialization formats, serde options and serde factories
//!
//! Everything needed to decide whether a schema can be read and written in a
//! given key/value format, without encoding any data.

mod error;
mod factory;
mod format;
mod options;
mod physical;
mod registry;

pub use error::SerdeError;
pub use factory::{
    GenericKeySerde, GenericRowSerde, KeySerde, KeySerdeFactory, ValueSerde, ValueSerdeFactory,
};
pub use format::{
    is_valid_avro_full_name, is_valid_avro_name, Format, FormatInfo, KeyFormat, ValueFormat,
    WindowInfo, WindowType, DELIMITER_PROPERTY, FULL_SCHEMA_NAME_PROPERTY,
};
pub use options::{SerdeOption, SerdeOptions};
pub use physical::{PersistenceSchema, PhysicalSchema};
pub use registry::{
    ConfiguredSchemaRegistry, RemoteSchemaRegistry, SchemaRegistryClient,
    SchemaRegistryClientFactory,
};
