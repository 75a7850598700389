//! synapse-proto-loader
//!
//! Turns a resolved protobuf schema into a flat, name-keyed table of
//! definitions an RPC runtime can consume directly: per-method serializer
//! and deserializer pairs, wire paths, streaming flags, merged method
//! options, and descriptor metadata for every message and enum.
//!
//! Schemas come from `.proto` sources (parsed with `protox`), from a binary
//! or JSON `FileDescriptorSet`, or from an existing
//! [`prost_reflect::DescriptorPool`].
//!
//! ```rust,ignore
//! use synapse_proto_loader::{Options, load_sync};
//!
//! let options: Options = "keep_case,longs=String".parse()?;
//! let package = load_sync(&["proto/geo.proto"], &options.include_dir("proto"))?;
//!
//! let locate = &package.service("maps.geo.Locator").unwrap()["Locate"];
//! assert_eq!(locate.path, "/maps.geo.Locator/Locate");
//! let bytes = locate.request_serialize.serialize(&serde_json::json!({ "x": 1 }))?;
//! ```

#![warn(missing_docs)]

pub mod builder;
pub mod codec;
pub mod definition;
pub mod descriptor;
mod error;
pub mod loader;
pub mod method_options;
pub mod options;
pub mod schema;

pub use builder::build_package_definition;
pub use codec::{Deserializer, Serializer};
pub use definition::{
    AnyDefinition, DescriptorFormat, EnumTypeDefinition, MessageTypeDefinition, MethodDefinition,
    PackageDefinition, ServiceDefinition,
};
pub use error::{LoaderError, Result};
pub use loader::{
    from_descriptor_pool, load, load_file_descriptor_set_from_buffer,
    load_file_descriptor_set_from_json, load_sync,
};
pub use method_options::{IdempotencyLevel, MethodOptions, OptionsFragment, merge_method_options};
pub use options::{BytesRepr, EnumRepr, LongRepr, Options};
pub use schema::{SchemaNode, SchemaTree};

// Re-exports
pub use prost_reflect;
