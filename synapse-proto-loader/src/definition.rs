//! Package definition types
//!
//! A [`PackageDefinition`] maps fully qualified names to service, message
//! and enum definitions. It is built in one pass and never modified
//! afterwards.

use crate::codec::{Deserializer, Serializer};
use crate::descriptor::FileDescriptorBytes;
use crate::method_options::MethodOptions;
use prost_types::{DescriptorProto, EnumDescriptorProto};
use std::collections::BTreeMap;

/// Which descriptor proto a type definition carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorFormat {
    /// A message type's `DescriptorProto`
    DescriptorProto,
    /// An enum type's `EnumDescriptorProto`
    EnumDescriptorProto,
}

impl DescriptorFormat {
    /// Literal format tag
    pub fn as_str(&self) -> &'static str {
        match self {
            DescriptorFormat::DescriptorProto => "Protocol Buffer 3 DescriptorProto",
            DescriptorFormat::EnumDescriptorProto => "Protocol Buffer 3 EnumDescriptorProto",
        }
    }
}

impl std::fmt::Display for DescriptorFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message type and the files needed to reflect on it
#[derive(Debug, Clone, PartialEq)]
pub struct MessageTypeDefinition {
    /// Always [`DescriptorFormat::DescriptorProto`]
    pub format: DescriptorFormat,
    /// Fully qualified type name
    pub type_name: String,
    /// The type's own structure
    pub descriptor: DescriptorProto,
    /// Encoded `FileDescriptorProto` of every file in the schema
    pub file_descriptor_protos: FileDescriptorBytes,
}

/// An enum type and the files needed to reflect on it
#[derive(Debug, Clone, PartialEq)]
pub struct EnumTypeDefinition {
    /// Always [`DescriptorFormat::EnumDescriptorProto`]
    pub format: DescriptorFormat,
    /// Fully qualified type name
    pub type_name: String,
    /// The type's own structure
    pub descriptor: EnumDescriptorProto,
    /// Encoded `FileDescriptorProto` of every file in the schema
    pub file_descriptor_protos: FileDescriptorBytes,
}

/// Everything an RPC runtime needs to call or serve one method
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDefinition {
    /// Wire path: `/package.Service/Method`
    pub path: String,
    /// Client streams requests
    pub request_stream: bool,
    /// Server streams responses
    pub response_stream: bool,
    /// Request encoder
    pub request_serialize: Serializer,
    /// Request decoder
    pub request_deserialize: Deserializer,
    /// Response encoder
    pub response_serialize: Serializer,
    /// Response decoder
    pub response_deserialize: Deserializer,
    /// lowerCamelCase alias of the method name
    pub original_name: String,
    /// Request message type
    pub request_type: MessageTypeDefinition,
    /// Response message type
    pub response_type: MessageTypeDefinition,
    /// Merged method options
    pub options: MethodOptions,
}

/// Methods of one service, keyed by declared method name
pub type ServiceDefinition = BTreeMap<String, MethodDefinition>;

/// One entry of a package definition
#[derive(Debug, Clone, PartialEq)]
pub enum AnyDefinition {
    /// An RPC service
    Service(ServiceDefinition),
    /// A message type
    Message(MessageTypeDefinition),
    /// An enum type
    Enum(EnumTypeDefinition),
}

impl AnyDefinition {
    /// Short label for the definition kind
    pub fn kind(&self) -> &'static str {
        match self {
            AnyDefinition::Service(_) => "service",
            AnyDefinition::Message(_) => "message",
            AnyDefinition::Enum(_) => "enum",
        }
    }

    /// The service definition, if this is one
    pub fn as_service(&self) -> Option<&ServiceDefinition> {
        match self {
            AnyDefinition::Service(service) => Some(service),
            _ => None,
        }
    }

    /// The message type definition, if this is one
    pub fn as_message(&self) -> Option<&MessageTypeDefinition> {
        match self {
            AnyDefinition::Message(message) => Some(message),
            _ => None,
        }
    }

    /// The enum type definition, if this is one
    pub fn as_enum(&self) -> Option<&EnumTypeDefinition> {
        match self {
            AnyDefinition::Enum(enum_def) => Some(enum_def),
            _ => None,
        }
    }
}

/// Fully qualified name to definition table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageDefinition {
    entries: BTreeMap<String, AnyDefinition>,
}

impl PackageDefinition {
    pub(crate) fn new(entries: BTreeMap<String, AnyDefinition>) -> Self {
        PackageDefinition { entries }
    }

    /// Look up any definition by qualified name
    pub fn get(&self, name: &str) -> Option<&AnyDefinition> {
        self.entries.get(name)
    }

    /// Look up a service by qualified name
    pub fn service(&self, name: &str) -> Option<&ServiceDefinition> {
        self.get(name).and_then(AnyDefinition::as_service)
    }

    /// Look up a message type by qualified name
    pub fn message_type(&self, name: &str) -> Option<&MessageTypeDefinition> {
        self.get(name).and_then(AnyDefinition::as_message)
    }

    /// Look up an enum type by qualified name
    pub fn enum_type(&self, name: &str) -> Option<&EnumTypeDefinition> {
        self.get(name).and_then(AnyDefinition::as_enum)
    }

    /// All entries in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnyDefinition)> {
        self.entries.iter().map(|(name, def)| (name.as_str(), def))
    }

    /// All services in name order
    pub fn services(&self) -> impl Iterator<Item = (&str, &ServiceDefinition)> {
        self.iter()
            .filter_map(|(name, def)| def.as_service().map(|service| (name, service)))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take the underlying map
    pub fn into_inner(self) -> BTreeMap<String, AnyDefinition> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a PackageDefinition {
    type Item = (&'a String, &'a AnyDefinition);
    type IntoIter = std::collections::btree_map::Iter<'a, String, AnyDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
