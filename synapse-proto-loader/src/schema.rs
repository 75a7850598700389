//! Namespace view over a resolved descriptor pool
//!
//! A [`DescriptorPool`] is already fully resolved: every method input and
//! output and every field type reference points at a concrete message or
//! enum, otherwise pool construction fails. This module arranges the pool's
//! contents into a tree of nested scopes, one [`Namespace`] per package
//! segment, so the definition builder can walk it the way names are
//! written.

use crate::error::{LoaderError, Result};
use prost_reflect::{
    DescriptorPool, EnumDescriptor, ExtensionDescriptor, MessageDescriptor, ServiceDescriptor,
};
use prost_types::FileDescriptorSet;
use std::collections::BTreeMap;

/// A node in the schema namespace
#[derive(Debug, Clone)]
pub enum SchemaNode {
    /// An RPC service
    Service(ServiceDescriptor),
    /// A message type
    Message(MessageDescriptor),
    /// An enum type
    Enum(EnumDescriptor),
    /// A package scope holding further nodes
    Namespace(Namespace),
    /// Anything else declared in a scope (extension fields)
    Other(ExtensionDescriptor),
}

impl SchemaNode {
    /// The node's own, unqualified name
    pub fn name(&self) -> &str {
        match self {
            SchemaNode::Service(service) => service.name(),
            SchemaNode::Message(message) => message.name(),
            SchemaNode::Enum(enum_desc) => enum_desc.name(),
            SchemaNode::Namespace(namespace) => namespace.name(),
            SchemaNode::Other(extension) => extension.name(),
        }
    }

    /// Short label for the node kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            SchemaNode::Service(_) => "service",
            SchemaNode::Message(_) => "message",
            SchemaNode::Enum(_) => "enum",
            SchemaNode::Namespace(_) => "namespace",
            SchemaNode::Other(_) => "other",
        }
    }

    /// Named children: a namespace's entries or a message's nested types
    pub fn children(&self) -> Vec<SchemaNode> {
        match self {
            SchemaNode::Namespace(namespace) => namespace.children().cloned().collect(),
            SchemaNode::Message(message) => nested_types(message).collect(),
            SchemaNode::Service(_) | SchemaNode::Enum(_) | SchemaNode::Other(_) => Vec::new(),
        }
    }
}

/// A named scope with uniquely named children
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    name: String,
    children: BTreeMap<String, SchemaNode>,
}

impl Namespace {
    fn new(name: &str) -> Self {
        Namespace {
            name: name.to_string(),
            children: BTreeMap::new(),
        }
    }

    /// Segment name; empty for the root
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Child nodes, ordered by name
    pub fn children(&self) -> impl Iterator<Item = &SchemaNode> {
        self.children.values()
    }

    /// Look up a direct child by name
    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.children.get(name)
    }

    /// Descend into (creating as needed) the namespace for a dotted package
    fn namespace_mut(&mut self, package: &str) -> Result<&mut Namespace> {
        let mut current = self;
        for segment in package.split('.').filter(|s| !s.is_empty()) {
            let node = current
                .children
                .entry(segment.to_string())
                .or_insert_with(|| SchemaNode::Namespace(Namespace::new(segment)));
            current = match node {
                SchemaNode::Namespace(namespace) => namespace,
                other => {
                    return Err(LoaderError::SchemaResolution(format!(
                        "package {} clashes with {} {}",
                        package,
                        other.kind(),
                        other.name()
                    )));
                }
            };
        }
        Ok(current)
    }

    fn insert(&mut self, node: SchemaNode) -> Result<()> {
        let name = node.name().to_string();
        if let Some(existing) = self.children.get(&name) {
            return Err(LoaderError::SchemaResolution(format!(
                "{} {} is already defined as a {} in scope '{}'",
                node.kind(),
                name,
                existing.kind(),
                self.name
            )));
        }
        self.children.insert(name, node);
        Ok(())
    }
}

/// A resolved schema: the descriptor pool plus its namespace tree
#[derive(Debug, Clone)]
pub struct SchemaTree {
    pool: DescriptorPool,
    root: Namespace,
}

impl SchemaTree {
    /// Arrange every file of a resolved pool into a namespace tree
    pub fn new(pool: DescriptorPool) -> Result<Self> {
        let mut root = Namespace::default();

        for file in pool.files() {
            let namespace = root.namespace_mut(file.package_name())?;
            for service in file.services() {
                namespace.insert(SchemaNode::Service(service))?;
            }
            for message in file.messages() {
                namespace.insert(SchemaNode::Message(message))?;
            }
            for enum_desc in file.enums() {
                namespace.insert(SchemaNode::Enum(enum_desc))?;
            }
            for extension in file.extensions() {
                namespace.insert(SchemaNode::Other(extension))?;
            }
        }

        Ok(SchemaTree { pool, root })
    }

    /// Build a pool from a descriptor set, resolving every reference, then
    /// arrange it into a tree
    pub fn from_file_descriptor_set(set: FileDescriptorSet) -> Result<Self> {
        Self::new(DescriptorPool::from_file_descriptor_set(set)?)
    }

    /// The underlying descriptor pool
    pub fn pool(&self) -> &DescriptorPool {
        &self.pool
    }

    /// The root namespace
    pub fn root(&self) -> &Namespace {
        &self.root
    }

    /// Look up a namespace-level node by its dotted qualified name
    pub fn lookup(&self, qualified_name: &str) -> Option<&SchemaNode> {
        let mut segments = qualified_name.split('.');
        let mut node = self.root.get(segments.next()?)?;
        for segment in segments {
            node = match node {
                SchemaNode::Namespace(namespace) => namespace.get(segment)?,
                _ => return None,
            };
        }
        Some(node)
    }
}

/// Types declared inside a message, as nodes of their own
///
/// Synthetic map entry messages are not part of the namespace.
pub fn nested_types(message: &MessageDescriptor) -> impl Iterator<Item = SchemaNode> + '_ {
    message
        .child_messages()
        .filter(|nested| !nested.is_map_entry())
        .map(SchemaNode::Message)
        .chain(message.child_enums().map(SchemaNode::Enum))
        .chain(message.child_extensions().map(SchemaNode::Other))
}

/// Join a parent's qualified name with a child name; the root adds no prefix
pub fn join_name(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}
