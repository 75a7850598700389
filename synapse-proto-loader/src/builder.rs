//! Package definition building
//!
//! Walks a [`SchemaTree`] depth first, collects every service, message and
//! enum under its qualified name, and turns each into a definition. File
//! descriptors are encoded once and shared by every type definition.

use crate::codec::{Deserializer, Serializer};
use crate::definition::{
    AnyDefinition, DescriptorFormat, EnumTypeDefinition, MessageTypeDefinition, MethodDefinition,
    PackageDefinition, ServiceDefinition,
};
use crate::descriptor::{self, FileDescriptorBytes};
use crate::error::{LoaderError, Result};
use crate::method_options::{merge_method_options, method_option_fragments};
use crate::options::Options;
use crate::schema::{Namespace, SchemaNode, SchemaTree, join_name};
use heck::ToLowerCamelCase;
use prost_reflect::{EnumDescriptor, MessageDescriptor, MethodDescriptor, ServiceDescriptor};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// State shared by every definition of one build
struct BuildContext {
    file_descriptors: FileDescriptorBytes,
    options: Arc<Options>,
}

/// Build the definition table for a resolved schema
pub fn build_package_definition(tree: &SchemaTree, options: &Options) -> Result<PackageDefinition> {
    let context = BuildContext {
        file_descriptors: descriptor::file_descriptor_bytes(tree.pool()),
        options: Arc::new(options.clone()),
    };
    debug!(
        files = context.file_descriptors.len(),
        "encoded file descriptors"
    );

    let mut handled = Vec::new();
    collect_namespace(tree.root(), "", &mut handled);

    let mut entries = BTreeMap::new();
    for (name, node) in handled {
        let definition = create_definition(&name, &node, &context)?;
        trace!(name = %name, kind = definition.kind(), "created definition");
        entries.insert(name, definition);
    }

    debug!(definitions = entries.len(), "built package definition");
    Ok(PackageDefinition::new(entries))
}

/// Collect every service, message and enum reachable from `node`
///
/// Services and enums end their branch. Messages are collected and their
/// nested types are walked under the message's name. Namespaces recurse;
/// anything else contributes nothing.
pub fn collect_handled_nodes(
    node: &SchemaNode,
    parent_name: &str,
    handled: &mut Vec<(String, SchemaNode)>,
) {
    let name = join_name(parent_name, node.name());
    match node {
        SchemaNode::Service(_) | SchemaNode::Enum(_) => handled.push((name, node.clone())),
        SchemaNode::Message(_) => {
            for nested in node.children() {
                collect_handled_nodes(&nested, &name, handled);
            }
            handled.push((name, node.clone()));
        }
        SchemaNode::Namespace(namespace) => collect_namespace(namespace, &name, handled),
        SchemaNode::Other(_) => {}
    }
}

fn collect_namespace(namespace: &Namespace, name: &str, handled: &mut Vec<(String, SchemaNode)>) {
    for child in namespace.children() {
        collect_handled_nodes(child, name, handled);
    }
}

fn create_definition(name: &str, node: &SchemaNode, context: &BuildContext) -> Result<AnyDefinition> {
    match node {
        SchemaNode::Service(service) => Ok(AnyDefinition::Service(create_service_definition(
            service, context,
        ))),
        SchemaNode::Message(message) => Ok(AnyDefinition::Message(message_type_definition(
            message,
            &context.file_descriptors,
        ))),
        SchemaNode::Enum(enum_desc) => Ok(AnyDefinition::Enum(enum_type_definition(
            enum_desc,
            &context.file_descriptors,
        ))),
        SchemaNode::Namespace(_) | SchemaNode::Other(_) => Err(LoaderError::Classification {
            name: name.to_string(),
        }),
    }
}

fn create_service_definition(service: &ServiceDescriptor, context: &BuildContext) -> ServiceDefinition {
    service
        .methods()
        .map(|method| {
            (
                method.name().to_string(),
                create_method_definition(service, &method, context),
            )
        })
        .collect()
}

fn create_method_definition(
    service: &ServiceDescriptor,
    method: &MethodDescriptor,
    context: &BuildContext,
) -> MethodDefinition {
    let input = method.input();
    let output = method.output();

    MethodDefinition {
        path: format!("/{}/{}", service.full_name(), method.name()),
        request_stream: method.is_client_streaming(),
        response_stream: method.is_server_streaming(),
        request_serialize: Serializer::new(input.clone()),
        request_deserialize: Deserializer::new(input.clone(), context.options.clone()),
        response_serialize: Serializer::new(output.clone()),
        response_deserialize: Deserializer::new(output.clone(), context.options.clone()),
        original_name: method.name().to_lower_camel_case(),
        request_type: message_type_definition(&input, &context.file_descriptors),
        response_type: message_type_definition(&output, &context.file_descriptors),
        options: merge_method_options(&method_option_fragments(method)),
    }
}

fn message_type_definition(
    message: &MessageDescriptor,
    file_descriptors: &FileDescriptorBytes,
) -> MessageTypeDefinition {
    MessageTypeDefinition {
        format: DescriptorFormat::DescriptorProto,
        type_name: message.full_name().to_string(),
        descriptor: descriptor::message_descriptor_proto(message),
        file_descriptor_protos: file_descriptors.clone(),
    }
}

fn enum_type_definition(
    enum_desc: &EnumDescriptor,
    file_descriptors: &FileDescriptorBytes,
) -> EnumTypeDefinition {
    EnumTypeDefinition {
        format: DescriptorFormat::EnumDescriptorProto,
        type_name: enum_desc.full_name().to_string(),
        descriptor: descriptor::enum_descriptor_proto(enum_desc),
        file_descriptor_protos: file_descriptors.clone(),
    }
}
