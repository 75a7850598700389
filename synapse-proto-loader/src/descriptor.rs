//! Conversion between descriptor pools and FileDescriptorProto forms
//!
//! Forward: types and files in a pool become `DescriptorProto`,
//! `EnumDescriptorProto` and encoded `FileDescriptorProto` bytes.
//! Reverse: a binary or JSON `FileDescriptorSet` becomes a resolved pool.

use crate::error::{LoaderError, Result};
use prost::Message;
use prost_reflect::{DescriptorPool, DynamicMessage, EnumDescriptor, MessageDescriptor};
use prost_types::{DescriptorProto, EnumDescriptorProto, FileDescriptorSet};
use std::sync::Arc;

/// Fully qualified name of the descriptor set message
const FILE_DESCRIPTOR_SET_NAME: &str = "google.protobuf.FileDescriptorSet";

/// Encoded `FileDescriptorProto` for every file of a schema
///
/// Built once per schema; every type definition holds a reference to the
/// same list.
pub type FileDescriptorBytes = Arc<[Vec<u8>]>;

/// Encode each file of the pool exactly once
///
/// Encoding goes through the pool's own file representation so custom
/// option values survive the round trip.
pub fn file_descriptor_bytes(pool: &DescriptorPool) -> FileDescriptorBytes {
    pool.files().map(|file| file.encode_to_vec()).collect()
}

/// Descriptor proto describing a message's own structure
pub fn message_descriptor_proto(message: &MessageDescriptor) -> DescriptorProto {
    message.descriptor_proto().clone()
}

/// Descriptor proto describing an enum's own structure
pub fn enum_descriptor_proto(enum_desc: &EnumDescriptor) -> EnumDescriptorProto {
    enum_desc.enum_descriptor_proto().clone()
}

/// Build a resolved pool from a decoded descriptor set
pub fn pool_from_file_descriptor_set(set: FileDescriptorSet) -> Result<DescriptorPool> {
    Ok(DescriptorPool::from_file_descriptor_set(set)?)
}

/// Build a resolved pool from binary `FileDescriptorSet` bytes
pub fn pool_from_descriptor_set_bytes(bytes: &[u8]) -> Result<DescriptorPool> {
    FileDescriptorSet::decode(bytes).map_err(|e| {
        LoaderError::DescriptorSet(format!("failed to decode FileDescriptorSet: {}", e))
    })?;
    // prost_types drops unknown fields, extension option values included
    Ok(DescriptorPool::decode(bytes)?)
}

/// Build a resolved pool from a `FileDescriptorSet` in the proto3 JSON mapping
///
/// Field names may be given either as declared (`message_type`) or in
/// lowerCamelCase (`messageType`).
pub fn pool_from_descriptor_set_json(value: &serde_json::Value) -> Result<DescriptorPool> {
    let set_desc = DescriptorPool::global()
        .get_message_by_name(FILE_DESCRIPTOR_SET_NAME)
        .ok_or_else(|| {
            LoaderError::DescriptorSet(format!("{} is not available", FILE_DESCRIPTOR_SET_NAME))
        })?;

    let message = DynamicMessage::deserialize(set_desc, value.clone()).map_err(|e| {
        LoaderError::DescriptorSet(format!("invalid FileDescriptorSet object: {}", e))
    })?;
    let set: FileDescriptorSet = message
        .transcode_to()
        .map_err(|e| LoaderError::DescriptorSet(format!("invalid FileDescriptorSet: {}", e)))?;

    pool_from_file_descriptor_set(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::{
        EnumValueDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
        field_descriptor_proto::{Label, Type},
    };
    use serde_json::json;

    fn sample_set() -> FileDescriptorSet {
        FileDescriptorSet {
            file: vec![FileDescriptorProto {
                name: Some("shapes.proto".to_string()),
                package: Some("shapes".to_string()),
                message_type: vec![DescriptorProto {
                    name: Some("Square".to_string()),
                    field: vec![FieldDescriptorProto {
                        name: Some("side".to_string()),
                        number: Some(1),
                        label: Some(Label::Optional as i32),
                        r#type: Some(Type::Double as i32),
                        json_name: Some("side".to_string()),
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                enum_type: vec![EnumDescriptorProto {
                    name: Some("Colour".to_string()),
                    value: vec![EnumValueDescriptorProto {
                        name: Some("RED".to_string()),
                        number: Some(0),
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                syntax: Some("proto3".to_string()),
                ..Default::default()
            }],
        }
    }

    #[test]
    fn test_file_bytes_decode_back_to_file() {
        let pool = pool_from_file_descriptor_set(sample_set()).unwrap();
        let bytes = file_descriptor_bytes(&pool);

        assert_eq!(bytes.len(), pool.files().count());
        let decoded = prost_types::FileDescriptorProto::decode(&bytes[0][..]).unwrap();
        assert_eq!(decoded.name.as_deref(), Some("shapes.proto"));
        assert_eq!(decoded.message_type[0].field[0].number, Some(1));
    }

    #[test]
    fn test_type_descriptor_protos() {
        let pool = pool_from_file_descriptor_set(sample_set()).unwrap();
        let square = pool.get_message_by_name("shapes.Square").unwrap();
        let colour = pool.get_enum_by_name("shapes.Colour").unwrap();

        let message = message_descriptor_proto(&square);
        assert_eq!(message.name.as_deref(), Some("Square"));
        assert_eq!(message.field[0].r#type, Some(Type::Double as i32));

        let enum_proto = enum_descriptor_proto(&colour);
        assert_eq!(enum_proto.value[0].name.as_deref(), Some("RED"));
    }

    #[test]
    fn test_pool_from_bytes() {
        let bytes = sample_set().encode_to_vec();
        let pool = pool_from_descriptor_set_bytes(&bytes).unwrap();
        assert!(pool.get_message_by_name("shapes.Square").is_some());
    }

    #[test]
    fn test_pool_from_garbage_bytes() {
        let err = pool_from_descriptor_set_bytes(&[0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, LoaderError::DescriptorSet(_)));
    }

    #[test]
    fn test_pool_from_json() {
        let value = json!({
            "file": [{
                "name": "greet.proto",
                "package": "greet",
                "messageType": [{
                    "name": "Hello",
                    "field": [{
                        "name": "name",
                        "number": 1,
                        "label": "LABEL_OPTIONAL",
                        "type": "TYPE_STRING"
                    }]
                }],
                "syntax": "proto3"
            }]
        });

        let pool = pool_from_descriptor_set_json(&value).unwrap();
        let hello = pool.get_message_by_name("greet.Hello").unwrap();
        assert_eq!(hello.fields().count(), 1);
    }

    #[test]
    fn test_pool_from_invalid_json() {
        let err = pool_from_descriptor_set_json(&json!({ "file": 7 })).unwrap_err();
        assert!(matches!(err, LoaderError::DescriptorSet(_)));
    }
}
