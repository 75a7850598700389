//! `DynamicMessage` to shaped value conversion
//!
//! Applies the deserializer's [`Options`]: field name case, long/enum/bytes
//! representation, default population, oneof markers and JSON mode.

use super::{ANY_TYPE_KEY, ANY_TYPE_NAME, DEFAULT_TYPE_URL_PREFIX};
use crate::error::{LoaderError, Result};
use crate::options::{BytesRepr, EnumRepr, LongRepr, Options};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use heck::ToLowerCamelCase;
use prost_reflect::{
    DynamicMessage, FieldDescriptor, Kind, MapKey, OneofDescriptor, ReflectMessage,
    Value as ReflectValue,
};
use serde_json::{Map, Value};

pub(crate) fn message_to_value(message: &DynamicMessage, options: &Options) -> Result<Value> {
    message_to_object(message, options).map(Value::Object)
}

fn message_to_object(message: &DynamicMessage, options: &Options) -> Result<Map<String, Value>> {
    let desc = message.descriptor();

    if options.json && desc.full_name() == ANY_TYPE_NAME {
        if let Some(expanded) = expand_any(message, options)? {
            return Ok(expanded);
        }
    }

    let mut object = Map::new();
    for field in desc.fields() {
        if message.has_field(&field) {
            let value = message.get_field(&field);
            object.insert(field_key(field.name(), options), field_to_value(&field, &value, options)?);
        } else if let Some(default) = default_for(&field, options) {
            object.insert(field_key(field.name(), options), default);
        }
    }

    if options.oneofs {
        for oneof in desc.oneofs().filter(|oneof| !is_synthetic(oneof)) {
            if let Some(member) = oneof.fields().find(|f| message.has_field(f)) {
                object.insert(
                    field_key(oneof.name(), options),
                    Value::String(field_key(member.name(), options)),
                );
            }
        }
    }

    Ok(object)
}

/// The implicit oneof wrapping a proto3 `optional` field
fn is_synthetic(oneof: &OneofDescriptor) -> bool {
    oneof
        .fields()
        .all(|field| field.field_descriptor_proto().proto3_optional())
}

/// Decode an Any's payload and tag it with `@type`
///
/// Returns `None` when the Any has no type URL or its type is not in the
/// pool, in which case the raw `type_url`/`value` shape is kept. An empty
/// payload is the payload type's default message.
fn expand_any(message: &DynamicMessage, options: &Options) -> Result<Option<Map<String, Value>>> {
    let type_url = message
        .get_field_by_name("type_url")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let payload = message
        .get_field_by_name("value")
        .and_then(|v| v.as_bytes().cloned())
        .unwrap_or_default();
    if type_url.is_empty() {
        return Ok(None);
    }

    let split = type_url.rfind('/').map(|i| i + 1).unwrap_or(0);
    let (prefix, type_name) = type_url.split_at(split);
    let Some(payload_type) = message.descriptor().parent_pool().get_message_by_name(type_name) else {
        return Ok(None);
    };

    let decoded = DynamicMessage::decode(payload_type.clone(), payload).map_err(|source| {
        LoaderError::Decoding {
            type_name: payload_type.full_name().to_string(),
            source,
        }
    })?;

    let mut object = message_to_object(&decoded, options)?;
    let prefix = if prefix.is_empty() { DEFAULT_TYPE_URL_PREFIX } else { prefix };
    object.insert(
        ANY_TYPE_KEY.to_string(),
        Value::String(format!("{}{}", prefix, payload_type.full_name())),
    );
    Ok(Some(object))
}

fn field_key(name: &str, options: &Options) -> String {
    if options.keep_case {
        name.to_string()
    } else {
        name.to_lower_camel_case()
    }
}

/// Zero value for an absent field, if the options ask for one
///
/// Oneof members, including proto3 `optional` fields, are never defaulted.
fn default_for(field: &FieldDescriptor, options: &Options) -> Option<Value> {
    if field.is_map() {
        return (options.objects || options.defaults).then(|| Value::Object(Map::new()));
    }
    if field.is_list() {
        return (options.arrays || options.defaults).then(|| Value::Array(Vec::new()));
    }
    if !options.defaults || field.containing_oneof().is_some() {
        return None;
    }
    match field.kind() {
        Kind::Message(_) => Some(Value::Null),
        kind => scalar_to_value(&kind, &ReflectValue::default_value_for_field(field), options).ok(),
    }
}

fn field_to_value(field: &FieldDescriptor, value: &ReflectValue, options: &Options) -> Result<Value> {
    match value {
        ReflectValue::Map(entries) => {
            let value_kind = match field.kind() {
                Kind::Message(entry) => entry.map_entry_value_field().kind(),
                other => other,
            };
            let mut object = Map::new();
            for (key, item) in entries {
                object.insert(map_key_string(key), scalar_to_value(&value_kind, item, options)?);
            }
            Ok(Value::Object(object))
        }
        ReflectValue::List(items) => items
            .iter()
            .map(|item| scalar_to_value(&field.kind(), item, options))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        single => scalar_to_value(&field.kind(), single, options),
    }
}

fn scalar_to_value(kind: &Kind, value: &ReflectValue, options: &Options) -> Result<Value> {
    let shaped = match value {
        ReflectValue::Bool(b) => Value::Bool(*b),
        ReflectValue::I32(n) => Value::from(*n),
        ReflectValue::U32(n) => Value::from(*n),
        ReflectValue::I64(n) => match options.longs {
            LongRepr::BigInt => Value::from(*n),
            LongRepr::Number => Value::from(*n as f64),
            LongRepr::String => Value::String(n.to_string()),
        },
        ReflectValue::U64(n) => match options.longs {
            LongRepr::BigInt => Value::from(*n),
            LongRepr::Number => Value::from(*n as f64),
            LongRepr::String => Value::String(n.to_string()),
        },
        ReflectValue::F32(f) => float_to_value(f64::from(*f), options),
        ReflectValue::F64(f) => float_to_value(*f, options),
        ReflectValue::String(s) => Value::String(s.clone()),
        ReflectValue::Bytes(bytes) => match options.bytes {
            BytesRepr::String => Value::String(STANDARD.encode(bytes)),
            BytesRepr::Buffer | BytesRepr::Array => {
                Value::Array(bytes.iter().map(|b| Value::from(*b)).collect())
            }
        },
        ReflectValue::EnumNumber(number) => enum_to_value(kind, *number, options),
        ReflectValue::Message(message) => message_to_value(message, options)?,
        ReflectValue::List(items) => Value::Array(
            items
                .iter()
                .map(|item| scalar_to_value(kind, item, options))
                .collect::<Result<Vec<_>>>()?,
        ),
        ReflectValue::Map(entries) => {
            let mut object = Map::new();
            for (key, item) in entries {
                object.insert(map_key_string(key), scalar_to_value(kind, item, options)?);
            }
            Value::Object(object)
        }
    };
    Ok(shaped)
}

fn enum_to_value(kind: &Kind, number: i32, options: &Options) -> Value {
    if options.enums == EnumRepr::String {
        if let Kind::Enum(enum_desc) = kind {
            if let Some(value) = enum_desc.get_value(number) {
                return Value::String(value.name().to_string());
            }
        }
    }
    Value::from(number)
}

/// JSON numbers cannot hold NaN or the infinities
fn float_to_value(f: f64, options: &Options) -> Value {
    if f.is_finite() {
        return Value::from(f);
    }
    if !options.json {
        return Value::Null;
    }
    let text = if f.is_nan() {
        "NaN"
    } else if f.is_sign_positive() {
        "Infinity"
    } else {
        "-Infinity"
    };
    Value::String(text.to_string())
}

fn map_key_string(key: &MapKey) -> String {
    match key {
        MapKey::Bool(b) => b.to_string(),
        MapKey::I32(n) => n.to_string(),
        MapKey::I64(n) => n.to_string(),
        MapKey::U32(n) => n.to_string(),
        MapKey::U64(n) => n.to_string(),
        MapKey::String(s) => s.clone(),
    }
}
