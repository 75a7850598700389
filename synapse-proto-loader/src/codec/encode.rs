//! Structured value to `DynamicMessage` conversion
//!
//! Inputs are lenient where the representation is unambiguous: 64-bit
//! integers may be numbers or decimal strings, enums names or numbers,
//! bytes arrays of byte values or base64 strings. Anything that does not
//! fit the field's type is an encoding error naming the message type.

use super::{ANY_TYPE_KEY, ANY_TYPE_NAME, DEFAULT_TYPE_URL_PREFIX};
use crate::error::{LoaderError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use heck::ToLowerCamelCase;
use prost::Message;
use prost::bytes::Bytes;
use prost_reflect::{
    DynamicMessage, EnumDescriptor, FieldDescriptor, Kind, MapKey, MessageDescriptor,
    ReflectMessage, Value as ReflectValue,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Convert a structured value into a message of the given type
pub(crate) fn to_dynamic_message(desc: &MessageDescriptor, value: &Value) -> Result<DynamicMessage> {
    match value {
        Value::Object(object) => message_from_object(desc, object),
        other => Err(LoaderError::encoding(
            desc.full_name(),
            format!("expected a message object, got {}", describe(other)),
        )),
    }
}

fn message_from_object(desc: &MessageDescriptor, object: &Map<String, Value>) -> Result<DynamicMessage> {
    if desc.full_name() == ANY_TYPE_NAME {
        if let Some(Value::String(marker)) = object.get(ANY_TYPE_KEY) {
            return any_from_object(desc, marker, object);
        }
    }

    let mut message = DynamicMessage::new(desc.clone());
    for (key, value) in object {
        if value.is_null() {
            continue;
        }
        let Some(field) = find_field(desc, key) else {
            continue;
        };
        let converted = field_value(desc, &field, value)?;
        message
            .try_set_field(&field, converted)
            .map_err(|e| LoaderError::encoding(desc.full_name(), e.to_string()))?;
    }
    Ok(message)
}

/// Pack the remaining keys of an `@type`-tagged object into an Any
fn any_from_object(
    any: &MessageDescriptor,
    marker: &str,
    object: &Map<String, Value>,
) -> Result<DynamicMessage> {
    let marker = marker.trim_start_matches('.');
    let type_name = marker.rsplit('/').next().unwrap_or(marker);
    let payload_type = any.parent_pool().get_message_by_name(type_name).ok_or_else(|| {
        LoaderError::encoding(any.full_name(), format!("unknown type in {}: {}", ANY_TYPE_KEY, marker))
    })?;
    if payload_type.full_name() == ANY_TYPE_NAME {
        return Err(LoaderError::encoding(
            any.full_name(),
            format!("{} cannot name {} itself", ANY_TYPE_KEY, ANY_TYPE_NAME),
        ));
    }

    let payload = message_from_object(&payload_type, object)?;
    let type_url = if marker.contains('/') {
        marker.to_string()
    } else {
        format!("{}{}", DEFAULT_TYPE_URL_PREFIX, type_name)
    };

    let mut message = DynamicMessage::new(any.clone());
    set_by_name(&mut message, "type_url", ReflectValue::String(type_url))?;
    set_by_name(
        &mut message,
        "value",
        ReflectValue::Bytes(Bytes::from(payload.encode_to_vec())),
    )?;
    Ok(message)
}

fn set_by_name(message: &mut DynamicMessage, name: &str, value: ReflectValue) -> Result<()> {
    let desc = message.descriptor();
    let field = desc
        .get_field_by_name(name)
        .ok_or_else(|| LoaderError::encoding(desc.full_name(), format!("missing field {}", name)))?;
    message
        .try_set_field(&field, value)
        .map_err(|e| LoaderError::encoding(desc.full_name(), e.to_string()))
}

/// Match a key against the declared name, the JSON name, or the
/// lowerCamelCase alias
fn find_field(desc: &MessageDescriptor, key: &str) -> Option<FieldDescriptor> {
    desc.get_field_by_name(key)
        .or_else(|| desc.get_field_by_json_name(key))
        .or_else(|| desc.fields().find(|f| f.name().to_lower_camel_case() == key))
}

fn field_value(parent: &MessageDescriptor, field: &FieldDescriptor, value: &Value) -> Result<ReflectValue> {
    if field.is_map() {
        let Value::Object(entries) = value else {
            return Err(mismatch(parent, field, "an object", value));
        };
        let Kind::Message(entry) = field.kind() else {
            return Err(mismatch(parent, field, "a map entry type", value));
        };
        let key_field = entry.map_entry_key_field();
        let value_field = entry.map_entry_value_field();

        let mut map = HashMap::with_capacity(entries.len());
        for (key, item) in entries {
            if item.is_null() {
                continue;
            }
            let key = map_key(&key_field.kind(), key)
                .ok_or_else(|| mismatch(parent, field, "a valid map key", &Value::String(key.clone())))?;
            map.insert(key, single_value(parent, &value_field, item)?);
        }
        Ok(ReflectValue::Map(map))
    } else if field.is_list() {
        let Value::Array(items) = value else {
            return Err(mismatch(parent, field, "an array", value));
        };
        items
            .iter()
            .map(|item| single_value(parent, field, item))
            .collect::<Result<Vec<_>>>()
            .map(ReflectValue::List)
    } else {
        single_value(parent, field, value)
    }
}

fn single_value(parent: &MessageDescriptor, field: &FieldDescriptor, value: &Value) -> Result<ReflectValue> {
    let converted = match field.kind() {
        Kind::Double => as_f64(value).map(ReflectValue::F64),
        Kind::Float => as_f64(value).map(|f| ReflectValue::F32(f as f32)),
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => as_i64(value)
            .and_then(|n| i32::try_from(n).ok())
            .map(ReflectValue::I32),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => as_i64(value).map(ReflectValue::I64),
        Kind::Uint32 | Kind::Fixed32 => as_u64(value)
            .and_then(|n| u32::try_from(n).ok())
            .map(ReflectValue::U32),
        Kind::Uint64 | Kind::Fixed64 => as_u64(value).map(ReflectValue::U64),
        Kind::Bool => value.as_bool().map(ReflectValue::Bool),
        Kind::String => value.as_str().map(|s| ReflectValue::String(s.to_string())),
        Kind::Bytes => as_bytes(value).map(|b| ReflectValue::Bytes(Bytes::from(b))),
        Kind::Enum(enum_desc) => {
            return enum_number(&enum_desc, value)
                .map(ReflectValue::EnumNumber)
                .ok_or_else(|| mismatch(parent, field, &format!("a value of {}", enum_desc.full_name()), value));
        }
        Kind::Message(message) => {
            return to_dynamic_message(&message, value).map(ReflectValue::Message);
        }
    };

    converted.ok_or_else(|| mismatch(parent, field, kind_label(&field.kind()), value))
}

fn mismatch(parent: &MessageDescriptor, field: &FieldDescriptor, expected: &str, got: &Value) -> LoaderError {
    LoaderError::encoding(
        parent.full_name(),
        format!(
            "field {}: expected {}, got {} {}",
            field.name(),
            expected,
            describe(got),
            preview(got)
        ),
    )
}

/// Compact rendering of an input value for error messages
fn preview(value: &Value) -> String {
    const LIMIT: usize = 64;
    let text = value.to_string();
    match text.char_indices().nth(LIMIT) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match s.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            other => other.parse().ok(),
        },
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f < u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_bytes(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
            .collect(),
        Value::String(s) => STANDARD.decode(s).ok(),
        _ => None,
    }
}

fn enum_number(enum_desc: &EnumDescriptor, value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(name) => enum_desc.get_value_by_name(name).map(|v| v.number()),
        _ => None,
    }
}

fn map_key(kind: &Kind, key: &str) -> Option<MapKey> {
    match kind {
        Kind::Bool => key.parse().ok().map(MapKey::Bool),
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => key.parse().ok().map(MapKey::I32),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => key.parse().ok().map(MapKey::I64),
        Kind::Uint32 | Kind::Fixed32 => key.parse().ok().map(MapKey::U32),
        Kind::Uint64 | Kind::Fixed64 => key.parse().ok().map(MapKey::U64),
        Kind::String => Some(MapKey::String(key.to_string())),
        _ => None,
    }
}

fn kind_label(kind: &Kind) -> &'static str {
    match kind {
        Kind::Double | Kind::Float => "a number",
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => "a 32-bit integer",
        Kind::Uint32 | Kind::Fixed32 => "an unsigned 32-bit integer",
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => "a 64-bit integer",
        Kind::Uint64 | Kind::Fixed64 => "an unsigned 64-bit integer",
        Kind::Bool => "a boolean",
        Kind::String => "a string",
        Kind::Bytes => "a byte array or base64 string",
        Kind::Enum(_) => "an enum value",
        Kind::Message(_) => "a message object",
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
