//! JSON summary of a package definition

use serde_json::{Map, Value, json};
use synapse_proto_loader::prost_reflect::Value as OptionValue;
use synapse_proto_loader::{AnyDefinition, MethodDefinition, MethodOptions, PackageDefinition};

/// Summarize every entry, keyed by qualified name
pub fn package_summary(package: &PackageDefinition) -> Value {
    let mut entries = Map::new();
    for (name, definition) in package {
        entries.insert(name.clone(), definition_summary(definition));
    }
    Value::Object(entries)
}

fn definition_summary(definition: &AnyDefinition) -> Value {
    match definition {
        AnyDefinition::Service(service) => {
            let methods: Map<String, Value> = service
                .iter()
                .map(|(name, method)| (name.clone(), method_summary(method)))
                .collect();
            json!({ "kind": definition.kind(), "methods": methods })
        }
        AnyDefinition::Message(message) => json!({
            "kind": definition.kind(),
            "format": message.format.as_str(),
            "fields": message.descriptor.field.len(),
        }),
        AnyDefinition::Enum(enum_def) => json!({
            "kind": definition.kind(),
            "format": enum_def.format.as_str(),
            "values": enum_def.descriptor.value.len(),
        }),
    }
}

fn method_summary(method: &MethodDefinition) -> Value {
    json!({
        "path": method.path,
        "requestStream": method.request_stream,
        "responseStream": method.response_stream,
        "requestType": method.request_type.type_name,
        "responseType": method.response_type.type_name,
        "options": options_summary(&method.options),
    })
}

fn options_summary(options: &MethodOptions) -> Value {
    let mut object = Map::new();
    object.insert("deprecated".to_string(), Value::Bool(options.deprecated));
    object.insert(
        "idempotencyLevel".to_string(),
        Value::from(options.idempotency_level.as_str_name()),
    );
    if !options.uninterpreted_option.is_empty() {
        let names: Vec<Value> = options
            .uninterpreted_option
            .iter()
            .map(|option| {
                let parts: Vec<&str> = option.name.iter().map(|part| part.name_part.as_str()).collect();
                Value::String(parts.join("."))
            })
            .collect();
        object.insert("uninterpretedOption".to_string(), Value::Array(names));
    }
    for (name, value) in &options.extensions {
        object.insert(name.clone(), option_value(value));
    }
    Value::Object(object)
}

fn option_value(value: &OptionValue) -> Value {
    match value {
        OptionValue::Bool(b) => Value::Bool(*b),
        OptionValue::I32(n) => Value::from(*n),
        OptionValue::I64(n) => Value::from(*n),
        OptionValue::U32(n) => Value::from(*n),
        OptionValue::U64(n) => Value::from(*n),
        OptionValue::F32(f) => Value::from(f64::from(*f)),
        OptionValue::F64(f) => Value::from(*f),
        OptionValue::String(s) => Value::String(s.clone()),
        OptionValue::EnumNumber(n) => Value::from(*n),
        other => Value::String(other.to_string()),
    }
}
