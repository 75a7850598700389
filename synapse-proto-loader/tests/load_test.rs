//! Integration tests: loading `.proto` sources end to end

use pretty_assertions::assert_eq;
use prost::Message;
use prost_types::FileDescriptorProto;
use serde_json::json;
use std::path::PathBuf;
use synapse_proto_loader::prost_reflect::Value;
use synapse_proto_loader::{
    AnyDefinition, DescriptorFormat, EnumRepr, IdempotencyLevel, LoaderError, LongRepr, Options,
    load, load_file_descriptor_set_from_buffer, load_sync,
};
use tempfile::TempDir;

const GEO_PROTO: &str = r#"
syntax = "proto3";

package maps.geo;

import "google/protobuf/any.proto";
import "google/protobuf/descriptor.proto";

extend google.protobuf.MethodOptions {
  string audit_tag = 50001;
}

enum Unit {
  UNIT_UNSPECIFIED = 0;
  METERS = 1;
  FEET = 2;
}

message Point {
  int32 x = 1;
  int32 y = 2;
}

message Route {
  string route_name = 1;
  repeated Point points = 2;
  map<string, int64> weights = 3;
  Unit unit = 4;
  oneof destination {
    string city = 5;
    Point coordinates = 6;
  }

  message Leg {
    Point start = 1;
    Point end = 2;
  }

  repeated Leg legs = 7;
  google.protobuf.Any extra = 8;
}

service Locator {
  rpc Locate(Point) returns (Point);

  rpc RecordRoute(stream Point) returns (Route) {
    option deprecated = true;
    option idempotency_level = IDEMPOTENT;
    option (audit_tag) = "routes";
  }

  rpc ListFeatures(Route) returns (stream Point);

  rpc RouteChat(stream Route) returns (stream Route);
}
"#;

const ADMIN_PROTO: &str = r#"
syntax = "proto3";

package maps.admin;

import "geo.proto";

service Health {
  rpc Ping(maps.geo.Point) returns (maps.geo.Point);
}
"#;

/// Write the fixture protos into a fresh directory
fn fixtures() -> (TempDir, PathBuf, PathBuf) {
    let dir = TempDir::new().unwrap();
    let geo = dir.path().join("geo.proto");
    let admin = dir.path().join("admin.proto");
    std::fs::write(&geo, GEO_PROTO).unwrap();
    std::fs::write(&admin, ADMIN_PROTO).unwrap();
    (dir, geo, admin)
}

fn options(dir: &TempDir) -> Options {
    Options::default().include_dir(dir.path())
}

#[test]
fn test_services_and_methods_are_counted_exactly() {
    let (dir, geo, admin) = fixtures();
    let package = load_sync(&[geo, admin], &options(&dir)).unwrap();

    let services: Vec<_> = package.services().map(|(name, _)| name).collect();
    assert_eq!(services, vec!["maps.admin.Health", "maps.geo.Locator"]);

    let locator = package.service("maps.geo.Locator").unwrap();
    let methods: Vec<_> = locator.keys().map(String::as_str).collect();
    assert_eq!(methods, vec!["ListFeatures", "Locate", "RecordRoute", "RouteChat"]);
    assert_eq!(package.service("maps.admin.Health").unwrap().len(), 1);
}

#[test]
fn test_paths_and_streaming_flags() {
    let (dir, geo, _) = fixtures();
    let package = load_sync(&[geo], &options(&dir)).unwrap();
    let locator = package.service("maps.geo.Locator").unwrap();

    let expected = [
        ("Locate", false, false),
        ("RecordRoute", true, false),
        ("ListFeatures", false, true),
        ("RouteChat", true, true),
    ];
    for (name, request_stream, response_stream) in expected {
        let method = &locator[name];
        assert_eq!(method.path, format!("/maps.geo.Locator/{}", name));
        assert_eq!(method.request_stream, request_stream, "{}", name);
        assert_eq!(method.response_stream, response_stream, "{}", name);
    }
    assert_eq!(locator["RecordRoute"].original_name, "recordRoute");
}

#[test]
fn test_types_are_emitted_under_qualified_names() {
    let (dir, geo, _) = fixtures();
    let package = load_sync(&[geo], &options(&dir)).unwrap();

    for name in ["maps.geo.Point", "maps.geo.Route", "maps.geo.Route.Leg", "google.protobuf.Any"] {
        let message = package.message_type(name).unwrap_or_else(|| panic!("missing {}", name));
        assert_eq!(message.format, DescriptorFormat::DescriptorProto);
        assert_eq!(message.type_name, name);
    }
    let unit = package.enum_type("maps.geo.Unit").unwrap();
    assert_eq!(unit.format, DescriptorFormat::EnumDescriptorProto);
    assert_eq!(unit.descriptor.value.len(), 3);

    assert!(package.get("maps.geo.Route.WeightsEntry").is_none());
    assert!(package.get("maps.geo.audit_tag").is_none());
    assert!(package.get("maps.geo").is_none());
}

#[test]
fn test_method_options_are_merged() {
    let (dir, geo, _) = fixtures();
    let package = load_sync(&[geo], &options(&dir)).unwrap();
    let locator = package.service("maps.geo.Locator").unwrap();

    let record = &locator["RecordRoute"].options;
    assert!(record.deprecated);
    assert_eq!(record.idempotency_level, IdempotencyLevel::Idempotent);
    assert_eq!(
        record.extensions.get("(maps.geo.audit_tag)"),
        Some(&Value::String("routes".to_string()))
    );

    let locate = &locator["Locate"].options;
    assert!(!locate.deprecated);
    assert_eq!(locate.idempotency_level, IdempotencyLevel::IdempotencyUnknown);
    assert!(locate.uninterpreted_option.is_empty());
    assert!(locate.extensions.is_empty());
}

#[test]
fn test_route_round_trip_with_shaping() {
    let (dir, geo, _) = fixtures();
    let shaping = Options {
        longs: LongRepr::String,
        enums: EnumRepr::String,
        oneofs: true,
        json: true,
        ..options(&dir)
    };
    let package = load_sync(&[geo], &shaping).unwrap();
    let chat = &package.service("maps.geo.Locator").unwrap()["RouteChat"];

    let route = json!({
        "routeName": "coastal",
        "points": [{ "x": 1, "y": 2 }, { "x": -3 }],
        "weights": { "north": "9007199254740993" },
        "unit": "FEET",
        "city": "Lisbon",
        "destination": "city",
        "legs": [{ "start": { "x": 1 }, "end": { "y": 1 } }],
        "extra": { "@type": "type.googleapis.com/maps.geo.Point", "x": 4, "y": 5 }
    });

    let bytes = chat.request_serialize.serialize(&route).unwrap();
    let decoded = chat.request_deserialize.deserialize(&bytes).unwrap();
    assert_eq!(decoded, route);
}

#[test]
fn test_serializer_rejects_array_input() {
    let (dir, geo, _) = fixtures();
    let package = load_sync(&[geo], &options(&dir)).unwrap();
    let locate = &package.service("maps.geo.Locator").unwrap()["Locate"];

    let err = locate.request_serialize.serialize(&json!([1, 2])).unwrap_err();
    match err {
        LoaderError::Encoding { type_name, .. } => assert_eq!(type_name, "maps.geo.Point"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_file_descriptors_are_shared() {
    let (dir, geo, admin) = fixtures();
    let package = load_sync(&[geo, admin], &options(&dir)).unwrap();

    let blobs: Vec<_> = package
        .iter()
        .filter_map(|(_, def)| match def {
            AnyDefinition::Message(message) => Some(message.file_descriptor_protos.clone()),
            AnyDefinition::Enum(enum_def) => Some(enum_def.file_descriptor_protos.clone()),
            AnyDefinition::Service(_) => None,
        })
        .collect();

    assert!(blobs.len() > 1);
    for blob in &blobs {
        assert!(std::sync::Arc::ptr_eq(blob, &blobs[0]));
    }

    let names: Vec<_> = blobs[0]
        .iter()
        .map(|bytes| FileDescriptorProto::decode(&bytes[..]).unwrap().name.unwrap_or_default())
        .collect();
    assert!(names.contains(&"geo.proto".to_string()));
    assert!(names.contains(&"admin.proto".to_string()));
    assert!(names.contains(&"google/protobuf/any.proto".to_string()));
}

#[test]
fn test_descriptor_round_trip_rebuilds_the_same_table() {
    let (dir, geo, _) = fixtures();
    let from_source = load_sync(&[geo], &options(&dir)).unwrap();

    let blobs = from_source.message_type("maps.geo.Point").unwrap().file_descriptor_protos.clone();

    // FileDescriptorSet is `repeated FileDescriptorProto file = 1`; splice
    // the raw blobs so extension values survive untouched
    let mut encoded = Vec::new();
    for bytes in blobs.iter() {
        prost::encoding::encode_key(1, prost::encoding::WireType::LengthDelimited, &mut encoded);
        prost::encoding::encode_varint(bytes.len() as u64, &mut encoded);
        encoded.extend_from_slice(bytes);
    }

    let from_descriptors = load_file_descriptor_set_from_buffer(&encoded, &Options::default()).unwrap();

    let source_names: Vec<_> = from_source.iter().map(|(name, _)| name).collect();
    let rebuilt_names: Vec<_> = from_descriptors.iter().map(|(name, _)| name).collect();
    assert_eq!(source_names, rebuilt_names);

    let record = &from_descriptors.service("maps.geo.Locator").unwrap()["RecordRoute"];
    assert_eq!(record.path, "/maps.geo.Locator/RecordRoute");
    assert_eq!(
        record.options.extensions.get("(maps.geo.audit_tag)"),
        Some(&Value::String("routes".to_string()))
    );
}

#[test]
fn test_missing_file_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nowhere.proto");
    let err = load_sync(&[missing], &options(&dir)).unwrap_err();
    assert!(matches!(err, LoaderError::Parse(_)));
}

#[test]
fn test_include_dirs_default_to_file_directory() {
    let (_dir, geo, admin) = fixtures();
    let package = load_sync(&[geo, admin], &Options::default()).unwrap();
    assert!(package.service("maps.admin.Health").is_some());
}

#[tokio::test]
async fn test_async_load_matches_sync_load() {
    let (dir, geo, admin) = fixtures();
    let options = options(&dir);

    let sync_package = load_sync(&[geo.clone(), admin.clone()], &options).unwrap();
    let async_package = load::<_, PathBuf>(vec![geo, admin], options).await.unwrap();

    let sync_names: Vec<_> = sync_package.iter().map(|(name, _)| name).collect();
    let async_names: Vec<_> = async_package.iter().map(|(name, _)| name).collect();
    assert_eq!(sync_names, async_names);
}
