//! Per-message serializer and deserializer pairs
//!
//! Both halves are plain values bound to a [`MessageDescriptor`]. They hold
//! no mutable state, so one codec can be cloned into many tasks and called
//! concurrently; every call builds its own intermediate `DynamicMessage`.

mod encode;
mod shape;

use crate::error::{LoaderError, Result};
use crate::options::Options;
use prost::Message;
use prost_reflect::{DynamicMessage, MessageDescriptor};
use serde_json::Value;
use std::sync::Arc;

/// Fully qualified name of the well-known Any type
pub(crate) const ANY_TYPE_NAME: &str = "google.protobuf.Any";

/// Marker key carrying an Any payload's type URL in object form
pub const ANY_TYPE_KEY: &str = "@type";

/// Default type URL prefix for Any payloads
pub(crate) const DEFAULT_TYPE_URL_PREFIX: &str = "type.googleapis.com/";

/// Encodes structured values as one message type
#[derive(Debug, Clone, PartialEq)]
pub struct Serializer {
    message: MessageDescriptor,
}

impl Serializer {
    /// Bind a serializer to a message type
    pub fn new(message: MessageDescriptor) -> Self {
        Serializer { message }
    }

    /// The message type this serializer encodes
    pub fn message_type(&self) -> &MessageDescriptor {
        &self.message
    }

    /// Encode a structured value
    ///
    /// The value must be an object keyed by field name. Arrays are rejected
    /// outright: a list of values is never a message.
    pub fn serialize(&self, value: &Value) -> Result<Vec<u8>> {
        if value.is_array() {
            return Err(LoaderError::encoding(
                self.message.full_name(),
                "expected a message object, got an array",
            ));
        }
        let message = encode::to_dynamic_message(&self.message, value)?;
        Ok(message.encode_to_vec())
    }
}

/// Decodes bytes of one message type into shaped values
#[derive(Debug, Clone, PartialEq)]
pub struct Deserializer {
    message: MessageDescriptor,
    options: Arc<Options>,
}

impl Deserializer {
    /// Bind a deserializer to a message type and shaping options
    pub fn new(message: MessageDescriptor, options: Arc<Options>) -> Self {
        Deserializer { message, options }
    }

    /// The message type this deserializer decodes
    pub fn message_type(&self) -> &MessageDescriptor {
        &self.message
    }

    /// Shaping options applied to decoded values
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Decode bytes and shape the result
    pub fn deserialize(&self, bytes: &[u8]) -> Result<Value> {
        let message = DynamicMessage::decode(self.message.clone(), bytes).map_err(|source| {
            LoaderError::Decoding {
                type_name: self.message.full_name().to_string(),
                source,
            }
        })?;
        shape::message_to_value(&message, &self.options)
    }
}
