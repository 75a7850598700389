//! Error types for package loading
//!
//! Every failure is local to the operation that raised it: a rejected
//! serializer input never invalidates the rest of a package definition.

/// Error type for schema loading, definition building and message codecs
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// A type reference could not be resolved, or the schema is otherwise
    /// inconsistent (duplicate symbols, a package clashing with a type name)
    #[error("schema resolution error: {0}")]
    SchemaResolution(String),

    /// A serializer was given a value that does not fit its message type
    #[error("encoding error for {type_name}: {message}")]
    Encoding {
        /// Fully qualified name of the target message type
        type_name: String,
        /// What was wrong with the input
        message: String,
    },

    /// A deserializer was given bytes that are not a valid message
    #[error("decoding error for {type_name}: {source}")]
    Decoding {
        /// Fully qualified name of the message type being decoded
        type_name: String,
        /// Underlying wire decoding failure
        source: prost::DecodeError,
    },

    /// A node that is not a service, message or enum reached definition
    /// construction
    #[error("cannot create a definition for {name}: not a service, message or enum")]
    Classification {
        /// Qualified name of the offending node
        name: String,
    },

    /// Source `.proto` files could not be parsed
    #[error("parse error: {0}")]
    Parse(#[from] Box<protox::Error>),

    /// A serialized descriptor set could not be decoded
    #[error("descriptor set error: {0}")]
    DescriptorSet(String),

    /// Invalid loader options
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// Reading schema input failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The background loading task did not complete
    #[error("loader task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl LoaderError {
    pub(crate) fn encoding(type_name: &str, message: impl Into<String>) -> Self {
        LoaderError::Encoding {
            type_name: type_name.to_string(),
            message: message.into(),
        }
    }
}

impl From<protox::Error> for LoaderError {
    fn from(e: protox::Error) -> Self {
        LoaderError::Parse(Box::new(e))
    }
}

impl From<prost_reflect::DescriptorError> for LoaderError {
    fn from(e: prost_reflect::DescriptorError) -> Self {
        LoaderError::SchemaResolution(e.to_string())
    }
}

/// Result alias used throughout the crate
pub type Result<T, E = LoaderError> = std::result::Result<T, E>;
