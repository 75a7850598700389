//! Method options merging
//!
//! A method's options arrive as an ordered list of partial fragments, one per
//! declared option (standard or extension). Merging starts from fixed
//! defaults; `uninterpreted_option` entries accumulate across fragments and
//! every other key takes the value of its last occurrence.

use prost_reflect::{MethodDescriptor, Value};
use prost_types::UninterpretedOption;
use prost_types::method_options::IdempotencyLevel as ProtoIdempotencyLevel;
use std::collections::BTreeMap;

/// Idempotency level of a method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IdempotencyLevel {
    /// No guarantee (default)
    #[default]
    IdempotencyUnknown,
    /// Safe to call any number of times
    NoSideEffects,
    /// Repeated calls have the same effect as one
    Idempotent,
}

impl IdempotencyLevel {
    /// Name as declared in descriptor.proto
    pub fn as_str_name(&self) -> &'static str {
        match self {
            IdempotencyLevel::IdempotencyUnknown => "IDEMPOTENCY_UNKNOWN",
            IdempotencyLevel::NoSideEffects => "NO_SIDE_EFFECTS",
            IdempotencyLevel::Idempotent => "IDEMPOTENT",
        }
    }
}

impl From<i32> for IdempotencyLevel {
    /// Unknown numbers map to the default
    fn from(value: i32) -> Self {
        match ProtoIdempotencyLevel::try_from(value) {
            Ok(ProtoIdempotencyLevel::NoSideEffects) => IdempotencyLevel::NoSideEffects,
            Ok(ProtoIdempotencyLevel::Idempotent) => IdempotencyLevel::Idempotent,
            _ => IdempotencyLevel::IdempotencyUnknown,
        }
    }
}

/// One partial set of method options
///
/// `None` and empty collections mean the key is absent from this fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionsFragment {
    /// `deprecated`
    pub deprecated: Option<bool>,
    /// `idempotency_level`
    pub idempotency_level: Option<IdempotencyLevel>,
    /// `uninterpreted_option`
    pub uninterpreted_option: Option<Vec<UninterpretedOption>>,
    /// Extension options keyed as `(full.extension.name)`
    pub extensions: BTreeMap<String, Value>,
}

/// Canonical merged method options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodOptions {
    /// Whether the method is deprecated
    pub deprecated: bool,
    /// Declared idempotency level
    pub idempotency_level: IdempotencyLevel,
    /// Every uninterpreted option, in fragment order
    pub uninterpreted_option: Vec<UninterpretedOption>,
    /// Extension options keyed as `(full.extension.name)`
    pub extensions: BTreeMap<String, Value>,
}

/// Fold fragments, in order, into one options record
///
/// An empty input yields exactly [`MethodOptions::default`].
pub fn merge_method_options<'a>(
    fragments: impl IntoIterator<Item = &'a OptionsFragment>,
) -> MethodOptions {
    fragments
        .into_iter()
        .fold(MethodOptions::default(), |mut merged, fragment| {
            if let Some(deprecated) = fragment.deprecated {
                merged.deprecated = deprecated;
            }
            if let Some(level) = fragment.idempotency_level {
                merged.idempotency_level = level;
            }
            if let Some(options) = &fragment.uninterpreted_option {
                merged.uninterpreted_option.extend(options.iter().cloned());
            }
            for (key, value) in &fragment.extensions {
                merged.extensions.insert(key.clone(), value.clone());
            }
            merged
        })
}

/// Split a method's declared options into fragments
///
/// Standard options come first in field order, then one fragment per
/// extension option set on the method.
pub fn method_option_fragments(method: &MethodDescriptor) -> Vec<OptionsFragment> {
    let mut fragments = Vec::new();

    if let Some(options) = &method.method_descriptor_proto().options {
        if let Some(deprecated) = options.deprecated {
            fragments.push(OptionsFragment {
                deprecated: Some(deprecated),
                ..Default::default()
            });
        }
        if let Some(level) = options.idempotency_level {
            fragments.push(OptionsFragment {
                idempotency_level: Some(IdempotencyLevel::from(level)),
                ..Default::default()
            });
        }
        if !options.uninterpreted_option.is_empty() {
            fragments.push(OptionsFragment {
                uninterpreted_option: Some(options.uninterpreted_option.clone()),
                ..Default::default()
            });
        }
    }

    let options = method.options();
    for (extension, value) in options.extensions() {
        fragments.push(OptionsFragment {
            extensions: BTreeMap::from([(format!("({})", extension.full_name()), value.clone())]),
            ..Default::default()
        });
    }

    fragments
}
