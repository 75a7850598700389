//! Loader options
//!
//! A single [`Options`] record is accepted by every loading entry point. The
//! shaping fields govern how deserializers render decoded messages; the
//! include directories are only consumed while parsing `.proto` sources.
//!
//! Options can also be parsed from a comma-separated parameter string, the
//! same convention protoc plugins use for their parameters:
//!
//! ```text
//! keep_case,longs=String,enums=String,include=proto
//! ```

use crate::error::{LoaderError, Result};
use std::path::PathBuf;
use std::str::FromStr;

/// Representation of 64-bit integer fields in decoded values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LongRepr {
    /// Exact JSON integer (default)
    #[default]
    BigInt,
    /// Floating point number, lossy above 2^53
    Number,
    /// Decimal string
    String,
}

/// Representation of enum fields in decoded values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumRepr {
    /// Numeric value (default)
    #[default]
    Number,
    /// Value name, falling back to the number for unknown values
    String,
}

/// Representation of bytes fields in decoded values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BytesRepr {
    /// Binary buffer, rendered as an array of byte values (default)
    #[default]
    Buffer,
    /// Array of byte values
    Array,
    /// Base64 string
    String,
}

/// Options shared by every loading entry point
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    /// Keep field names as declared instead of converting to lowerCamelCase
    pub keep_case: bool,

    /// 64-bit integer representation
    pub longs: LongRepr,

    /// Enum representation
    pub enums: EnumRepr,

    /// Bytes representation
    pub bytes: BytesRepr,

    /// Populate absent fields with their zero values
    pub defaults: bool,

    /// Populate absent repeated fields with empty arrays
    pub arrays: bool,

    /// Populate absent map fields with empty objects
    pub objects: bool,

    /// Add a virtual property per oneof naming the member that is set
    pub oneofs: bool,

    /// Render non-finite floats as strings and expand `google.protobuf.Any`
    pub json: bool,

    /// Search paths for `.proto` imports
    pub include_dirs: Vec<PathBuf>,
}

impl Options {
    /// Add an import search path
    pub fn include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dirs.push(dir.into());
        self
    }
}

impl FromStr for LongRepr {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "BigInt" | "Long" => Ok(LongRepr::BigInt),
            "Number" => Ok(LongRepr::Number),
            "String" => Ok(LongRepr::String),
            other => Err(LoaderError::InvalidOption(format!("longs={}", other))),
        }
    }
}

impl FromStr for EnumRepr {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Number" => Ok(EnumRepr::Number),
            "String" => Ok(EnumRepr::String),
            other => Err(LoaderError::InvalidOption(format!("enums={}", other))),
        }
    }
}

impl FromStr for BytesRepr {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Buffer" => Ok(BytesRepr::Buffer),
            "Array" => Ok(BytesRepr::Array),
            "String" => Ok(BytesRepr::String),
            other => Err(LoaderError::InvalidOption(format!("bytes={}", other))),
        }
    }
}

impl FromStr for Options {
    type Err = LoaderError;

    fn from_str(param: &str) -> Result<Self> {
        let mut options = Options::default();

        for part in param.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = match part.split_once('=') {
                Some((k, v)) => (k.trim(), Some(v.trim())),
                None => (part, None),
            };

            match key {
                "keep_case" | "keepCase" => options.keep_case = parse_flag(key, value)?,
                "defaults" => options.defaults = parse_flag(key, value)?,
                "arrays" => options.arrays = parse_flag(key, value)?,
                "objects" => options.objects = parse_flag(key, value)?,
                "oneofs" => options.oneofs = parse_flag(key, value)?,
                "json" => options.json = parse_flag(key, value)?,
                "longs" => options.longs = required(key, value)?.parse()?,
                "enums" => options.enums = required(key, value)?.parse()?,
                "bytes" => options.bytes = required(key, value)?.parse()?,
                "include" => options.include_dirs.push(required(key, value)?.into()),
                other => {
                    return Err(LoaderError::InvalidOption(format!("unknown key: {}", other)));
                }
            }
        }

        Ok(options)
    }
}

/// A bare key means `true`
fn parse_flag(key: &str, value: Option<&str>) -> Result<bool> {
    match value {
        None | Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(other) => Err(LoaderError::InvalidOption(format!("{}={}", key, other))),
    }
}

fn required<'a>(key: &str, value: Option<&'a str>) -> Result<&'a str> {
    value.ok_or_else(|| LoaderError::InvalidOption(format!("{} requires a value", key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_param() {
        let options: Options = "".parse().unwrap();
        assert_eq!(options, Options::default());
    }

    #[test]
    fn test_parse_full_param() {
        let options: Options =
            "keep_case,longs=String,enums=String,bytes=Array,defaults=true,oneofs,include=proto"
                .parse()
                .unwrap();
        assert!(options.keep_case);
        assert_eq!(options.longs, LongRepr::String);
        assert_eq!(options.enums, EnumRepr::String);
        assert_eq!(options.bytes, BytesRepr::Array);
        assert!(options.defaults);
        assert!(options.oneofs);
        assert!(!options.json);
        assert_eq!(options.include_dirs, vec![PathBuf::from("proto")]);
    }

    #[test]
    fn test_parse_rejects_unknown_key() {
        let err = "keep_case,colour=blue".parse::<Options>().unwrap_err();
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn test_parse_rejects_bad_repr() {
        assert!("longs=Float".parse::<Options>().is_err());
        assert!("longs".parse::<Options>().is_err());
        assert!("json=maybe".parse::<Options>().is_err());
    }
}
