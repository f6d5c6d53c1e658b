//! Value kinds of member parameters and return slots.
//!
//! [`ValueKind`] is the closed set of representations the patcher knows how to
//! read, parse and write. Every primitive kind carries its own literal parsing
//! rule; anything the universe does not recognise as a primitive is a
//! [`ValueKind::Reference`] to the registered type.

use std::fmt;

use crate::{metadata::token::Token, runtime::HostValue, Error, Result};

/// Short parameter-type aliases accepted in target descriptors.
///
/// Matching is case-insensitive; the right-hand side is the full name the
/// primitive is registered under in every [`crate::metadata::TypeUniverse`].
pub const PRIMITIVE_ALIASES: [(&str, &str); 13] = [
    ("int", "System.Int32"),
    ("float", "System.Single"),
    ("double", "System.Double"),
    ("string", "System.String"),
    ("bool", "System.Boolean"),
    ("byte", "System.Byte"),
    ("sbyte", "System.SByte"),
    ("short", "System.Int16"),
    ("ushort", "System.UInt16"),
    ("uint", "System.UInt32"),
    ("long", "System.Int64"),
    ("ulong", "System.UInt64"),
    ("char", "System.Char"),
];

/// Maps a parameter-type alias such as `int` to its full type name.
///
/// Returns `None` for names that are not in [`PRIMITIVE_ALIASES`]; those are
/// looked up verbatim by the resolver.
#[must_use]
pub fn resolve_alias(name: &str) -> Option<&'static str> {
    PRIMITIVE_ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
        .map(|(_, full)| *full)
}

/// Representation of a parameter or return value.
///
/// The integer variants map one-to-one onto the storage width of the host's
/// return slot, so a mutation always reads and writes exactly the width the
/// member returns.
///
/// | Kind | Width | Full name |
/// |------|-------|-----------|
/// | [`Bool`](Self::Bool) | 8 | `System.Boolean` |
/// | [`I8`](Self::I8) / [`U8`](Self::U8) | 8 | `System.SByte` / `System.Byte` |
/// | [`Char`](Self::Char) | 16 | `System.Char` |
/// | [`I16`](Self::I16) / [`U16`](Self::U16) | 16 | `System.Int16` / `System.UInt16` |
/// | [`I32`](Self::I32) / [`U32`](Self::U32) | 32 | `System.Int32` / `System.UInt32` |
/// | [`I64`](Self::I64) / [`U64`](Self::U64) | 64 | `System.Int64` / `System.UInt64` |
/// | [`F32`](Self::F32) / [`F64`](Self::F64) | 32 / 64 | `System.Single` / `System.Double` |
/// | [`String`](Self::String) | reference | `System.String` |
/// | [`Reference`](Self::Reference) | reference | any other registered type |
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// No value
    Void,
    /// `System.Boolean`
    Bool,
    /// `System.Char`, a UTF-16 code unit
    Char,
    /// `System.SByte`
    I8,
    /// `System.Byte`
    U8,
    /// `System.Int16`
    I16,
    /// `System.UInt16`
    U16,
    /// `System.Int32`
    I32,
    /// `System.UInt32`
    U32,
    /// `System.Int64`
    I64,
    /// `System.UInt64`
    U64,
    /// `System.Single`
    F32,
    /// `System.Double`
    F64,
    /// `System.String`
    String,
    /// Any other type, by its universe token
    Reference(Token),
}

impl ValueKind {
    /// Maps a primitive full name (e.g. `System.Int32`) to its kind.
    ///
    /// `System.Object` and every non-primitive name yield `None`; callers treat
    /// those as references.
    #[must_use]
    pub fn from_primitive_name(full_name: &str) -> Option<Self> {
        Some(match full_name {
            "System.Void" => ValueKind::Void,
            "System.Boolean" => ValueKind::Bool,
            "System.Char" => ValueKind::Char,
            "System.SByte" => ValueKind::I8,
            "System.Byte" => ValueKind::U8,
            "System.Int16" => ValueKind::I16,
            "System.UInt16" => ValueKind::U16,
            "System.Int32" => ValueKind::I32,
            "System.UInt32" => ValueKind::U32,
            "System.Int64" => ValueKind::I64,
            "System.UInt64" => ValueKind::U64,
            "System.Single" => ValueKind::F32,
            "System.Double" => ValueKind::F64,
            "System.String" => ValueKind::String,
            _ => return None,
        })
    }

    /// Full name of the kind, `None` for references.
    #[must_use]
    pub fn full_name(&self) -> Option<&'static str> {
        Some(match self {
            ValueKind::Void => "System.Void",
            ValueKind::Bool => "System.Boolean",
            ValueKind::Char => "System.Char",
            ValueKind::I8 => "System.SByte",
            ValueKind::U8 => "System.Byte",
            ValueKind::I16 => "System.Int16",
            ValueKind::U16 => "System.UInt16",
            ValueKind::I32 => "System.Int32",
            ValueKind::U32 => "System.UInt32",
            ValueKind::I64 => "System.Int64",
            ValueKind::U64 => "System.UInt64",
            ValueKind::F32 => "System.Single",
            ValueKind::F64 => "System.Double",
            ValueKind::String => "System.String",
            ValueKind::Reference(_) => return None,
        })
    }

    /// Returns `true` for [`ValueKind::Void`].
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, ValueKind::Void)
    }

    /// Returns `true` if `value` has the runtime representation of this kind.
    ///
    /// `Null` is accepted for strings and references.
    #[must_use]
    pub fn accepts(&self, value: &HostValue) -> bool {
        matches!(
            (self, value),
            (ValueKind::Void, HostValue::Void)
                | (ValueKind::Bool, HostValue::Bool(_))
                | (ValueKind::Char, HostValue::Char(_))
                | (ValueKind::I8, HostValue::I8(_))
                | (ValueKind::U8, HostValue::U8(_))
                | (ValueKind::I16, HostValue::I16(_))
                | (ValueKind::U16, HostValue::U16(_))
                | (ValueKind::I32, HostValue::I32(_))
                | (ValueKind::U32, HostValue::U32(_))
                | (ValueKind::I64, HostValue::I64(_))
                | (ValueKind::U64, HostValue::U64(_))
                | (ValueKind::F32, HostValue::F32(_))
                | (ValueKind::F64, HostValue::F64(_))
                | (ValueKind::String, HostValue::String(_) | HostValue::Null)
                | (ValueKind::Reference(_), _)
        )
    }

    /// Parses a literal into a value of this kind.
    ///
    /// Numeric and boolean literals are trimmed first and accept a leading
    /// sign; booleans compare case-insensitively; a `char` literal must be
    /// exactly one UTF-16 code unit. Strings are taken verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnparsableLiteral`] if the literal is not a valid value
    /// of this kind, or if the kind has no intrinsic parse rule (void and
    /// references).
    pub fn parse_literal(&self, literal: &str) -> Result<HostValue> {
        let trimmed = literal.trim();
        let parsed = match self {
            ValueKind::Bool => parse_bool(trimmed).map(HostValue::Bool),
            ValueKind::Char => parse_char(literal).map(HostValue::Char),
            ValueKind::I8 => trimmed.parse().map(HostValue::I8).map_err(|e| e.to_string()),
            ValueKind::U8 => trimmed.parse().map(HostValue::U8).map_err(|e| e.to_string()),
            ValueKind::I16 => trimmed.parse().map(HostValue::I16).map_err(|e| e.to_string()),
            ValueKind::U16 => trimmed.parse().map(HostValue::U16).map_err(|e| e.to_string()),
            ValueKind::I32 => trimmed.parse().map(HostValue::I32).map_err(|e| e.to_string()),
            ValueKind::U32 => trimmed.parse().map(HostValue::U32).map_err(|e| e.to_string()),
            ValueKind::I64 => trimmed.parse().map(HostValue::I64).map_err(|e| e.to_string()),
            ValueKind::U64 => trimmed.parse().map(HostValue::U64).map_err(|e| e.to_string()),
            ValueKind::F32 => trimmed.parse().map(HostValue::F32).map_err(|e| e.to_string()),
            ValueKind::F64 => trimmed.parse().map(HostValue::F64).map_err(|e| e.to_string()),
            ValueKind::String => Ok(HostValue::String(literal.to_string())),
            ValueKind::Void | ValueKind::Reference(_) => {
                Err("type has no intrinsic parse rule".to_string())
            }
        };

        parsed.map_err(|cause| Error::UnparsableLiteral {
            literal: literal.to_string(),
            kind: self.to_string(),
            cause,
        })
    }
}

fn parse_bool(text: &str) -> std::result::Result<bool, String> {
    if text.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if text.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err("expected 'true' or 'false'".to_string())
    }
}

fn parse_char(text: &str) -> std::result::Result<char, String> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.len_utf16() == 1 => Ok(c),
        (Some(_), None) => Err("character is outside the basic multilingual plane".to_string()),
        _ => Err("expected exactly one character".to_string()),
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Reference(token) => write!(f, "reference({token})"),
            other => f.write_str(other.full_name().unwrap_or("unknown")),
        }
    }
}
