//! Runtime values exchanged with the host program.

use std::{any::Any, fmt, sync::Arc};

use crate::metadata::token::Token;

/// Value flowing through an intercepted call: arguments, `this`, contextual
/// objects and the return slot.
///
/// Unlike an evaluation-stack representation, narrow integers keep their own
/// variant so the return slot is always read and written at the member's
/// declared width.
///
/// # Examples
///
/// ```rust
/// use dynpatch::runtime::HostValue;
///
/// let value = HostValue::from(42i32);
/// assert_eq!(value.as_i64(), Some(42));
/// assert_eq!(value.type_name(), "int32");
/// ```
#[derive(Clone, Debug)]
pub enum HostValue {
    /// No value (void return).
    Void,
    /// Null reference.
    Null,
    /// Boolean value.
    Bool(bool),
    /// UTF-16 character.
    Char(char),
    /// Signed 8-bit integer.
    I8(i8),
    /// Unsigned 8-bit integer.
    U8(u8),
    /// Signed 16-bit integer.
    I16(i16),
    /// Unsigned 16-bit integer.
    U16(u16),
    /// Signed 32-bit integer.
    I32(i32),
    /// Unsigned 32-bit integer.
    U32(u32),
    /// Signed 64-bit integer.
    I64(i64),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// 32-bit floating point.
    F32(f32),
    /// 64-bit floating point.
    F64(f64),
    /// Managed string.
    String(String),
    /// Opaque host object.
    Object(ObjectRef),
}

impl HostValue {
    /// Returns `true` for [`HostValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    /// Returns `true` for [`HostValue::Void`].
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, HostValue::Void)
    }

    /// Widens any integer variant to `i64`.
    ///
    /// `u64` values above `i64::MAX` yield `None`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            HostValue::I8(v) => Some(i64::from(v)),
            HostValue::U8(v) => Some(i64::from(v)),
            HostValue::I16(v) => Some(i64::from(v)),
            HostValue::U16(v) => Some(i64::from(v)),
            HostValue::I32(v) => Some(i64::from(v)),
            HostValue::U32(v) => Some(i64::from(v)),
            HostValue::I64(v) => Some(v),
            HostValue::U64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Widens float variants to `f64`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            HostValue::F32(v) => Some(f64::from(v)),
            HostValue::F64(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the boolean payload.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            HostValue::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the string payload.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the object payload.
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            HostValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Short name of the runtime representation, used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Void => "void",
            HostValue::Null => "null",
            HostValue::Bool(_) => "bool",
            HostValue::Char(_) => "char",
            HostValue::I8(_) => "int8",
            HostValue::U8(_) => "uint8",
            HostValue::I16(_) => "int16",
            HostValue::U16(_) => "uint16",
            HostValue::I32(_) => "int32",
            HostValue::U32(_) => "uint32",
            HostValue::I64(_) => "int64",
            HostValue::U64(_) => "uint64",
            HostValue::F32(_) => "float32",
            HostValue::F64(_) => "float64",
            HostValue::String(_) => "string",
            HostValue::Object(_) => "object",
        }
    }
}

impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostValue::Void, HostValue::Void) | (HostValue::Null, HostValue::Null) => true,
            (HostValue::Bool(a), HostValue::Bool(b)) => a == b,
            (HostValue::Char(a), HostValue::Char(b)) => a == b,
            (HostValue::I8(a), HostValue::I8(b)) => a == b,
            (HostValue::U8(a), HostValue::U8(b)) => a == b,
            (HostValue::I16(a), HostValue::I16(b)) => a == b,
            (HostValue::U16(a), HostValue::U16(b)) => a == b,
            (HostValue::I32(a), HostValue::I32(b)) => a == b,
            (HostValue::U32(a), HostValue::U32(b)) => a == b,
            (HostValue::I64(a), HostValue::I64(b)) => a == b,
            (HostValue::U64(a), HostValue::U64(b)) => a == b,
            (HostValue::F32(a), HostValue::F32(b)) => a.to_bits() == b.to_bits(),
            (HostValue::F64(a), HostValue::F64(b)) => a.to_bits() == b.to_bits(),
            (HostValue::String(a), HostValue::String(b)) => a == b,
            (HostValue::Object(a), HostValue::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Void => write!(f, "void"),
            HostValue::Null => write!(f, "null"),
            HostValue::Bool(v) => write!(f, "{v}"),
            HostValue::Char(v) => write!(f, "'{v}'"),
            HostValue::I8(v) => write!(f, "{v}"),
            HostValue::U8(v) => write!(f, "{v}"),
            HostValue::I16(v) => write!(f, "{v}"),
            HostValue::U16(v) => write!(f, "{v}"),
            HostValue::I32(v) => write!(f, "{v}"),
            HostValue::U32(v) => write!(f, "{v}"),
            HostValue::I64(v) => write!(f, "{v}L"),
            HostValue::U64(v) => write!(f, "{v}UL"),
            HostValue::F32(v) => write!(f, "{v}f"),
            HostValue::F64(v) => write!(f, "{v}"),
            HostValue::String(v) => write!(f, "\"{v}\""),
            HostValue::Object(o) => write!(f, "{o}"),
        }
    }
}

macro_rules! host_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for HostValue {
                fn from(value: $ty) -> Self {
                    HostValue::$variant(value)
                }
            }
        )*
    };
}

host_value_from! {
    bool => Bool,
    char => Char,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    ObjectRef => Object,
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::String(value.to_string())
    }
}

/// Shared reference to an opaque host object.
///
/// Equality is identity: two references are equal when they point at the same
/// allocation.
#[derive(Clone)]
pub struct ObjectRef {
    type_token: Token,
    inner: Arc<dyn Any + Send + Sync>,
}

impl ObjectRef {
    /// Wraps a host object registered under `type_token`.
    pub fn new<T: Any + Send + Sync>(type_token: Token, object: T) -> Self {
        Self {
            type_token,
            inner: Arc::new(object),
        }
    }

    /// Token of the object's type in the universe.
    #[must_use]
    pub fn type_token(&self) -> Token {
        self.type_token
    }

    /// Borrows the object as `T` if it has that concrete type.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("type_token", &self.type_token)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object({})", self.type_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_widening() {
        assert_eq!(HostValue::U8(200).as_i64(), Some(200));
        assert_eq!(HostValue::I16(-3).as_i64(), Some(-3));
        assert_eq!(HostValue::U64(u64::MAX).as_i64(), None);
        assert_eq!(HostValue::String("1".into()).as_i64(), None);
    }

    #[test]
    fn test_equality_is_variant_strict() {
        assert_eq!(HostValue::I32(1), HostValue::I32(1));
        assert_ne!(HostValue::I32(1), HostValue::I64(1));
        assert_eq!(HostValue::F32(f32::NAN), HostValue::F32(f32::NAN));
    }

    #[test]
    fn test_object_identity() {
        let a = ObjectRef::new(Token(0x02000001), 5u32);
        let b = a.clone();
        let c = ObjectRef::new(Token(0x02000001), 5u32);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.downcast_ref::<u32>(), Some(&5));
        assert!(a.downcast_ref::<i32>().is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(HostValue::from("hi").to_string(), "\"hi\"");
        assert_eq!(HostValue::I64(3).to_string(), "3L");
        assert_eq!(HostValue::Null.to_string(), "null");
    }
}
