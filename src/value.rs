//! Values carried by the any-value stream, and type identifiers.

use std::fmt;

/// A single entry of the any-value stream.
///
/// The set of variants is closed: only nulls, primitives, strings and byte
/// blobs are transportable. Type identifiers and Flattenable objects never
/// appear here directly; they travel as handles plus their own fields.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AnyValue {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Char(char),
    Str(String),
    Bytes(Vec<u8>),
}

impl AnyValue {
    /// Rust name of the carried type, used in mismatch reports.
    pub fn type_name(&self) -> &'static str {
        match self {
            AnyValue::Null => "null",
            AnyValue::Bool(_) => "bool",
            AnyValue::I8(_) => "i8",
            AnyValue::I16(_) => "i16",
            AnyValue::I32(_) => "i32",
            AnyValue::I64(_) => "i64",
            AnyValue::U8(_) => "u8",
            AnyValue::U16(_) => "u16",
            AnyValue::U32(_) => "u32",
            AnyValue::U64(_) => "u64",
            AnyValue::F32(_) => "f32",
            AnyValue::F64(_) => "f64",
            AnyValue::Char(_) => "char",
            AnyValue::Str(_) => "String",
            AnyValue::Bytes(_) => "Box<[u8]>",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AnyValue::Null)
    }
}

/// Conversion between a Rust primitive and its `AnyValue` variant.
///
/// Conversions are exact: an `i32` is only ever read back from `AnyValue::I32`.
pub trait AnyPrimitive: Sized {
    /// Name reported as the expected type on mismatch.
    const TYPE_NAME: &'static str;

    fn into_any(self) -> AnyValue;

    /// Returns the value back on mismatch so the caller can report its type.
    fn from_any(value: AnyValue) -> Result<Self, AnyValue>;
}

macro_rules! any_primitive {
    ($($ty:ty => $variant:ident, $name:literal;)*) => {
        $(
            impl AnyPrimitive for $ty {
                const TYPE_NAME: &'static str = $name;

                #[inline]
                fn into_any(self) -> AnyValue {
                    AnyValue::$variant(self)
                }

                #[inline]
                fn from_any(value: AnyValue) -> Result<Self, AnyValue> {
                    match value {
                        AnyValue::$variant(v) => Ok(v),
                        other => Err(other),
                    }
                }
            }

            impl From<$ty> for AnyValue {
                fn from(v: $ty) -> Self {
                    AnyValue::$variant(v)
                }
            }
        )*
    };
}

any_primitive! {
    bool => Bool, "bool";
    i8 => I8, "i8";
    i16 => I16, "i16";
    i32 => I32, "i32";
    i64 => I64, "i64";
    u8 => U8, "u8";
    u16 => U16, "u16";
    u32 => U32, "u32";
    u64 => U64, "u64";
    f32 => F32, "f32";
    f64 => F64, "f64";
    char => Char, "char";
    String => Str, "String";
}

impl AnyPrimitive for Box<[u8]> {
    const TYPE_NAME: &'static str = "Box<[u8]>";

    fn into_any(self) -> AnyValue {
        AnyValue::Bytes(self.into_vec())
    }

    fn from_any(value: AnyValue) -> Result<Self, AnyValue> {
        match value {
            AnyValue::Bytes(v) => Ok(v.into_boxed_slice()),
            other => Err(other),
        }
    }
}

impl From<&str> for AnyValue {
    fn from(v: &str) -> Self {
        AnyValue::Str(v.to_owned())
    }
}

/// A stable, globally resolvable type identifier.
///
/// Tags are `'static` strings chosen by the type author (for example
/// `"inventory::Order"`). They are resolved back to a type through a
/// [`TypeRegistry`](crate::registry::TypeRegistry), never by dynamic loading.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeTag(&'static str);

impl TypeTag {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeTag({})", self.0)
    }
}

/// Drops module paths from a `std::any::type_name` string, so that
/// `alloc::vec::Vec<alloc::string::String>` reads `Vec<String>`.
pub(crate) fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut path = String::new();
    for c in full.chars() {
        if c.is_alphanumeric() || c == '_' || c == ':' {
            path.push(c);
            continue;
        }
        push_last_segment(&mut out, &path);
        path.clear();
        out.push(c);
    }
    push_last_segment(&mut out, &path);
    out
}

fn push_last_segment(out: &mut String, path: &str) {
    if let Some(segment) = path.rsplit("::").next() {
        out.push_str(segment);
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}
