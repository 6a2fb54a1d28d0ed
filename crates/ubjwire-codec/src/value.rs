//! The value model: one closed enum covering every wire type.
//!
//! Containers keep insertion order. Object keys are not hashed and may repeat;
//! an entry is identified by its position.

use std::fmt;

use crate::error::Result;

/// Initial element capacity of a container once it receives its first element.
pub(crate) const INITIAL_CAPACITY: usize = 4;

/// Append `item`, doubling capacity from [`INITIAL_CAPACITY`] when full.
///
/// Reservation is fallible so allocation failure leaves `items` untouched.
pub(crate) fn push_grow<T>(items: &mut Vec<T>, item: T) -> Result<()> {
    if items.len() == items.capacity() {
        let additional = if items.capacity() == 0 {
            INITIAL_CAPACITY
        } else {
            items.capacity()
        };
        items.try_reserve_exact(additional)?;
    }
    items.push(item);
    Ok(())
}

/// Tag of a [`Value`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Null,
    NoOp,
    True,
    False,
    Int8,
    UInt8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Char,
    String,
    Array,
    Object,
}

impl ValueType {
    /// Wire marker byte that introduces a value of this type.
    pub fn marker(self) -> u8 {
        match self {
            ValueType::Null => b'Z',
            ValueType::NoOp => b'N',
            ValueType::True => b'T',
            ValueType::False => b'F',
            ValueType::Int8 => b'i',
            ValueType::UInt8 => b'U',
            ValueType::Int16 => b'I',
            ValueType::Int32 => b'l',
            ValueType::Int64 => b'L',
            ValueType::Float32 => b'd',
            ValueType::Float64 => b'D',
            ValueType::Char => b'C',
            ValueType::String => b'S',
            ValueType::Array => b'[',
            ValueType::Object => b'{',
        }
    }

    /// Map a marker byte back to its type. Closing markers return `None`.
    pub fn from_marker(marker: u8) -> Option<Self> {
        let ty = match marker {
            b'Z' => ValueType::Null,
            b'N' => ValueType::NoOp,
            b'T' => ValueType::True,
            b'F' => ValueType::False,
            b'i' => ValueType::Int8,
            b'U' => ValueType::UInt8,
            b'I' => ValueType::Int16,
            b'l' => ValueType::Int32,
            b'L' => ValueType::Int64,
            b'd' => ValueType::Float32,
            b'D' => ValueType::Float64,
            b'C' => ValueType::Char,
            b'S' => ValueType::String,
            b'[' => ValueType::Array,
            b'{' => ValueType::Object,
            _ => return None,
        };
        Some(ty)
    }

    /// Number of payload bytes following the marker, for fixed-width types.
    ///
    /// Returns `None` for strings and containers.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            ValueType::Null | ValueType::NoOp | ValueType::True | ValueType::False => Some(0),
            ValueType::Int8 | ValueType::UInt8 | ValueType::Char => Some(1),
            ValueType::Int16 => Some(2),
            ValueType::Int32 | ValueType::Float32 => Some(4),
            ValueType::Int64 | ValueType::Float64 => Some(8),
            ValueType::String | ValueType::Array | ValueType::Object => None,
        }
    }

    pub fn is_collection(self) -> bool {
        matches!(self, ValueType::Array | ValueType::Object)
    }

    pub fn is_bool(self) -> bool {
        matches!(self, ValueType::True | ValueType::False)
    }

    /// Whether a stored value of type `self` satisfies a request for `expected`.
    ///
    /// Exact match, except that either boolean tag answers a boolean request.
    pub fn satisfies(self, expected: ValueType) -> bool {
        self == expected || (self.is_bool() && expected.is_bool())
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Null => "null",
            ValueType::NoOp => "no-op",
            ValueType::True => "true",
            ValueType::False => "false",
            ValueType::Int8 => "int8",
            ValueType::UInt8 => "uint8",
            ValueType::Int16 => "int16",
            ValueType::Int32 => "int32",
            ValueType::Int64 => "int64",
            ValueType::Float32 => "float32",
            ValueType::Float64 => "float64",
            ValueType::Char => "char",
            ValueType::String => "string",
            ValueType::Array => "array",
            ValueType::Object => "object",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One node of a tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    NoOp,
    True,
    False,
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    /// A single byte; no character encoding is implied.
    Char(u8),
    /// Raw bytes; usually UTF-8 but not required to be.
    String(Vec<u8>),
    Array(Vec<Value>),
    Object(Vec<Entry>),
}

/// A key/value pair inside an object.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Value,
}

impl Entry {
    pub fn new(key: impl Into<Vec<u8>>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Key as text, if it is valid UTF-8.
    pub fn key_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.key).ok()
    }
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::NoOp => ValueType::NoOp,
            Value::True => ValueType::True,
            Value::False => ValueType::False,
            Value::Int8(_) => ValueType::Int8,
            Value::UInt8(_) => ValueType::UInt8,
            Value::Int16(_) => ValueType::Int16,
            Value::Int32(_) => ValueType::Int32,
            Value::Int64(_) => ValueType::Int64,
            Value::Float32(_) => ValueType::Float32,
            Value::Float64(_) => ValueType::Float64,
            Value::Char(_) => ValueType::Char,
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Object(_) => ValueType::Object,
        }
    }

    pub fn bool(value: bool) -> Self {
        if value {
            Value::True
        } else {
            Value::False
        }
    }

    pub fn string(value: impl Into<Vec<u8>>) -> Self {
        Value::String(value.into())
    }

    pub fn empty_object() -> Self {
        Value::Object(Vec::new())
    }

    pub fn empty_array() -> Self {
        Value::Array(Vec::new())
    }

    pub fn is_collection(&self) -> bool {
        self.value_type().is_collection()
    }

    /// String payload as text, if this is a UTF-8 string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&[Entry]> {
        match self {
            Value::Object(entries) => Some(entries),
            _ => None,
        }
    }

    /// First entry with `key`, found by a front-to-back scan.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object()?
            .iter()
            .find(|entry| entry.key == key.as_bytes())
            .map(|entry| &entry.value)
    }

    /// Number of direct children of a container, `None` for scalars.
    pub fn child_count(&self) -> Option<usize> {
        match self {
            Value::Array(values) => Some(values.len()),
            Value::Object(entries) => Some(entries.len()),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::bool(value)
    }
}

impl From<i8> for Value {
    fn from(value: i8) -> Self {
        Value::Int8(value)
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Value::UInt8(value)
    }
}

impl From<i16> for Value {
    fn from(value: i16) -> Self {
        Value::Int16(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float32(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float64(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_roundtrip_through_types() {
        for marker in b"ZNTFiUIlLdDCS[{" {
            let ty = ValueType::from_marker(*marker).unwrap();
            assert_eq!(ty.marker(), *marker);
        }
        assert!(ValueType::from_marker(b']').is_none());
        assert!(ValueType::from_marker(b'}').is_none());
        assert!(ValueType::from_marker(b'H').is_none());
    }

    #[test]
    fn bool_request_accepts_either_tag() {
        assert!(ValueType::True.satisfies(ValueType::False));
        assert!(ValueType::False.satisfies(ValueType::True));
        assert!(!ValueType::Int8.satisfies(ValueType::UInt8));
        assert!(!ValueType::Null.satisfies(ValueType::False));
    }

    #[test]
    fn push_grow_doubles_from_four() {
        let mut items: Vec<u32> = Vec::new();
        push_grow(&mut items, 1).unwrap();
        assert!(items.capacity() >= 4);
        for i in 2..=5 {
            push_grow(&mut items, i).unwrap();
        }
        assert!(items.capacity() >= 8);
        assert_eq!(items, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn get_returns_first_duplicate_key() {
        let value = Value::Object(vec![
            Entry::new("k", Value::Int8(1)),
            Entry::new("k", Value::Int8(2)),
        ]);
        assert_eq!(value.get("k"), Some(&Value::Int8(1)));
        assert_eq!(value.child_count(), Some(2));
    }
}
