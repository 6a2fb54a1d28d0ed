//! Read cursor: type-checked sequential extraction from the current frame.
//!
//! A request names the type it expects. Extraction succeeds only when the
//! stored tag matches; a boolean request accepts either `T` or `F`.

use crate::context::Context;
use crate::error::{CodecError, Result};
use crate::value::{Value, ValueType};

/// A value read from the tree. Strings borrow from the tree; containers
/// report their element count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Extracted<'a> {
    Null,
    NoOp,
    Bool(bool),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Char(u8),
    String(&'a [u8]),
    Array(usize),
    Object(usize),
}

/// Extract `value` if its tag satisfies `expected`.
pub fn extract(value: &Value, expected: ValueType) -> Result<Extracted<'_>> {
    let found = value.value_type();
    if !found.satisfies(expected) {
        return Err(CodecError::TypeMismatch { expected, found });
    }
    let extracted = match value {
        Value::Null => Extracted::Null,
        Value::NoOp => Extracted::NoOp,
        Value::True => Extracted::Bool(true),
        Value::False => Extracted::Bool(false),
        Value::Int8(v) => Extracted::Int8(*v),
        Value::UInt8(v) => Extracted::UInt8(*v),
        Value::Int16(v) => Extracted::Int16(*v),
        Value::Int32(v) => Extracted::Int32(*v),
        Value::Int64(v) => Extracted::Int64(*v),
        Value::Float32(v) => Extracted::Float32(*v),
        Value::Float64(v) => Extracted::Float64(*v),
        Value::Char(v) => Extracted::Char(*v),
        Value::String(bytes) => Extracted::String(bytes),
        Value::Array(items) => Extracted::Array(items.len()),
        Value::Object(entries) => Extracted::Object(entries.len()),
    };
    Ok(extracted)
}

/// Element count of an array, as read by [`Context::read_as`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayLen(pub usize);

/// Entry count of an object, as read by [`Context::read_as`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectLen(pub usize);

/// Rust types that can be read directly from the cursor.
pub trait Extract<'a>: Sized {
    /// Tag requested from the tree.
    const TYPE: ValueType;

    fn from_extracted(extracted: Extracted<'a>) -> Result<Self>;
}

macro_rules! extract_scalar {
    ($ty:ty, $tag:ident) => {
        impl<'a> Extract<'a> for $ty {
            const TYPE: ValueType = ValueType::$tag;

            fn from_extracted(extracted: Extracted<'a>) -> Result<Self> {
                match extracted {
                    Extracted::$tag(v) => Ok(v),
                    other => Err(mismatch(Self::TYPE, other)),
                }
            }
        }
    };
}

extract_scalar!(i8, Int8);
extract_scalar!(u8, UInt8);
extract_scalar!(i16, Int16);
extract_scalar!(i32, Int32);
extract_scalar!(i64, Int64);
extract_scalar!(f32, Float32);
extract_scalar!(f64, Float64);

impl<'a> Extract<'a> for bool {
    const TYPE: ValueType = ValueType::True;

    fn from_extracted(extracted: Extracted<'a>) -> Result<Self> {
        match extracted {
            Extracted::Bool(v) => Ok(v),
            other => Err(mismatch(Self::TYPE, other)),
        }
    }
}

impl<'a> Extract<'a> for &'a [u8] {
    const TYPE: ValueType = ValueType::String;

    fn from_extracted(extracted: Extracted<'a>) -> Result<Self> {
        match extracted {
            Extracted::String(bytes) => Ok(bytes),
            other => Err(mismatch(Self::TYPE, other)),
        }
    }
}

impl<'a> Extract<'a> for &'a str {
    const TYPE: ValueType = ValueType::String;

    fn from_extracted(extracted: Extracted<'a>) -> Result<Self> {
        let bytes = <&[u8]>::from_extracted(extracted)?;
        std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)
    }
}

impl<'a> Extract<'a> for String {
    const TYPE: ValueType = ValueType::String;

    fn from_extracted(extracted: Extracted<'a>) -> Result<Self> {
        <&str>::from_extracted(extracted).map(str::to_owned)
    }
}

impl<'a> Extract<'a> for ArrayLen {
    const TYPE: ValueType = ValueType::Array;

    fn from_extracted(extracted: Extracted<'a>) -> Result<Self> {
        match extracted {
            Extracted::Array(len) => Ok(ArrayLen(len)),
            other => Err(mismatch(Self::TYPE, other)),
        }
    }
}

impl<'a> Extract<'a> for ObjectLen {
    const TYPE: ValueType = ValueType::Object;

    fn from_extracted(extracted: Extracted<'a>) -> Result<Self> {
        match extracted {
            Extracted::Object(len) => Ok(ObjectLen(len)),
            other => Err(mismatch(Self::TYPE, other)),
        }
    }
}

fn mismatch(expected: ValueType, found: Extracted<'_>) -> CodecError {
    CodecError::TypeMismatch {
        expected,
        found: found.value_type(),
    }
}

impl Extracted<'_> {
    pub fn value_type(&self) -> ValueType {
        match self {
            Extracted::Null => ValueType::Null,
            Extracted::NoOp => ValueType::NoOp,
            Extracted::Bool(true) => ValueType::True,
            Extracted::Bool(false) => ValueType::False,
            Extracted::Int8(_) => ValueType::Int8,
            Extracted::UInt8(_) => ValueType::UInt8,
            Extracted::Int16(_) => ValueType::Int16,
            Extracted::Int32(_) => ValueType::Int32,
            Extracted::Int64(_) => ValueType::Int64,
            Extracted::Float32(_) => ValueType::Float32,
            Extracted::Float64(_) => ValueType::Float64,
            Extracted::Char(_) => ValueType::Char,
            Extracted::String(_) => ValueType::String,
            Extracted::Array(_) => ValueType::Array,
            Extracted::Object(_) => ValueType::Object,
        }
    }
}

impl Context {
    /// Read the key/value pair at the current index of an object frame.
    pub fn read_kv_pair(&self, expected: ValueType) -> Result<(&[u8], Extracted<'_>)> {
        let (collection, frame) = self.current()?;
        let entries = match collection {
            Value::Object(entries) => entries,
            other => {
                return Err(CodecError::WrongCollection {
                    expected: ValueType::Object,
                    found: other.value_type(),
                })
            }
        };
        let entry = entries.get(frame.index).ok_or(CodecError::EmptyCollection)?;
        let value = extract(&entry.value, expected)?;
        Ok((entry.key.as_slice(), value))
    }

    /// Read the value at the current index of an array frame.
    pub fn read(&self, expected: ValueType) -> Result<Extracted<'_>> {
        let (collection, frame) = self.current()?;
        let items = match collection {
            Value::Array(items) => items,
            other => {
                return Err(CodecError::WrongCollection {
                    expected: ValueType::Array,
                    found: other.value_type(),
                })
            }
        };
        let item = items.get(frame.index).ok_or(CodecError::EmptyCollection)?;
        extract(item, expected)
    }

    /// Typed form of [`Context::read_kv_pair`].
    pub fn read_kv_pair_as<'a, T: Extract<'a>>(&'a self) -> Result<(&'a [u8], T)> {
        let (key, extracted) = self.read_kv_pair(T::TYPE)?;
        Ok((key, T::from_extracted(extracted)?))
    }

    /// Typed form of [`Context::read`].
    pub fn read_as<'a, T: Extract<'a>>(&'a self) -> Result<T> {
        T::from_extracted(self.read(T::TYPE)?)
    }

    /// The element at the current index, whatever its type.
    pub fn current_value(&self) -> Result<&Value> {
        let (collection, frame) = self.current()?;
        let value = match collection {
            Value::Array(items) => items.get(frame.index),
            Value::Object(entries) => entries.get(frame.index).map(|entry| &entry.value),
            _ => None,
        };
        value.ok_or(CodecError::EmptyCollection)
    }

    /// Key of the entry at the current index of an object frame.
    pub fn current_key(&self) -> Result<&[u8]> {
        let (collection, frame) = self.current()?;
        match collection {
            Value::Object(entries) => entries
                .get(frame.index)
                .map(|entry| entry.key.as_slice())
                .ok_or(CodecError::EmptyCollection),
            other => Err(CodecError::WrongCollection {
                expected: ValueType::Object,
                found: other.value_type(),
            }),
        }
    }

    /// Advance the read index by one.
    ///
    /// Fails without moving when the index is already on the last element.
    pub fn next_value(&mut self) -> Result<()> {
        let (collection, frame) = self.current()?;
        let len = collection.child_count().unwrap_or(0);
        if len == 0 {
            return Err(CodecError::EmptyCollection);
        }
        if frame.index + 1 >= len {
            return Err(CodecError::EndOfCollection { index: frame.index });
        }
        self.top_mut()?.index += 1;
        Ok(())
    }
}
