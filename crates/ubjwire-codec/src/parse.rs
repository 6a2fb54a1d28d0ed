//! Recursive-descent parser for the wire format.
//!
//! One leading marker byte selects the production. Containers run until their
//! closing marker; end of input before that is an error.

use tracing::trace;

use crate::config::CodecConfig;
use crate::error::{CodecError, Result};
use crate::value::{push_grow, Entry, Value, ValueType};

/// Parse a complete message with the default configuration.
pub fn decode(bytes: &[u8]) -> Result<Value> {
    decode_with(bytes, CodecConfig::default())
}

/// Parse a complete message with an explicit configuration.
pub fn decode_with(bytes: &[u8], config: CodecConfig) -> Result<Value> {
    Parser::new(bytes, config).parse_root()
}

/// Single-use parser over a borrowed input buffer.
#[derive(Debug)]
pub struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    depth: usize,
    config: CodecConfig,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a [u8], config: CodecConfig) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
            config,
        }
    }

    /// Parse one root container and require the input to end with it.
    pub fn parse_root(mut self) -> Result<Value> {
        let marker = self.next_byte()?;
        if marker != b'{' && marker != b'[' {
            return Err(CodecError::InvalidRoot { marker });
        }
        let root = self.parse_value(marker, 0)?;

        let remaining = self.input.len() - self.pos;
        if remaining > 0 {
            return Err(CodecError::TrailingBytes { count: remaining });
        }
        trace!(bytes = self.input.len(), "parsed message");
        Ok(root)
    }

    /// Offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn parse_value(&mut self, marker: u8, offset: usize) -> Result<Value> {
        let ty =
            ValueType::from_marker(marker).ok_or(CodecError::InvalidMarker { marker, offset })?;
        let value = match ty {
            ValueType::Null => Value::Null,
            ValueType::NoOp => Value::NoOp,
            ValueType::True => Value::True,
            ValueType::False => Value::False,
            ValueType::Int8 => Value::Int8(i8::from_be_bytes(self.take_array::<1>()?)),
            ValueType::UInt8 => Value::UInt8(self.next_byte()?),
            ValueType::Int16 => Value::Int16(i16::from_be_bytes(self.take_array::<2>()?)),
            ValueType::Int32 => Value::Int32(i32::from_be_bytes(self.take_array::<4>()?)),
            ValueType::Int64 => Value::Int64(i64::from_be_bytes(self.take_array::<8>()?)),
            ValueType::Float32 => {
                Value::Float32(self.config.float_order.f32_from_bytes(self.take_array::<4>()?))
            }
            ValueType::Float64 => {
                Value::Float64(self.config.float_order.f64_from_bytes(self.take_array::<8>()?))
            }
            ValueType::Char => Value::Char(self.next_byte()?),
            ValueType::String => Value::String(self.parse_string_payload()?),
            ValueType::Array => self.parse_array()?,
            ValueType::Object => self.parse_object()?,
        };
        Ok(value)
    }

    fn parse_array(&mut self) -> Result<Value> {
        self.descend()?;
        let mut items = Vec::new();
        loop {
            let offset = self.pos;
            let marker = self.next_byte()?;
            if marker == b']' {
                break;
            }
            let item = self.parse_value(marker, offset)?;
            push_grow(&mut items, item)?;
        }
        self.depth -= 1;
        Ok(Value::Array(items))
    }

    fn parse_object(&mut self) -> Result<Value> {
        self.descend()?;
        let mut entries = Vec::new();
        loop {
            if self.peek()? == b'}' {
                self.pos += 1;
                break;
            }
            let key = self.parse_string_payload()?;
            let offset = self.pos;
            let marker = self.next_byte()?;
            let value = self.parse_value(marker, offset)?;
            push_grow(&mut entries, Entry { key, value })?;
        }
        self.depth -= 1;
        Ok(Value::Object(entries))
    }

    fn descend(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.config.max_depth {
            return Err(CodecError::DepthExceeded {
                max: self.config.max_depth,
            });
        }
        Ok(())
    }

    /// Length scalar followed by that many raw bytes.
    fn parse_string_payload(&mut self) -> Result<Vec<u8>> {
        let offset = self.pos;
        let marker = self.next_byte()?;
        let len: i64 = match marker {
            b'i' => i64::from(i8::from_be_bytes(self.take_array::<1>()?)),
            b'U' => i64::from(self.next_byte()?),
            b'I' => i64::from(i16::from_be_bytes(self.take_array::<2>()?)),
            b'l' => i64::from(i32::from_be_bytes(self.take_array::<4>()?)),
            b'L' => i64::from_be_bytes(self.take_array::<8>()?),
            _ => return Err(CodecError::InvalidLengthMarker { marker, offset }),
        };
        if len < 0 {
            return Err(CodecError::NegativeLength { len, offset });
        }

        let start = self.pos;
        let len = usize::try_from(len).map_err(|_| CodecError::UnexpectedEof { offset: start })?;
        let bytes = self.take(len)?;
        let mut out = Vec::new();
        out.try_reserve_exact(bytes.len())?;
        out.extend_from_slice(bytes);
        Ok(out)
    }

    fn peek(&self) -> Result<u8> {
        self.input
            .get(self.pos)
            .copied()
            .ok_or(CodecError::UnexpectedEof { offset: self.pos })
    }

    fn next_byte(&mut self) -> Result<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Ok(byte)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.input.len())
            .ok_or(CodecError::UnexpectedEof {
                offset: self.input.len(),
            })?;
        let bytes = &self.input[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}
