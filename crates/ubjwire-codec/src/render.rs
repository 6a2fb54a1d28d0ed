//! Serializer for the wire format.

use tracing::trace;

use crate::config::CodecConfig;
use crate::error::Result;
use crate::value::Value;

/// Serialize a tree with the default configuration.
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    encode_with(value, CodecConfig::default())
}

/// Serialize a tree with an explicit configuration.
pub fn encode_with(value: &Value, config: CodecConfig) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    Renderer::new(&mut out, config).render(value)?;
    Ok(out)
}

/// Marker and payload width for a string of `len` bytes.
///
/// Picks the smallest integer class that can hold the length.
pub fn length_marker(len: usize) -> (u8, usize) {
    if len <= i8::MAX as usize {
        (b'i', 1)
    } else if len <= u8::MAX as usize {
        (b'U', 1)
    } else if len <= i16::MAX as usize {
        (b'I', 2)
    } else if len <= i32::MAX as usize {
        (b'l', 4)
    } else {
        (b'L', 8)
    }
}

/// Appends encoded values to a caller-owned buffer.
#[derive(Debug)]
pub struct Renderer<'a> {
    out: &'a mut Vec<u8>,
    config: CodecConfig,
}

impl<'a> Renderer<'a> {
    pub fn new(out: &'a mut Vec<u8>, config: CodecConfig) -> Self {
        Self { out, config }
    }

    /// Append `value`. On failure the buffer is restored to its previous length.
    pub fn render(&mut self, value: &Value) -> Result<()> {
        let start = self.out.len();
        match self.render_value(value) {
            Ok(()) => {
                trace!(bytes = self.out.len() - start, "rendered value");
                Ok(())
            }
            Err(err) => {
                self.out.truncate(start);
                Err(err)
            }
        }
    }

    fn render_value(&mut self, value: &Value) -> Result<()> {
        let marker = value.value_type().marker();
        let order = self.config.float_order;
        match value {
            Value::Null | Value::NoOp | Value::True | Value::False => self.write(&[marker]),
            Value::Int8(v) => self.tagged(marker, &v.to_be_bytes()),
            Value::UInt8(v) => self.tagged(marker, &[*v]),
            Value::Int16(v) => self.tagged(marker, &v.to_be_bytes()),
            Value::Int32(v) => self.tagged(marker, &v.to_be_bytes()),
            Value::Int64(v) => self.tagged(marker, &v.to_be_bytes()),
            Value::Float32(v) => self.tagged(marker, &order.f32_to_bytes(*v)),
            Value::Float64(v) => self.tagged(marker, &order.f64_to_bytes(*v)),
            Value::Char(v) => self.tagged(marker, &[*v]),
            Value::String(bytes) => {
                self.write(&[marker])?;
                self.string_payload(bytes)
            }
            Value::Array(items) => {
                self.write(b"[")?;
                for item in items {
                    self.render_value(item)?;
                }
                self.write(b"]")
            }
            Value::Object(entries) => {
                self.write(b"{")?;
                for entry in entries {
                    self.string_payload(&entry.key)?;
                    self.render_value(&entry.value)?;
                }
                self.write(b"}")
            }
        }
    }

    fn string_payload(&mut self, bytes: &[u8]) -> Result<()> {
        let len = bytes.len();
        let (marker, width) = length_marker(len);
        // Lengths are non-negative, so the low `width` bytes of the big-endian u64 are exact.
        let be = (len as u64).to_be_bytes();
        self.tagged(marker, &be[8 - width..])?;
        self.write(bytes)
    }

    fn tagged(&mut self, marker: u8, payload: &[u8]) -> Result<()> {
        self.write(&[marker])?;
        self.write(payload)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.out.try_reserve(bytes.len())?;
        self.out.extend_from_slice(bytes);
        Ok(())
    }
}
