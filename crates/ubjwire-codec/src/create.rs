//! Construction API: build a tree one element at a time.
//!
//! `create_object`/`create_array` start a new construction tree. `add_kv_pair_*`
//! appends to an object frame and `add_*` to an array frame; a nested
//! collection is appended empty and filled after `enter_collection`.

use crate::context::Context;
use crate::error::{CodecError, Result};
use crate::value::{push_grow, Entry, Value, ValueType};

impl Context {
    /// Start a construction tree whose root is an empty object.
    pub fn create_object(&mut self) -> Result<()> {
        self.start_creation(Value::empty_object());
        Ok(())
    }

    /// Start a construction tree whose root is an empty array.
    pub fn create_array(&mut self) -> Result<()> {
        self.start_creation(Value::empty_array());
        Ok(())
    }

    /// Append a key/value pair to the current object frame.
    ///
    /// Fails without modifying the tree on a parsed frame or an array frame.
    pub fn add_kv_pair(&mut self, key: impl AsRef<[u8]>, value: Value) -> Result<()> {
        match self.current_created_mut()? {
            Value::Object(entries) => {
                let key = key.as_ref();
                let mut owned = Vec::new();
                owned.try_reserve_exact(key.len())?;
                owned.extend_from_slice(key);
                push_grow(entries, Entry { key: owned, value })
            }
            other => Err(CodecError::WrongCollection {
                expected: ValueType::Object,
                found: other.value_type(),
            }),
        }
    }

    /// Append a value to the current array frame.
    pub fn add(&mut self, value: Value) -> Result<()> {
        match self.current_created_mut()? {
            Value::Array(items) => push_grow(items, value),
            other => Err(CodecError::WrongCollection {
                expected: ValueType::Array,
                found: other.value_type(),
            }),
        }
    }

    pub fn add_kv_pair_object(&mut self, key: impl AsRef<[u8]>) -> Result<()> {
        self.add_kv_pair(key, Value::empty_object())
    }

    pub fn add_kv_pair_array(&mut self, key: impl AsRef<[u8]>) -> Result<()> {
        self.add_kv_pair(key, Value::empty_array())
    }

    pub fn add_kv_pair_null(&mut self, key: impl AsRef<[u8]>) -> Result<()> {
        self.add_kv_pair(key, Value::Null)
    }

    pub fn add_kv_pair_noop(&mut self, key: impl AsRef<[u8]>) -> Result<()> {
        self.add_kv_pair(key, Value::NoOp)
    }

    pub fn add_kv_pair_bool(&mut self, key: impl AsRef<[u8]>, value: bool) -> Result<()> {
        self.add_kv_pair(key, Value::bool(value))
    }

    pub fn add_kv_pair_int8(&mut self, key: impl AsRef<[u8]>, value: i8) -> Result<()> {
        self.add_kv_pair(key, Value::Int8(value))
    }

    pub fn add_kv_pair_uint8(&mut self, key: impl AsRef<[u8]>, value: u8) -> Result<()> {
        self.add_kv_pair(key, Value::UInt8(value))
    }

    pub fn add_kv_pair_int16(&mut self, key: impl AsRef<[u8]>, value: i16) -> Result<()> {
        self.add_kv_pair(key, Value::Int16(value))
    }

    pub fn add_kv_pair_int32(&mut self, key: impl AsRef<[u8]>, value: i32) -> Result<()> {
        self.add_kv_pair(key, Value::Int32(value))
    }

    pub fn add_kv_pair_int64(&mut self, key: impl AsRef<[u8]>, value: i64) -> Result<()> {
        self.add_kv_pair(key, Value::Int64(value))
    }

    pub fn add_kv_pair_float32(&mut self, key: impl AsRef<[u8]>, value: f32) -> Result<()> {
        self.add_kv_pair(key, Value::Float32(value))
    }

    pub fn add_kv_pair_float64(&mut self, key: impl AsRef<[u8]>, value: f64) -> Result<()> {
        self.add_kv_pair(key, Value::Float64(value))
    }

    pub fn add_kv_pair_char(&mut self, key: impl AsRef<[u8]>, value: u8) -> Result<()> {
        self.add_kv_pair(key, Value::Char(value))
    }

    pub fn add_kv_pair_string(
        &mut self,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
    ) -> Result<()> {
        let value = owned_bytes(value.as_ref())?;
        self.add_kv_pair(key, Value::String(value))
    }

    pub fn add_object(&mut self) -> Result<()> {
        self.add(Value::empty_object())
    }

    pub fn add_array(&mut self) -> Result<()> {
        self.add(Value::empty_array())
    }

    pub fn add_null(&mut self) -> Result<()> {
        self.add(Value::Null)
    }

    pub fn add_noop(&mut self) -> Result<()> {
        self.add(Value::NoOp)
    }

    pub fn add_bool(&mut self, value: bool) -> Result<()> {
        self.add(Value::bool(value))
    }

    pub fn add_int8(&mut self, value: i8) -> Result<()> {
        self.add(Value::Int8(value))
    }

    pub fn add_uint8(&mut self, value: u8) -> Result<()> {
        self.add(Value::UInt8(value))
    }

    pub fn add_int16(&mut self, value: i16) -> Result<()> {
        self.add(Value::Int16(value))
    }

    pub fn add_int32(&mut self, value: i32) -> Result<()> {
        self.add(Value::Int32(value))
    }

    pub fn add_int64(&mut self, value: i64) -> Result<()> {
        self.add(Value::Int64(value))
    }

    pub fn add_float32(&mut self, value: f32) -> Result<()> {
        self.add(Value::Float32(value))
    }

    pub fn add_float64(&mut self, value: f64) -> Result<()> {
        self.add(Value::Float64(value))
    }

    pub fn add_char(&mut self, value: u8) -> Result<()> {
        self.add(Value::Char(value))
    }

    pub fn add_string(&mut self, value: impl AsRef<[u8]>) -> Result<()> {
        let value = owned_bytes(value.as_ref())?;
        self.add(Value::String(value))
    }
}

fn owned_bytes(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut owned = Vec::new();
    owned.try_reserve_exact(bytes.len())?;
    owned.extend_from_slice(bytes);
    Ok(owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Entry;

    #[test]
    fn builds_seek_command() {
        let mut ctx = Context::new();
        ctx.create_object().unwrap();
        ctx.add_kv_pair_string("command", "seek").unwrap();
        ctx.add_kv_pair_int64("offset", 5_000_000).unwrap();
        ctx.render_creation().unwrap();

        assert_eq!(
            ctx.output(),
            b"{i\x07commandSi\x04seeki\x06offsetL\x00\x00\x00\x00\x00\x4c\x4b\x40}"
        );
    }

    #[test]
    fn mismatched_add_leaves_tree_unchanged() {
        let mut ctx = Context::new();
        ctx.create_object().unwrap();
        ctx.add_kv_pair_int8("a", 1).unwrap();

        assert_eq!(
            ctx.add_int8(2).unwrap_err(),
            CodecError::WrongCollection {
                expected: ValueType::Array,
                found: ValueType::Object
            }
        );
        assert_eq!(
            ctx.creation(),
            Some(&Value::Object(vec![Entry::new("a", Value::Int8(1))]))
        );

        ctx.create_array().unwrap();
        assert!(matches!(
            ctx.add_kv_pair_null("k").unwrap_err(),
            CodecError::WrongCollection { .. }
        ));
        assert_eq!(ctx.creation(), Some(&Value::empty_array()));
    }

    #[test]
    fn adds_require_a_construction_frame() {
        let mut ctx = Context::new();
        assert_eq!(ctx.add_null().unwrap_err(), CodecError::NoTree);

        ctx.parse(b"[]").unwrap();
        assert_eq!(ctx.add_null().unwrap_err(), CodecError::ReadOnly);
        assert_eq!(ctx.root(), Some(&Value::empty_array()));
    }

    #[test]
    fn nested_edits_fold_into_parent() {
        let mut ctx = Context::new();
        ctx.create_object().unwrap();
        ctx.add_kv_pair_array("artist").unwrap();
        ctx.enter_collection().unwrap();
        ctx.add_string("A").unwrap();
        ctx.add_string("B").unwrap();
        ctx.exit_collection().unwrap();
        ctx.add_kv_pair_string("title", "T").unwrap();

        assert_eq!(
            ctx.creation(),
            Some(&Value::Object(vec![
                Entry::new(
                    "artist",
                    Value::Array(vec![Value::string("A"), Value::string("B")])
                ),
                Entry::new("title", Value::string("T")),
            ]))
        );
    }

    #[test]
    fn render_creation_sees_open_collections() {
        let mut ctx = Context::new();
        ctx.create_array().unwrap();
        ctx.add_object().unwrap();
        ctx.enter_collection().unwrap();
        ctx.add_kv_pair_bool("x", true).unwrap();

        ctx.render_creation().unwrap();
        assert_eq!(ctx.output(), b"[{i\x01xT}]");
        assert_eq!(ctx.depth(), 2);
    }

    #[test]
    fn enter_uses_most_recent_element() {
        let mut ctx = Context::new();
        ctx.create_array().unwrap();
        ctx.add_array().unwrap();
        ctx.add_object().unwrap();
        ctx.enter_collection().unwrap();
        assert_eq!(ctx.collection_type().unwrap(), ValueType::Object);

        ctx.exit_collection().unwrap();
        ctx.add_null().unwrap();
        assert!(matches!(
            ctx.enter_collection().unwrap_err(),
            CodecError::NotACollection { .. }
        ));
    }

    #[test]
    fn create_replaces_previous_tree() {
        let mut ctx = Context::new();
        ctx.create_object().unwrap();
        ctx.add_kv_pair_null("a").unwrap();
        ctx.create_array().unwrap();
        assert_eq!(ctx.creation(), Some(&Value::empty_array()));
        assert_eq!(ctx.depth(), 1);
    }
}
