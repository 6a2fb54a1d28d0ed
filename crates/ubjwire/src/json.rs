//! Conversion between JSON documents and wire values.

use serde_json::{Map, Number, Value as Json};
use ubjwire_codec::{CodecError, Entry, Value};

use crate::exit::{CliError, CliResult, DATA_INVALID};

/// How JSON integers are narrowed on the way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntWidth {
    /// Every integer is `L`, as the command protocol writes them.
    #[default]
    Int64,
    /// The narrowest marker that holds the value.
    Compact,
}

/// Convert a JSON document into a message root.
pub fn to_value(json: &Json, width: IntWidth) -> CliResult<Value> {
    let value = convert(json, width)?;
    if !value.value_type().is_collection() {
        return Err(CliError::new(
            DATA_INVALID,
            format!(
                "encode failed: {}",
                CodecError::InvalidRoot {
                    marker: value.value_type().marker()
                }
            ),
        ));
    }
    Ok(value)
}

fn convert(json: &Json, width: IntWidth) -> CliResult<Value> {
    let value = match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::bool(*b),
        Json::Number(n) => number(n, width)?,
        Json::String(s) => Value::from(s.as_str()),
        Json::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| convert(item, width))
                .collect::<CliResult<_>>()?,
        ),
        Json::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| Ok(Entry::new(key.as_bytes(), convert(item, width)?)))
                .collect::<CliResult<_>>()?,
        ),
    };
    Ok(value)
}

fn number(n: &Number, width: IntWidth) -> CliResult<Value> {
    if let Some(i) = n.as_i64() {
        return Ok(match width {
            IntWidth::Int64 => Value::Int64(i),
            IntWidth::Compact => compact(i),
        });
    }
    if n.is_u64() {
        return Err(CliError::new(
            DATA_INVALID,
            format!("encode failed: integer {n} does not fit in int64"),
        ));
    }
    n.as_f64().map(Value::Float64).ok_or_else(|| {
        CliError::new(DATA_INVALID, format!("encode failed: unsupported number {n}"))
    })
}

fn compact(i: i64) -> Value {
    if let Ok(v) = i8::try_from(i) {
        Value::Int8(v)
    } else if let Ok(v) = u8::try_from(i) {
        Value::UInt8(v)
    } else if let Ok(v) = i16::try_from(i) {
        Value::Int16(v)
    } else if let Ok(v) = i32::try_from(i) {
        Value::Int32(v)
    } else {
        Value::Int64(i)
    }
}

/// Convert a decoded tree into JSON.
///
/// No-op becomes `null`, a char becomes a one-character string, and
/// non-UTF-8 strings and keys are converted lossily. Non-finite floats become
/// `null`. Repeated keys keep the last value.
pub fn from_value(value: &Value) -> Json {
    match value {
        Value::Null | Value::NoOp => Json::Null,
        Value::True => Json::Bool(true),
        Value::False => Json::Bool(false),
        Value::Int8(v) => Json::from(*v),
        Value::UInt8(v) => Json::from(*v),
        Value::Int16(v) => Json::from(*v),
        Value::Int32(v) => Json::from(*v),
        Value::Int64(v) => Json::from(*v),
        Value::Float32(v) => float(f64::from(*v)),
        Value::Float64(v) => float(*v),
        Value::Char(c) => Json::String(char::from(*c).to_string()),
        Value::String(bytes) => Json::String(String::from_utf8_lossy(bytes).into_owned()),
        Value::Array(items) => Json::Array(items.iter().map(from_value).collect()),
        Value::Object(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for entry in entries {
                map.insert(
                    String::from_utf8_lossy(&entry.key).into_owned(),
                    from_value(&entry.value),
                );
            }
            Json::Object(map)
        }
    }
}

fn float(v: f64) -> Json {
    Number::from_f64(v).map_or(Json::Null, Json::Number)
}

/// One row per leaf: a dotted path, the wire type, and a display value.
pub fn flatten(value: &Value) -> Vec<(String, &'static str, String)> {
    let mut rows = Vec::new();
    walk(value, String::new(), &mut rows);
    rows
}

fn walk(value: &Value, path: String, rows: &mut Vec<(String, &'static str, String)>) {
    match value {
        Value::Array(items) if !items.is_empty() => {
            for (index, item) in items.iter().enumerate() {
                walk(item, format!("{path}[{index}]"), rows);
            }
        }
        Value::Object(entries) if !entries.is_empty() => {
            for entry in entries {
                let key = String::from_utf8_lossy(&entry.key);
                let child = if path.is_empty() {
                    key.into_owned()
                } else {
                    format!("{path}.{key}")
                };
                walk(&entry.value, child, rows);
            }
        }
        Value::Array(_) => rows.push((path, value.value_type().name(), "[]".to_string())),
        Value::Object(_) => rows.push((path, value.value_type().name(), "{}".to_string())),
        scalar => rows.push((
            path,
            scalar.value_type().name(),
            from_value(scalar).to_string(),
        )),
    }
}

/// Lowercase hex, two digits per byte.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Parse hex digits, ignoring ASCII whitespace.
pub fn from_hex(text: &str) -> CliResult<Vec<u8>> {
    let digits: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    hex::decode(digits)
        .map_err(|err| CliError::new(DATA_INVALID, format!("invalid hex input: {err}")))
}
