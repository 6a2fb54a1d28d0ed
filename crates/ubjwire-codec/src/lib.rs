//! Compact binary value codec for the ubjwire command protocol.
//!
//! The wire format is a small subset of UBJSON:
//! - Containers: `{` … `}` objects (keys carry no `S` marker) and `[` … `]` arrays
//! - Scalars: `Z` null, `N` no-op, `T`/`F`, `C` char, `i U I l L` integers
//!   (big-endian), `d D` floats
//! - Strings: `S`, a minimal integer length, then raw bytes
//!
//! A [`Context`] owns a parsed tree, a construction tree, a cursor stack and a
//! render buffer. [`decode`] and [`encode`] cover the cases that need no cursor.

pub mod config;
pub mod context;
mod create;
pub mod error;
pub mod parse;
pub mod read;
pub mod render;
pub mod value;

pub use config::{CodecConfig, FloatOrder, DEFAULT_MAX_DEPTH};
pub use context::{Context, Origin};
pub use error::{CodecError, Result};
pub use parse::{decode, decode_with, Parser};
pub use read::{extract, ArrayLen, Extract, Extracted, ObjectLen};
pub use render::{encode, encode_with, length_marker, Renderer};
pub use value::{Entry, Value, ValueType};
