use crate::value::ValueType;

/// Errors produced by the parser, renderer and tree cursors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Input ended before the value starting at `offset` was complete.
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof { offset: usize },

    /// A byte in tag position is not one of the supported markers.
    #[error("invalid type marker 0x{marker:02x} at offset {offset}")]
    InvalidMarker { marker: u8, offset: usize },

    /// A string length was introduced by a non-integer marker.
    #[error("invalid string length marker 0x{marker:02x} at offset {offset}")]
    InvalidLengthMarker { marker: u8, offset: usize },

    /// A string length decoded to a negative number.
    #[error("negative string length {len} at offset {offset}")]
    NegativeLength { len: i64, offset: usize },

    /// The top-level value is not an object or an array.
    #[error("root must be an object or array (found marker 0x{marker:02x})")]
    InvalidRoot { marker: u8 },

    /// Bytes remain after the root value was closed.
    #[error("{count} trailing bytes after root value")]
    TrailingBytes { count: usize },

    /// Containers are nested deeper than the configured limit.
    #[error("nesting depth exceeds {max}")]
    DepthExceeded { max: usize },

    /// No tree exists for the requested operation.
    #[error("no tree to operate on")]
    NoTree,

    /// The current frame is the wrong kind of collection for the operation.
    #[error("current collection is {found}, operation requires {expected}")]
    WrongCollection {
        expected: ValueType,
        found: ValueType,
    },

    /// Construction was attempted on a frame that came from parsing.
    #[error("cannot add to a parsed collection")]
    ReadOnly,

    /// The stored value does not have the requested type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: ValueType,
        found: ValueType,
    },

    /// `enter_collection` targeted a scalar value.
    #[error("cannot enter {found}: not a collection")]
    NotACollection { found: ValueType },

    /// The current collection has no elements.
    #[error("collection is empty")]
    EmptyCollection,

    /// `exit_collection` was called on the root frame.
    #[error("already at the root collection")]
    AtRoot,

    /// `next_value` was called on the last element.
    #[error("no element after index {index}")]
    EndOfCollection { index: usize },

    /// A string payload is not valid UTF-8 where text was requested.
    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    /// Growing a buffer or container failed.
    #[error("allocation failed while growing a buffer")]
    Alloc,
}

impl From<std::collections::TryReserveError> for CodecError {
    fn from(_: std::collections::TryReserveError) -> Self {
        CodecError::Alloc
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
