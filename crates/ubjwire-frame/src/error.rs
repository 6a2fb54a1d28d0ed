use ubjwire_codec::CodecError;

/// Errors from message framing and stream I/O.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A message must open with `{` or `[`.
    #[error("message does not start with a container (found 0x{byte:02x})")]
    InvalidStart { byte: u8 },

    /// A byte in tag position is not a known marker.
    #[error("invalid marker 0x{marker:02x} at offset {offset}")]
    InvalidMarker { marker: u8, offset: usize },

    /// A string or key length is negative or overflows.
    #[error("invalid string length at offset {offset}")]
    InvalidLength { offset: usize },

    /// The message grew past the configured limit before it closed.
    #[error("message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Containers nest deeper than the configured limit.
    #[error("message nesting exceeds {max}")]
    DepthExceeded { max: usize },

    /// An outgoing payload ends before its root container closes.
    #[error("payload is not a complete message ({len} bytes)")]
    Incomplete { len: usize },

    /// An outgoing payload holds bytes after its root container.
    #[error("{count} bytes after the end of the message")]
    TrailingBytes { count: usize },

    /// Rendering a value into a message failed.
    #[error("message encoding failed: {0}")]
    Codec(#[from] CodecError),

    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// End of stream was reached (possibly mid-message).
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// Whether this error came from malformed bytes rather than the connection.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            FrameError::InvalidStart { .. }
                | FrameError::InvalidMarker { .. }
                | FrameError::InvalidLength { .. }
                | FrameError::MessageTooLarge { .. }
                | FrameError::DepthExceeded { .. }
                | FrameError::Incomplete { .. }
                | FrameError::TrailingBytes { .. }
        )
    }

    /// Whether this is a read or write timeout on a stream with a deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FrameError::Io(err)
                if matches!(err.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut)
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
