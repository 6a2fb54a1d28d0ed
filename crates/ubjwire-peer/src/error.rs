use std::time::Duration;

use ubjwire_codec::CodecError;
use ubjwire_frame::FrameError;

use crate::session::SessionState;

/// A message that parsed but does not match the command vocabulary.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// Fields are positional; the key at this position has the wrong name.
    #[error("expected field '{expected}', found '{found}'")]
    UnexpectedField {
        expected: &'static str,
        found: String,
    },

    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("invalid value for '{field}': {source}")]
    InvalidValue {
        field: &'static str,
        #[source]
        source: CodecError,
    },

    /// The reply does not belong to the command that was sent.
    #[error("unexpected reply to '{command}'")]
    UnexpectedReply { command: &'static str },

    #[error("malformed message: {0}")]
    Malformed(#[from] CodecError),
}

/// Errors that can occur in peer operations.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] ubjwire_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Building an outgoing message failed.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The first message was not the hello literal.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// A keepalive probe was not echoed in time.
    #[error("keepalive failed: {0}")]
    KeepaliveFailed(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Peer disconnected.
    #[error("peer disconnected: {0}")]
    Disconnected(String),

    /// Request timed out.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The operation does not apply to the session's current state.
    #[error("session is {state:?}, operation needs {expected:?}")]
    InvalidState {
        state: SessionState,
        expected: SessionState,
    },
}

impl PeerError {
    /// Whether the session is unusable and should be torn down.
    ///
    /// Format and protocol errors only reject one message; everything else
    /// ends the connection, and the caller re-establishes it with a fresh
    /// hello.
    pub fn is_connection_error(&self) -> bool {
        match self {
            PeerError::Frame(err) => !err.is_malformed(),
            PeerError::Codec(_) | PeerError::Protocol(_) | PeerError::InvalidState { .. } => false,
            PeerError::Transport(_)
            | PeerError::HandshakeFailed(_)
            | PeerError::KeepaliveFailed(_)
            | PeerError::Disconnected(_)
            | PeerError::Timeout(_) => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, PeerError>;
