use std::path::PathBuf;

/// Errors from socket setup and stream I/O.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listening socket failed.
    #[error("failed to bind {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Connecting to a listening socket failed.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Accepting a peer failed.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// Waiting for readiness failed.
    #[error("poll failed: {0}")]
    Poll(std::io::Error),

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The path does not fit in `sockaddr_un.sun_path`.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },
}

impl TransportError {
    /// Whether connecting failed because nobody is listening yet.
    pub fn is_not_listening(&self) -> bool {
        match self {
            TransportError::Connect { source, .. } => matches!(
                source.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
