use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tracing::{debug, warn};
use ubjwire_transport::IpcStream;

use crate::codec::{decode_message, FrameConfig, Message};
use crate::error::{FrameError, Result};
use crate::scan::MessageScanner;

const INITIAL_BUFFER_CAPACITY: usize = 1024;
/// Bytes requested per read; the buffer grows as messages need.
const READ_CHUNK_SIZE: usize = 256;

/// Reads complete messages from any `Read` stream.
///
/// Partial reads are accumulated; bytes that arrive after a message stay
/// buffered for the next call.
#[derive(Debug)]
pub struct MessageReader<T> {
    inner: T,
    buf: BytesMut,
    scanner: MessageScanner,
    config: FrameConfig,
}

impl<T: Read> MessageReader<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            scanner: MessageScanner::new(config.max_depth),
            config,
        }
    }

    /// Read the next complete message (blocking, subject to the stream's
    /// read timeout).
    ///
    /// End of stream is `FrameError::ConnectionClosed`. A timeout or
    /// `WouldBlock` surfaces as `FrameError::Io` with buffered bytes kept, so
    /// the call can be retried. Malformed bytes are dropped up to the bad
    /// byte before the error is returned; messages after them are kept. An
    /// oversized message is reported once and its remaining bytes are
    /// skipped as they arrive.
    pub fn read_message(&mut self) -> Result<Message> {
        loop {
            if let Some(message) = self.next_buffered()? {
                return Ok(message);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                if !self.buf.is_empty() {
                    debug!(buffered = self.buf.len(), "stream ended mid-message");
                }
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Take a message that is already complete in the buffer, without reading.
    pub fn next_buffered(&mut self) -> Result<Option<Message>> {
        match decode_message(&mut self.buf, &mut self.scanner, self.config.max_message_size) {
            Ok(message) => Ok(message),
            Err(err) => {
                warn!(error = %err, buffered = self.buf.len(), "dropped malformed input");
                Err(err)
            }
        }
    }

    /// Bytes received but not yet returned as a message.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl MessageReader<IpcStream> {
    /// Create a reader for an `IpcStream` and apply the configured read timeout.
    pub fn with_config_ipc(inner: IpcStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: ubjwire_transport::TransportError) -> FrameError {
    use ubjwire_transport::TransportError;

    match err {
        TransportError::Io(io) | TransportError::Accept(io) | TransportError::Poll(io) => {
            FrameError::Io(io)
        }
        TransportError::Bind { source, .. } | TransportError::Connect { source, .. } => {
            FrameError::Io(source)
        }
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
