use std::io::{Read, Write};
use std::net::Shutdown;
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;
use std::time::Duration;

use crate::error::{Result, TransportError};
use crate::poll::wait_readable;

/// A connected local stream socket.
///
/// Reads and writes go straight to the socket. Message boundaries are the
/// framing layer's concern.
pub struct IpcStream {
    inner: UnixStream,
}

impl IpcStream {
    /// Wrap an already connected socket.
    pub fn from_unix(stream: UnixStream) -> Self {
        Self { inner: stream }
    }

    /// A connected pair of streams, for in-process peers and tests.
    pub fn pair() -> Result<(Self, Self)> {
        let (a, b) = UnixStream::pair()?;
        Ok((Self::from_unix(a), Self::from_unix(b)))
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_read_timeout(timeout).map_err(Into::into)
    }

    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_write_timeout(timeout).map_err(Into::into)
    }

    /// Duplicate the descriptor, e.g. to split reading and writing.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self::from_unix(self.inner.try_clone()?))
    }

    /// Shut down both directions. The peer sees end of stream.
    pub fn shutdown(&self) -> Result<()> {
        match self.inner.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // Already disconnected by the peer.
            Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Wait until the stream has data (or end of stream) to read.
    ///
    /// Returns `false` when `timeout` passes first; `None` waits indefinitely.
    pub fn poll_readable(&self, timeout: Option<Duration>) -> Result<bool> {
        wait_readable(self.inner.as_raw_fd(), timeout).map_err(TransportError::Poll)
    }
}

impl Read for IpcStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for IpcStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl From<UnixStream> for IpcStream {
    fn from(stream: UnixStream) -> Self {
        Self::from_unix(stream)
    }
}

impl std::fmt::Debug for IpcStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpcStream")
            .field("fd", &self.inner.as_raw_fd())
            .finish()
    }
}
