use std::os::fd::AsRawFd;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::poll::wait_readable;
use crate::stream::IpcStream;

/// Socket path used by the player-side agent and the controller when none is given.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/foo_mpris.sock";

/// A listening filesystem-path Unix domain socket.
///
/// The socket file is removed on drop, but only if the path still refers to
/// the socket this listener created.
pub struct UnixDomainSocket {
    listener: UnixListener,
    path: PathBuf,
    identity: (u64, u64),
}

impl UnixDomainSocket {
    /// Permission mode applied to the socket file.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;

    /// Capacity of `sockaddr_un.sun_path`.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Bind with [`Self::DEFAULT_SOCKET_MODE`].
    ///
    /// A stale socket file at `path` is replaced. Any other kind of file is
    /// left alone and the bind fails.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_mode(path, Self::DEFAULT_SOCKET_MODE)
    }

    pub fn bind_with_mode(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let bind_err = |source: std::io::Error| TransportError::Bind {
            path: path.clone(),
            source,
        };

        let len = path.as_os_str().len();
        if len >= Self::MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path,
                len,
                max: Self::MAX_PATH_LEN,
            });
        }

        match std::fs::symlink_metadata(&path) {
            Ok(metadata) if metadata.file_type().is_socket() => {
                debug!(?path, "removing stale socket");
                std::fs::remove_file(&path).map_err(bind_err)?;
            }
            Ok(_) => {
                return Err(bind_err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "existing path is not a unix socket",
                )));
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(bind_err(err)),
        }

        let listener = UnixListener::bind(&path).map_err(bind_err)?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).map_err(bind_err)?;
        let metadata = std::fs::symlink_metadata(&path).map_err(bind_err)?;
        let identity = (metadata.dev(), metadata.ino());

        info!(?path, "listening for agents");
        Ok(Self {
            listener,
            path,
            identity,
        })
    }

    /// Accept one peer, blocking until it connects.
    pub fn accept(&self) -> Result<IpcStream> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(path = ?self.path, "accepted connection");
        Ok(IpcStream::from_unix(stream))
    }

    /// Accept one peer, giving up after `timeout`.
    ///
    /// Returns `Ok(None)` on timeout so callers can check for shutdown.
    pub fn accept_timeout(&self, timeout: Duration) -> Result<Option<IpcStream>> {
        let ready = wait_readable(self.listener.as_raw_fd(), Some(timeout))
            .map_err(TransportError::Poll)?;
        if !ready {
            return Ok(None);
        }
        self.accept().map(Some)
    }

    /// Connect to a listening socket.
    pub fn connect(path: impl AsRef<Path>) -> Result<IpcStream> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|source| TransportError::Connect {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(?path, "connected to controller");
        Ok(IpcStream::from_unix(stream))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UnixDomainSocket {
    fn drop(&mut self) {
        let Ok(metadata) = std::fs::symlink_metadata(&self.path) else {
            return;
        };
        if metadata.file_type().is_socket() && (metadata.dev(), metadata.ino()) == self.identity {
            debug!(path = ?self.path, "removing socket file");
            let _ = std::fs::remove_file(&self.path);
        } else {
            debug!(path = ?self.path, "socket path was replaced; leaving it");
        }
    }
}

impl std::fmt::Debug for UnixDomainSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnixDomainSocket")
            .field("path", &self.path)
            .finish()
    }
}
