use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};
use ubjwire_transport::{IpcStream, UnixDomainSocket};

use crate::command::{Command, Metadata, PlaybackStatus, Reply};
use crate::error::{PeerError, ProtocolError, Result};
use crate::handshake::HandshakeConfig;
use crate::session::{IpcSession, SessionConfig};

/// Binds the controller socket and accepts agents.
pub struct ControllerListener {
    socket: UnixDomainSocket,
    handshake_config: HandshakeConfig,
    session_config: SessionConfig,
}

impl ControllerListener {
    /// Bind to a Unix domain socket path.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let socket = UnixDomainSocket::bind(path)?;
        Ok(Self {
            socket,
            handshake_config: HandshakeConfig::default(),
            session_config: SessionConfig::default(),
        })
    }

    /// Override handshake config.
    pub fn with_handshake_config(mut self, config: HandshakeConfig) -> Self {
        self.handshake_config = config;
        self
    }

    /// Override session config for accepted agents.
    pub fn with_session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Accept the next agent and validate its hello.
    pub fn accept(&self) -> Result<Controller> {
        let stream = self.socket.accept()?;
        self.handshake(stream)
    }

    /// Like [`ControllerListener::accept`], but give up after `timeout`
    /// without a connection.
    pub fn accept_timeout(&self, timeout: Duration) -> Result<Option<Controller>> {
        match self.socket.accept_timeout(timeout)? {
            Some(stream) => self.handshake(stream).map(Some),
            None => Ok(None),
        }
    }

    /// Bound socket path.
    pub fn path(&self) -> &Path {
        self.socket.path()
    }

    fn handshake(&self, stream: IpcStream) -> Result<Controller> {
        Controller::from_stream(stream, &self.handshake_config, self.session_config.clone())
    }
}

/// The controller's end of a session: issues commands to one agent.
pub struct Controller {
    session: IpcSession,
}

impl Controller {
    /// Wrap a connected stream and wait for the agent's hello.
    pub fn from_stream(
        stream: IpcStream,
        handshake_config: &HandshakeConfig,
        session_config: SessionConfig,
    ) -> Result<Self> {
        let mut session = IpcSession::from_stream(stream, session_config)?;
        if let Err(err) = session.accept_hello(handshake_config) {
            warn!(error = %err, "rejecting agent");
            let _ = session.shutdown();
            return Err(err);
        }
        info!("agent connected");
        Ok(Self { session })
    }

    pub fn play(&mut self) -> Result<()> {
        self.send(&Command::Play)
    }

    pub fn pause(&mut self) -> Result<()> {
        self.send(&Command::Pause)
    }

    pub fn play_pause(&mut self) -> Result<()> {
        self.send(&Command::PlayPause)
    }

    pub fn next(&mut self) -> Result<()> {
        self.send(&Command::Next)
    }

    pub fn previous(&mut self) -> Result<()> {
        self.send(&Command::Previous)
    }

    pub fn stop(&mut self) -> Result<()> {
        self.send(&Command::Stop)
    }

    /// Seek by a signed delta in microseconds.
    pub fn seek(&mut self, offset: i64) -> Result<()> {
        self.send(&Command::Seek { offset })
    }

    /// Seek to an absolute position in microseconds. The agent ignores it
    /// unless `track_id` is the current track.
    pub fn set_position(&mut self, track_id: &str, offset: i64) -> Result<()> {
        self.send(&Command::SetPosition {
            track_id: track_id.to_string(),
            offset,
        })
    }

    pub fn playback_status(&mut self) -> Result<PlaybackStatus> {
        match self.request(&Command::PlaybackStatus)? {
            Reply::Status(status) => Ok(status),
            _ => Err(unexpected(&Command::PlaybackStatus)),
        }
    }

    /// The current track; `None` when nothing is playing.
    pub fn metadata(&mut self) -> Result<Option<Metadata>> {
        match self.request(&Command::Metadata)? {
            Reply::Metadata(meta) if meta.is_nothing_playing() => Ok(None),
            Reply::Metadata(meta) => Ok(Some(meta)),
            _ => Err(unexpected(&Command::Metadata)),
        }
    }

    /// Playback position in microseconds.
    pub fn position(&mut self) -> Result<i64> {
        match self.request(&Command::Position)? {
            Reply::Position(position) => Ok(position),
            _ => Err(unexpected(&Command::Position)),
        }
    }

    /// Probe the agent and wait for the echo.
    pub fn keepalive(&mut self) -> Result<()> {
        self.session.keepalive()
    }

    /// Send any command; returns its reply when it has one.
    pub fn execute(&mut self, command: &Command) -> Result<Option<Reply>> {
        self.session.request(command)
    }

    pub fn session(&self) -> &IpcSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut IpcSession {
        &mut self.session
    }

    /// Close the connection.
    pub fn shutdown(mut self) -> Result<()> {
        self.session.shutdown()
    }

    fn send(&mut self, command: &Command) -> Result<()> {
        self.session.request(command).map(|_| ())
    }

    fn request(&mut self, command: &Command) -> Result<Reply> {
        self.session
            .request(command)?
            .ok_or_else(|| unexpected(command))
    }
}

fn unexpected(command: &Command) -> PeerError {
    ProtocolError::UnexpectedReply {
        command: command.name(),
    }
    .into()
}
