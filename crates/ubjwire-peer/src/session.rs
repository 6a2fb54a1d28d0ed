//! One connection between a controller and an agent.
//!
//! A session starts in [`SessionState::Handshaking`], becomes
//! [`SessionState::Ready`] once the hello has been sent or accepted, and ends
//! in [`SessionState::Closed`] after any connection error. A closed session is
//! not reused; the caller connects again and starts a new one.
//!
//! Keepalive probes are answered inside the receive path, so callers of
//! [`Session::recv`] and [`Session::request`] only ever see command and reply
//! messages.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};
use ubjwire_frame::{
    FrameConfig, FrameError, Message, MessageReader, MessageWriter, DEFAULT_MAX_MESSAGE_SIZE, PING,
};
use ubjwire_transport::IpcStream;

use crate::command::{Command, Reply};
use crate::error::{PeerError, Result};
use crate::handshake::{self, HandshakeConfig};
use crate::keepalive::{
    is_keepalive, Keepalive, ProbeAction, DEFAULT_KEEPALIVE_INTERVAL, DEFAULT_KEEPALIVE_TIMEOUT,
};

/// Default per-read wait; bounds how often deadlines are checked.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Default time allowed for a query's reply.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);
/// Maximum messages held while waiting for a keepalive echo.
pub const MAX_BACKLOG: usize = 64;

/// Lifecycle of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Handshaking,
    Ready,
    Closed,
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Read timeout applied to the stream; one receive attempt waits at most
    /// this long.
    pub read_timeout: Duration,
    /// Write timeout applied to the stream.
    pub write_timeout: Option<Duration>,
    /// How long [`Session::request`] waits for a reply.
    pub request_timeout: Duration,
    /// Interval between controller probes.
    pub keepalive_interval: Duration,
    /// How long a probe may go unanswered.
    pub keepalive_timeout: Duration,
    pub max_message_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_POLL_INTERVAL,
            write_timeout: Some(Duration::from_secs(1)),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            keepalive_timeout: DEFAULT_KEEPALIVE_TIMEOUT,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl SessionConfig {
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_message_size: self.max_message_size,
            read_timeout: Some(self.read_timeout),
            write_timeout: self.write_timeout,
            ..FrameConfig::default()
        }
    }
}

/// Session over a connected socket.
pub type IpcSession = Session<IpcStream, IpcStream>;

/// A message stream with the hello, keepalive, and request rules applied.
#[derive(Debug)]
pub struct Session<R, W> {
    reader: MessageReader<R>,
    writer: MessageWriter<W>,
    state: SessionState,
    keepalive: Keepalive,
    /// Messages that arrived while waiting for a probe echo.
    backlog: VecDeque<Message>,
    config: SessionConfig,
}

impl<R: Read, W: Write> Session<R, W> {
    pub fn new(reader: MessageReader<R>, writer: MessageWriter<W>, config: SessionConfig) -> Self {
        Self {
            reader,
            writer,
            state: SessionState::Handshaking,
            keepalive: Keepalive::new(),
            backlog: VecDeque::new(),
            config,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Agent side: send the hello and enter the ready state.
    pub fn hello(&mut self) -> Result<()> {
        self.expect_state(SessionState::Handshaking)?;
        let sent = handshake::send_hello(&mut self.writer);
        self.settle(sent)?;
        self.state = SessionState::Ready;
        Ok(())
    }

    /// Controller side: wait for the agent's hello and enter the ready state.
    pub fn accept_hello(&mut self, config: &HandshakeConfig) -> Result<()> {
        self.expect_state(SessionState::Handshaking)?;
        let received = handshake::expect_hello(&mut self.reader, config);
        self.settle(received)?;
        self.state = SessionState::Ready;
        Ok(())
    }

    /// Send one complete message.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.expect_state(SessionState::Ready)?;
        let sent = self.writer.send(payload).map_err(PeerError::from);
        self.settle(sent)
    }

    pub fn send_command(&mut self, command: &Command) -> Result<()> {
        let bytes = command.encode()?;
        trace!(%command, len = bytes.len(), "sending command");
        self.send(&bytes)
    }

    /// Wait for one command or reply message, answering probes meanwhile.
    ///
    /// Returns `Ok(None)` when nothing arrived within the read timeout.
    /// Malformed input is logged and dropped, and the session stays open.
    pub fn poll(&mut self) -> Result<Option<Message>> {
        self.expect_state(SessionState::Ready)?;
        if let Some(message) = self.backlog.pop_front() {
            return Ok(Some(message));
        }
        let Some(message) = self.read_one()? else {
            return Ok(None);
        };
        self.absorb(message)
    }

    /// Block until a command or reply message arrives.
    pub fn recv(&mut self) -> Result<Message> {
        loop {
            if let Some(message) = self.poll()? {
                return Ok(message);
            }
        }
    }

    /// Wait up to `timeout` for a command or reply message.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Message> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(message) = self.poll()? {
                return Ok(message);
            }
            if Instant::now() >= deadline {
                return Err(PeerError::Timeout(timeout));
            }
        }
    }

    /// Send `command`, then wait for its reply if it has one.
    ///
    /// A query left unanswered closes the session.
    pub fn request(&mut self, command: &Command) -> Result<Option<Reply>> {
        self.send_command(command)?;
        if !command.expects_reply() {
            return Ok(None);
        }

        let timeout = self.config.request_timeout;
        let message = match self.recv_timeout(timeout) {
            Ok(message) => message,
            Err(err) => {
                self.close();
                return Err(err);
            }
        };
        let reply = Reply::decode(command, message.as_bytes())?;
        Ok(Some(reply))
    }

    /// Send a probe and wait for its echo.
    ///
    /// Other messages that arrive meanwhile are kept for [`Session::poll`].
    pub fn keepalive(&mut self) -> Result<()> {
        self.send(PING)?;
        let sent_at = Instant::now();
        self.keepalive.sent(PING, sent_at);
        trace!("sent keepalive probe");

        let timeout = self.config.keepalive_timeout;
        while self.keepalive.is_pending() {
            if self.keepalive.expired(timeout, Instant::now()) {
                self.keepalive.clear();
                self.close();
                return Err(PeerError::KeepaliveFailed(format!(
                    "no echo within {timeout:?}"
                )));
            }
            let Some(message) = self.read_one()? else {
                continue;
            };
            if let Some(message) = self.absorb(message)? {
                if self.backlog.len() >= MAX_BACKLOG {
                    warn!(len = message.len(), "backlog full, dropping message");
                    continue;
                }
                self.backlog.push_back(message);
            }
        }
        debug!(rtt_us = sent_at.elapsed().as_micros() as u64, "keepalive echoed");
        Ok(())
    }

    /// Whether a probe is outstanding.
    pub fn pending_probe(&self) -> bool {
        self.keepalive.is_pending()
    }

    /// Messages held back while a probe was outstanding.
    pub fn backlog(&self) -> usize {
        self.backlog.len()
    }

    /// Mark the session closed. The streams close when it is dropped.
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            debug!("session closed");
        }
        self.state = SessionState::Closed;
    }

    pub fn into_parts(self) -> (MessageReader<R>, MessageWriter<W>) {
        (self.reader, self.writer)
    }

    fn expect_state(&self, expected: SessionState) -> Result<()> {
        match self.state {
            state if state == expected => Ok(()),
            SessionState::Closed => Err(PeerError::Disconnected("session is closed".to_string())),
            state => Err(PeerError::InvalidState { state, expected }),
        }
    }

    /// Close the session if `result` is a connection error.
    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            if err.is_connection_error() {
                self.close();
            }
        }
        result
    }

    /// One read attempt. Timeouts and malformed input yield `None`.
    fn read_one(&mut self) -> Result<Option<Message>> {
        match self.reader.read_message() {
            Ok(message) => Ok(Some(message)),
            Err(err) if err.is_timeout() => Ok(None),
            Err(err) if err.is_malformed() => {
                warn!(error = %err, "dropped malformed message");
                Ok(None)
            }
            Err(FrameError::ConnectionClosed) => {
                self.close();
                Err(PeerError::Disconnected("peer closed the connection".to_string()))
            }
            Err(err) => {
                self.close();
                Err(PeerError::Frame(err))
            }
        }
    }

    /// Answer or consume probes; pass everything else through.
    fn absorb(&mut self, message: Message) -> Result<Option<Message>> {
        if !is_keepalive(message.as_bytes()) {
            return Ok(Some(message));
        }
        match self.keepalive.on_probe(message.as_bytes(), Instant::now()) {
            ProbeAction::Echoed => trace!("probe echoed"),
            ProbeAction::Reply => {
                trace!("echoing probe");
                self.send(message.as_bytes())?;
            }
        }
        Ok(None)
    }
}

impl IpcSession {
    /// Wrap a connected stream, applying the configured timeouts.
    pub fn from_stream(stream: IpcStream, config: SessionConfig) -> Result<Self> {
        let frame_config = config.frame_config();
        let reader_stream = stream.try_clone()?;
        let reader = MessageReader::with_config_ipc(reader_stream, frame_config.clone())?;
        let writer = MessageWriter::with_config_ipc(stream, frame_config)?;
        Ok(Self::new(reader, writer, config))
    }

    /// Close the session and shut the socket down in both directions.
    pub fn shutdown(&mut self) -> Result<()> {
        self.close();
        self.writer.get_ref().shutdown()?;
        Ok(())
    }
}
