//! Controller and agent sessions for the ubjwire command protocol.
//!
//! The controller binds a socket ([`ControllerListener`]) and waits for an
//! agent. The agent connects ([`connect_agent`]), sends the hello, and then
//! answers commands against a [`Player`]. Either side may probe the other
//! with a keepalive; probes are echoed byte for byte.

pub mod command;
pub mod connector;
pub mod dispatch;
pub mod error;
pub mod handshake;
pub mod keepalive;
pub mod listener;
pub mod session;

pub use command::{
    lookup, Command, CommandSpec, FieldKind, FieldSpec, Metadata, PlaybackStatus, Reply,
    COMMAND_TABLE, NOTHING_PLAYING_ID,
};
pub use connector::{
    connect, connect_agent, is_not_listening, run_agent, Agent, ConnectConfig,
    DEFAULT_RETRY_INTERVAL,
};
pub use dispatch::{Dispatcher, MemoryPlayer, Player};
pub use error::{PeerError, ProtocolError, Result};
pub use handshake::{expect_hello, send_hello, HandshakeConfig, DEFAULT_HANDSHAKE_TIMEOUT, HELLO};
pub use keepalive::{is_keepalive, Keepalive, ProbeAction, LEGACY_PING, PING};
pub use listener::{Controller, ControllerListener};
pub use session::{IpcSession, Session, SessionConfig, SessionState};

#[cfg(feature = "async")]
pub use ubjwire_frame::MessageCodec;
