//! Local stream-socket transport for ubjwire peers.
//!
//! The controller binds a filesystem Unix domain socket and accepts one agent;
//! the agent connects to it. Both ends then exchange messages over an
//! [`IpcStream`]. This is the lowest layer; framing and the peer protocol
//! build on it.

#[cfg(not(unix))]
compile_error!("ubjwire-transport supports Unix platforms only");

pub mod error;
mod poll;
pub mod stream;
pub mod uds;

pub use error::{Result, TransportError};
pub use stream::IpcStream;
pub use uds::{UnixDomainSocket, DEFAULT_SOCKET_PATH};
