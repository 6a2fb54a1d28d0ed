//! Compact binary values and a local player-control protocol.
//!
//! ubjwire encodes a small subset of UBJSON, frames one value per message
//! over a stream socket, and layers a hello / keepalive / command protocol on
//! top so a controller process can drive a media player through an agent.
//!
//! # Crate Structure
//!
//! - [`codec`]: value model, parser, renderer and the tree cursors
//! - [`transport`]: Unix domain socket listener and stream
//! - [`frame`]: bracket-delimited message framing
//! - [`peer`]: controller and agent sessions (behind `peer` feature)

/// Re-export codec types.
pub mod codec {
    pub use ubjwire_codec::*;
}

/// Re-export transport types.
pub mod transport {
    pub use ubjwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use ubjwire_frame::*;
}

/// Re-export peer types (requires `peer` feature).
#[cfg(feature = "peer")]
pub mod peer {
    pub use ubjwire_peer::*;
}
