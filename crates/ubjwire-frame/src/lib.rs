//! Message framing for ubjwire streams.
//!
//! Messages have no length prefix: each one is a single object or array, and
//! it ends where its root container closes. [`MessageScanner`] finds that
//! point incrementally while bytes arrive, so readers never parse a partial
//! message and never mistake bracket bytes inside payloads for structure.
//!
//! [`MessageReader`] and [`MessageWriter`] hide partial reads and writes from
//! callers: they always deal in whole [`Message`]s.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod reader;
pub mod scan;
pub mod wellknown;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::MessageCodec;
pub use codec::{decode_message, encode_message, FrameConfig, Message, DEFAULT_MAX_MESSAGE_SIZE};
pub use error::{FrameError, Result};
pub use reader::MessageReader;
pub use scan::MessageScanner;
pub use wellknown::{is_keepalive, HELLO, LEGACY_PING, PING};
pub use writer::MessageWriter;
