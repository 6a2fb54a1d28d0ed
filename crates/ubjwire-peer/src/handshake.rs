//! Hello exchange that opens every connection.
//!
//! The agent's first message must be exactly [`HELLO`]. The controller
//! compares bytes and never parses it; anything else closes the connection.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use ubjwire_frame::{FrameError, MessageReader, MessageWriter};

pub use ubjwire_frame::HELLO;

use crate::error::{PeerError, Result};

/// Default time allowed for the agent's hello to arrive.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Handshake configuration.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    /// How long the controller waits for the hello.
    pub timeout: Duration,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

/// Send the hello literal (agent side).
pub fn send_hello<W: Write>(writer: &mut MessageWriter<W>) -> Result<()> {
    writer.send(HELLO)?;
    debug!("sent hello");
    Ok(())
}

/// Wait for the hello literal (controller side).
///
/// The reader's stream should have a read timeout shorter than
/// `config.timeout`, or a silent peer blocks past the deadline.
pub fn expect_hello<R: Read>(
    reader: &mut MessageReader<R>,
    config: &HandshakeConfig,
) -> Result<()> {
    let deadline = Instant::now() + config.timeout;
    loop {
        if Instant::now() >= deadline {
            return Err(PeerError::Timeout(config.timeout));
        }

        match reader.read_message() {
            Ok(message) if message.is_hello() => {
                debug!("received hello");
                return Ok(());
            }
            Ok(message) => {
                warn!(len = message.len(), "first message is not hello");
                return Err(PeerError::HandshakeFailed(format!(
                    "unexpected first message ({} bytes)",
                    message.len()
                )));
            }
            Err(err) if err.is_timeout() => continue,
            Err(FrameError::ConnectionClosed) => {
                return Err(PeerError::Disconnected(
                    "connection closed during handshake".to_string(),
                ));
            }
            Err(err) if err.is_malformed() => {
                return Err(PeerError::HandshakeFailed(format!(
                    "malformed first message: {err}"
                )));
            }
            Err(err) => return Err(PeerError::Frame(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::thread;

    use ubjwire_frame::{FrameConfig, PING};
    use ubjwire_transport::IpcStream;

    use super::*;

    fn reader_over(bytes: &[u8]) -> MessageReader<Cursor<Vec<u8>>> {
        MessageReader::new(Cursor::new(bytes.to_vec()))
    }

    #[test]
    fn accepts_exact_hello() {
        let mut reader = reader_over(HELLO);
        expect_hello(&mut reader, &HandshakeConfig::default()).unwrap();
    }

    #[test]
    fn rejects_other_first_message() {
        let mut reader = reader_over(PING);
        assert!(matches!(
            expect_hello(&mut reader, &HandshakeConfig::default()),
            Err(PeerError::HandshakeFailed(_))
        ));
    }

    #[test]
    fn rejects_hello_with_different_encoding() {
        // Same object, but the string length uses a uint8 marker.
        let mut reader = reader_over(b"{i\x07commandSU\x05hello}");
        assert!(matches!(
            expect_hello(&mut reader, &HandshakeConfig::default()),
            Err(PeerError::HandshakeFailed(_))
        ));
    }

    #[test]
    fn rejects_malformed_and_closed() {
        let mut reader = reader_over(b"[H]");
        assert!(matches!(
            expect_hello(&mut reader, &HandshakeConfig::default()),
            Err(PeerError::HandshakeFailed(_))
        ));

        let mut reader = reader_over(&HELLO[..5]);
        assert!(matches!(
            expect_hello(&mut reader, &HandshakeConfig::default()),
            Err(PeerError::Disconnected(_))
        ));
    }

    #[test]
    fn silent_peer_times_out() {
        let (_agent, controller) = IpcStream::pair().unwrap();
        let frame_config = FrameConfig {
            read_timeout: Some(Duration::from_millis(10)),
            ..FrameConfig::default()
        };
        let mut reader = MessageReader::with_config_ipc(controller, frame_config).unwrap();
        let config = HandshakeConfig {
            timeout: Duration::from_millis(50),
        };
        assert!(matches!(
            expect_hello(&mut reader, &config),
            Err(PeerError::Timeout(_))
        ));
    }

    #[test]
    fn hello_over_socket_pair() {
        let (agent, controller) = IpcStream::pair().unwrap();

        let sender = thread::spawn(move || {
            let mut writer = MessageWriter::new(agent);
            send_hello(&mut writer).unwrap();
        });

        let mut reader = MessageReader::new(controller);
        expect_hello(&mut reader, &HandshakeConfig::default()).unwrap();
        sender.join().unwrap();
    }
}
