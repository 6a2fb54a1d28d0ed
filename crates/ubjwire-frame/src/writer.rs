use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use ubjwire_codec::{CodecConfig, Value};
use ubjwire_transport::IpcStream;

use crate::codec::{encode_message, FrameConfig, Message};
use crate::error::{FrameError, Result};
use crate::reader::transport_to_frame_error;

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Writes complete messages to any `Write` stream.
#[derive(Debug)]
pub struct MessageWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> MessageWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    pub fn write_message(&mut self, message: &Message) -> Result<()> {
        self.send(message.as_bytes())
    }

    /// Validate that `payload` is exactly one message, then write it whole.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_message(payload, &mut self.buf, &self.config)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Render `value` and send it.
    pub fn send_value(&mut self, value: &Value) -> Result<()> {
        let message = Message::from_value(value, CodecConfig::default())?;
        self.write_message(&message)
    }

    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
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

impl MessageWriter<IpcStream> {
    /// Create a writer for an `IpcStream` and apply the configured write timeout.
    pub fn with_config_ipc(inner: IpcStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::wellknown::{HELLO, PING};
    use ubjwire_codec::Entry;

    /// Accepts at most `max_write` bytes per call, interrupting every other call.
    struct TrickleWriter {
        written: Vec<u8>,
        max_write: usize,
        interrupt_next: bool,
    }

    impl Write for TrickleWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.interrupt_next {
                self.interrupt_next = false;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.interrupt_next = true;
            let n = buf.len().min(self.max_write);
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ClosedWriter;

    impl Write for ClosedWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_message_bytes_verbatim() {
        let mut writer = MessageWriter::new(Cursor::new(Vec::new()));
        writer.send(HELLO).unwrap();
        writer.send(PING).unwrap();

        let mut expected = HELLO.to_vec();
        expected.extend_from_slice(PING);
        assert_eq!(writer.into_inner().into_inner(), expected);
    }

    #[test]
    fn partial_and_interrupted_writes_complete() {
        let mut writer = MessageWriter::new(TrickleWriter {
            written: Vec::new(),
            max_write: 3,
            interrupt_next: true,
        });
        writer.send(HELLO).unwrap();
        assert_eq!(writer.get_ref().written, HELLO);
    }

    #[test]
    fn zero_length_write_is_closed_connection() {
        let mut writer = MessageWriter::new(ClosedWriter);
        assert!(matches!(
            writer.send(PING),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn refuses_non_message_payloads() {
        let mut writer = MessageWriter::new(Cursor::new(Vec::new()));
        assert!(matches!(
            writer.send(b"{}{}"),
            Err(FrameError::TrailingBytes { count: 2 })
        ));
        assert!(matches!(
            writer.send(b"{"),
            Err(FrameError::Incomplete { len: 1 })
        ));
        assert!(writer.into_inner().into_inner().is_empty());
    }

    #[test]
    fn oversized_payload_is_refused() {
        let cfg = FrameConfig {
            max_message_size: 4,
            ..FrameConfig::default()
        };
        let mut writer = MessageWriter::with_config(Cursor::new(Vec::new()), cfg);
        assert!(matches!(
            writer.send(HELLO),
            Err(FrameError::MessageTooLarge { max: 4, .. })
        ));
    }

    #[test]
    fn send_value_renders_tree() {
        let mut writer = MessageWriter::new(Cursor::new(Vec::new()));
        let hello = Value::Object(vec![Entry::new("command", Value::string("hello"))]);
        writer.send_value(&hello).unwrap();
        assert_eq!(writer.into_inner().into_inner(), HELLO);
    }
}
