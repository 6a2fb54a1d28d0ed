use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::{debug, trace};
use ubjwire_codec::{CodecConfig, CodecError, Context, Value};

use crate::error::{FrameError, Result};
use crate::scan::MessageScanner;
use crate::wellknown;

/// Default maximum message size: 16 MiB.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// One complete, self-delimiting message as received or to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    bytes: Bytes,
}

impl Message {
    /// Wrap bytes that are known to form exactly one message.
    ///
    /// Use [`Message::from_value`] or [`encode_message`] when the bytes are
    /// not already validated.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Render `value` as a message. The root must be an object or array.
    pub fn from_value(value: &Value, config: CodecConfig) -> Result<Self> {
        if !value.is_collection() {
            return Err(CodecError::InvalidRoot {
                marker: value.value_type().marker(),
            }
            .into());
        }
        let bytes = ubjwire_codec::encode_with(value, config)?;
        Ok(Self::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Parse into a fresh [`Context`] with the cursor on the root.
    pub fn parse(&self) -> std::result::Result<Context, CodecError> {
        self.parse_with(CodecConfig::default())
    }

    pub fn parse_with(&self, config: CodecConfig) -> std::result::Result<Context, CodecError> {
        let mut ctx = Context::with_config(config);
        ctx.parse(&self.bytes)?;
        Ok(ctx)
    }

    /// Decode into an owned tree.
    pub fn decode(&self) -> std::result::Result<Value, CodecError> {
        ubjwire_codec::decode(&self.bytes)
    }

    /// Whether this is a keepalive probe (current or legacy form).
    pub fn is_keepalive(&self) -> bool {
        wellknown::is_keepalive(&self.bytes)
    }

    pub fn is_hello(&self) -> bool {
        self.bytes.as_ref() == wellknown::HELLO
    }
}

impl AsRef<[u8]> for Message {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Append `payload` to `dst` after checking it is exactly one message.
///
/// Rejecting partial or concatenated payloads here keeps the peer's scanner
/// in step with message boundaries.
pub fn encode_message(payload: &[u8], dst: &mut BytesMut, config: &FrameConfig) -> Result<()> {
    if payload.len() > config.max_message_size {
        return Err(FrameError::MessageTooLarge {
            size: payload.len(),
            max: config.max_message_size,
        });
    }
    let mut scanner = MessageScanner::new(config.max_depth);
    match scanner.scan(payload)? {
        Some(len) if len == payload.len() => {}
        Some(len) => {
            return Err(FrameError::TrailingBytes {
                count: payload.len() - len,
            })
        }
        None => return Err(FrameError::Incomplete { len: payload.len() }),
    }
    dst.reserve(payload.len());
    dst.put_slice(payload);
    Ok(())
}

/// Split the first complete message off the front of `src`.
///
/// Returns `Ok(None)` while the message is still incomplete; `scanner` keeps
/// its progress so the next call only looks at new bytes. Bytes after the
/// message stay in `src`.
///
/// Errors leave `src` ready for the next call. A message over
/// `max_message_size` is dropped up to its closing marker, across as many
/// calls as it takes to arrive. Malformed input is dropped up to the bad
/// byte, and scanning resumes at the next container opening.
pub fn decode_message(
    src: &mut BytesMut,
    scanner: &mut MessageScanner,
    max_message_size: usize,
) -> Result<Option<Message>> {
    loop {
        let discarding = scanner.is_discarding();
        let scanned = match scanner.scan(src) {
            Ok(scanned) => scanned,
            Err(err) => {
                resync(src, scanner);
                return Err(err);
            }
        };

        return match scanned {
            Some(len) if discarding => {
                src.advance(len);
                debug!(len, remaining = src.len(), "dropped rest of oversized message");
                continue;
            }
            None if discarding => {
                let n = scanner.release(src.len());
                src.advance(n);
                Ok(None)
            }
            Some(len) if len > max_message_size => {
                src.advance(len);
                Err(FrameError::MessageTooLarge {
                    size: len,
                    max: max_message_size,
                })
            }
            Some(len) => {
                let bytes = src.split_to(len).freeze();
                trace!(len, remaining = src.len(), "decoded message");
                Ok(Some(Message { bytes }))
            }
            None if scanner.scanned() > max_message_size || src.len() > max_message_size => {
                let size = scanner.scanned().max(src.len());
                scanner.start_discard();
                let n = scanner.release(src.len());
                src.advance(n);
                Err(FrameError::MessageTooLarge {
                    size,
                    max: max_message_size,
                })
            }
            None => Ok(None),
        };
    }
}

/// Drop input up to and including the byte the scanner rejected, then skip
/// to the next `{` or `[`.
fn resync(src: &mut BytesMut, scanner: &mut MessageScanner) {
    let bad = (scanner.scanned() + 1).min(src.len());
    let next = src[bad..]
        .iter()
        .position(|&b| b == b'{' || b == b'[')
        .map_or(src.len(), |i| bad + i);
    src.advance(next);
    scanner.reset();
    debug!(dropped = next, remaining = src.len(), "resynchronized after malformed input");
}

/// Settings shared by [`crate::MessageReader`] and [`crate::MessageWriter`].
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum message size in bytes. Default: 16 MiB.
    pub max_message_size: usize,
    /// Maximum container nesting. Default: 128.
    pub max_depth: usize,
    /// Read timeout applied to `IpcStream` readers.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout applied to `IpcStream` writers.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_depth: ubjwire_codec::DEFAULT_MAX_DEPTH,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wellknown::{HELLO, PING};

    fn decode_all(src: &mut BytesMut) -> Vec<Message> {
        let mut scanner = MessageScanner::default();
        let mut out = Vec::new();
        while let Some(message) =
            decode_message(src, &mut scanner, DEFAULT_MAX_MESSAGE_SIZE).unwrap()
        {
            out.push(message);
        }
        out
    }

    #[test]
    fn encode_decode_roundtrip() {
        let mut buf = BytesMut::new();
        encode_message(HELLO, &mut buf, &FrameConfig::default()).unwrap();
        assert_eq!(buf.as_ref(), HELLO);

        let messages = decode_all(&mut buf);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].is_hello());
        assert!(buf.is_empty());
    }

    #[test]
    fn coalesced_messages_split_cleanly() {
        let mut buf = BytesMut::new();
        buf.put_slice(HELLO);
        buf.put_slice(PING);
        buf.put_slice(b"[i\x01");

        let messages = decode_all(&mut buf);
        assert_eq!(messages.len(), 2);
        assert!(messages[0].is_hello());
        assert!(messages[1].is_keepalive());
        assert_eq!(buf.as_ref(), b"[i\x01");
    }

    #[test]
    fn incomplete_message_waits() {
        let mut buf = BytesMut::from(&HELLO[..5]);
        let mut scanner = MessageScanner::default();
        assert!(decode_message(&mut buf, &mut scanner, DEFAULT_MAX_MESSAGE_SIZE)
            .unwrap()
            .is_none());
        assert_eq!(buf.len(), 5);

        buf.put_slice(&HELLO[5..]);
        let message = decode_message(&mut buf, &mut scanner, DEFAULT_MAX_MESSAGE_SIZE)
            .unwrap()
            .unwrap();
        assert_eq!(message.as_bytes(), HELLO);
    }

    #[test]
    fn oversized_message_is_rejected() {
        let mut buf = BytesMut::from(&b"[Si\x7f"[..]);
        buf.put_slice(&[b'x'; 20]);
        let mut scanner = MessageScanner::default();
        assert!(matches!(
            decode_message(&mut buf, &mut scanner, 16),
            Err(FrameError::MessageTooLarge { max: 16, .. })
        ));
        assert!(buf.is_empty());
        assert!(scanner.is_discarding());
    }

    #[test]
    fn complete_oversized_message_drops_only_itself() {
        let mut buf = BytesMut::from(&b"[Si\x14"[..]);
        buf.put_slice(&[b'x'; 20]);
        buf.put_slice(b"]");
        buf.put_slice(PING);
        let mut scanner = MessageScanner::default();

        assert!(matches!(
            decode_message(&mut buf, &mut scanner, 16),
            Err(FrameError::MessageTooLarge { size: 25, max: 16 })
        ));
        let next = decode_message(&mut buf, &mut scanner, 32).unwrap().unwrap();
        assert!(next.is_keepalive());
        assert!(buf.is_empty());
    }

    #[test]
    fn oversized_string_contents_are_never_framed() {
        const STOP: &[u8] = b"{i\x07commandSi\x04stop}";
        let mut payload = vec![b'.'; 600];
        payload[507..507 + STOP.len()].copy_from_slice(STOP);
        let mut wire = b"[SI\x02\x58".to_vec();
        wire.extend_from_slice(&payload);
        wire.push(b']');
        wire.extend_from_slice(PING);

        let mut src = BytesMut::new();
        let mut scanner = MessageScanner::default();
        let mut delivered = Vec::new();
        let mut too_large = 0;
        for chunk in wire.chunks(256) {
            src.put_slice(chunk);
            loop {
                match decode_message(&mut src, &mut scanner, 300) {
                    Ok(Some(message)) => delivered.push(message),
                    Ok(None) => break,
                    Err(FrameError::MessageTooLarge { size: 605, max: 300 }) => too_large += 1,
                    Err(err) => panic!("unexpected error: {err}"),
                }
            }
        }

        assert_eq!(too_large, 1);
        assert_eq!(delivered.len(), 1);
        assert!(delivered[0].is_keepalive());
        assert!(src.is_empty());
        assert!(scanner.is_idle());
    }

    #[test]
    fn malformed_message_keeps_what_follows() {
        let mut buf = BytesMut::from(&b"[H]"[..]);
        buf.put_slice(PING);
        buf.put_slice(b"Z[Z]");
        let mut scanner = MessageScanner::default();

        assert!(matches!(
            decode_message(&mut buf, &mut scanner, DEFAULT_MAX_MESSAGE_SIZE),
            Err(FrameError::InvalidMarker { marker: b'H', offset: 1 })
        ));
        assert!(buf.starts_with(PING));

        let ping = decode_message(&mut buf, &mut scanner, DEFAULT_MAX_MESSAGE_SIZE)
            .unwrap()
            .unwrap();
        assert!(ping.is_keepalive());

        assert!(matches!(
            decode_message(&mut buf, &mut scanner, DEFAULT_MAX_MESSAGE_SIZE),
            Err(FrameError::InvalidStart { byte: b'Z' })
        ));
        assert_eq!(decode_all(&mut buf)[0].as_bytes(), b"[Z]");
    }

    #[test]
    fn encode_rejects_partial_or_extra_bytes() {
        let cfg = FrameConfig::default();
        let mut dst = BytesMut::new();
        assert!(encode_message(b"[Z", &mut dst, &cfg).is_err());
        assert!(encode_message(b"[][]", &mut dst, &cfg).is_err());
        assert!(encode_message(b"Z", &mut dst, &cfg).is_err());
        assert!(dst.is_empty());
    }

    #[test]
    fn message_parses_into_context() {
        let message = Message::new(Bytes::from_static(PING));
        let ctx = message.parse().unwrap();
        let (key, command) = ctx.read_kv_pair_as::<&str>().unwrap();
        assert_eq!(key, b"command");
        assert_eq!(command, "ping");
    }

    #[test]
    fn from_value_requires_container_root() {
        assert!(Message::from_value(&Value::Null, CodecConfig::default()).is_err());
        let message = Message::from_value(&Value::empty_array(), CodecConfig::default()).unwrap();
        assert_eq!(message.as_bytes(), b"[]");
    }
}
