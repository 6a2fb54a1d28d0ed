//! `tokio_util` codec for use with `FramedRead`/`FramedWrite`.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_message, encode_message, FrameConfig, Message};
use crate::error::FrameError;
use crate::scan::MessageScanner;

/// Message codec with the same boundary rules as [`crate::MessageReader`].
#[derive(Debug, Clone)]
pub struct MessageCodec {
    scanner: MessageScanner,
    config: FrameConfig,
}

impl MessageCodec {
    pub fn new(config: FrameConfig) -> Self {
        Self {
            scanner: MessageScanner::new(config.max_depth),
            config,
        }
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new(FrameConfig::default())
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_message(src, &mut self.scanner, self.config.max_message_size)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            None if src.is_empty() => Ok(None),
            None => Err(FrameError::ConnectionClosed),
        }
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_message(item.as_bytes(), dst, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wellknown::{HELLO, PING};

    #[test]
    fn decodes_across_partial_buffers() {
        let mut codec = MessageCodec::default();
        let mut buf = BytesMut::from(&HELLO[..3]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&HELLO[3..]);
        buf.extend_from_slice(PING);
        assert!(codec.decode(&mut buf).unwrap().unwrap().is_hello());
        assert!(codec.decode(&mut buf).unwrap().unwrap().is_keepalive());
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn eof_mid_message_is_an_error() {
        let mut codec = MessageCodec::default();
        let mut buf = BytesMut::from(&PING[..4]);
        assert!(matches!(
            codec.decode_eof(&mut buf),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn encodes_message() {
        let mut codec = MessageCodec::default();
        let mut dst = BytesMut::new();
        codec
            .encode(Message::new(bytes::Bytes::from_static(PING)), &mut dst)
            .unwrap();
        assert_eq!(dst.as_ref(), PING);
    }
}
