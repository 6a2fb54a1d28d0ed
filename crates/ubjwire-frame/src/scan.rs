//! Incremental message boundary detection.
//!
//! Messages carry no length prefix. A message ends when its root container
//! closes, so the scanner follows the value grammar token by token and only
//! counts `{`/`[`/`}`/`]` bytes that sit in tag position. String and numeric
//! payloads are skipped by length, so bracket bytes inside them are data.
//!
//! Scanning is resumable. A token whose length header is not fully buffered
//! yet is left unconsumed and retried on the next call with more bytes; once
//! the header is known the scan position may run ahead of the buffered bytes.
//!
//! An oversized message is dropped in discard mode: the scanner keeps its
//! container state while the caller releases the bytes already scanned, until
//! the message's real closing marker has gone by.

use crate::error::{FrameError, Result};

/// Parser state for one open container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Array,
    /// Object expecting a key or `}`.
    ObjectKey,
    /// Object expecting the value for the key just read.
    ObjectValue,
}

/// Outcome of looking at the token that starts at the scan position.
enum Step {
    /// The token is complete; advance by this many bytes.
    Advance(usize),
    /// More bytes are needed before the token can be consumed.
    Incomplete,
}

/// Resumable scanner over a growing receive buffer.
#[derive(Debug, Clone)]
pub struct MessageScanner {
    /// Bytes of the current message consumed as tokens. May exceed the
    /// buffered length while a payload is still arriving.
    pos: usize,
    stack: Vec<Level>,
    max_depth: usize,
    /// The current message is being dropped rather than returned.
    discarding: bool,
}

impl Default for MessageScanner {
    fn default() -> Self {
        Self::new(ubjwire_codec::DEFAULT_MAX_DEPTH)
    }
}

impl MessageScanner {
    pub fn new(max_depth: usize) -> Self {
        Self {
            pos: 0,
            stack: Vec::new(),
            max_depth,
            discarding: false,
        }
    }

    /// Continue scanning `buf`, which starts at the first byte of the current
    /// message and holds at least the bytes seen by previous calls.
    ///
    /// Returns the length of the message once its root container closes. The
    /// scanner is then reset for the message that follows.
    pub fn scan(&mut self, buf: &[u8]) -> Result<Option<usize>> {
        while self.pos < buf.len() {
            let rest = &buf[self.pos..];
            match self.step(rest)? {
                Step::Advance(n) => self.pos += n,
                Step::Incomplete => return Ok(None),
            }
            if self.stack.is_empty() {
                let len = self.pos;
                self.reset();
                return Ok(Some(len));
            }
        }
        Ok(None)
    }

    /// Bytes of the current message consumed so far.
    pub fn scanned(&self) -> usize {
        self.pos
    }

    /// Open containers in the current message.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Whether the scanner is between messages.
    pub fn is_idle(&self) -> bool {
        self.pos == 0 && self.stack.is_empty()
    }

    /// Forget any partially scanned message.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.stack.clear();
        self.discarding = false;
    }

    /// Whether the current message is being dropped.
    pub fn is_discarding(&self) -> bool {
        self.discarding
    }

    /// Drop the rest of the current message. The container state is kept so
    /// the real end of the message is still found.
    pub fn start_discard(&mut self) {
        self.discarding = true;
    }

    /// Release scanned bytes from the front of a buffer holding `buffered`
    /// bytes. Returns how many bytes the caller should drop; the scan position
    /// moves back by the same amount.
    pub fn release(&mut self, buffered: usize) -> usize {
        let n = self.pos.min(buffered);
        self.pos -= n;
        n
    }

    fn step(&mut self, rest: &[u8]) -> Result<Step> {
        let offset = self.pos;
        let byte = rest[0];

        let Some(level) = self.stack.last().copied() else {
            return match byte {
                b'{' => self.open(Level::ObjectKey),
                b'[' => self.open(Level::Array),
                _ => Err(FrameError::InvalidStart { byte }),
            };
        };

        match (level, byte) {
            (Level::Array, b']') | (Level::ObjectKey, b'}') => {
                self.stack.pop();
                Ok(Step::Advance(1))
            }
            (Level::ObjectKey, _) => {
                let step = length_prefixed(rest, offset)?;
                if let Step::Advance(_) = step {
                    self.set_top(Level::ObjectValue);
                }
                Ok(step)
            }
            (Level::ObjectValue, _) => {
                let object = self.stack.len() - 1;
                let step = self.value(rest, offset)?;
                // A nested container hands control back to this object at a key.
                if let Step::Advance(_) = step {
                    self.stack[object] = Level::ObjectKey;
                }
                Ok(step)
            }
            (Level::Array, _) => self.value(rest, offset),
        }
    }

    /// One value in tag position: a scalar, a string, or a container opening.
    fn value(&mut self, rest: &[u8], offset: usize) -> Result<Step> {
        let marker = rest[0];
        let width = match marker {
            b'Z' | b'N' | b'T' | b'F' => 0,
            b'i' | b'U' | b'C' => 1,
            b'I' => 2,
            b'l' | b'd' => 4,
            b'L' | b'D' => 8,
            b'S' => {
                return Ok(match length_prefixed(&rest[1..], offset + 1)? {
                    Step::Advance(n) => Step::Advance(1 + n),
                    Step::Incomplete => Step::Incomplete,
                });
            }
            b'{' => return self.open(Level::ObjectKey),
            b'[' => return self.open(Level::Array),
            _ => return Err(FrameError::InvalidMarker { marker, offset }),
        };
        Ok(Step::Advance(1 + width))
    }

    fn open(&mut self, level: Level) -> Result<Step> {
        if self.stack.len() >= self.max_depth {
            return Err(FrameError::DepthExceeded {
                max: self.max_depth,
            });
        }
        self.stack.push(level);
        Ok(Step::Advance(1))
    }

    fn set_top(&mut self, level: Level) {
        if let Some(top) = self.stack.last_mut() {
            *top = level;
        }
    }
}

/// A length scalar followed by that many payload bytes (strings and keys).
fn length_prefixed(rest: &[u8], offset: usize) -> Result<Step> {
    let Some(&marker) = rest.first() else {
        return Ok(Step::Incomplete);
    };
    let width = match marker {
        b'i' | b'U' => 1,
        b'I' => 2,
        b'l' => 4,
        b'L' => 8,
        _ => return Err(FrameError::InvalidMarker { marker, offset }),
    };
    let Some(raw) = rest.get(1..1 + width) else {
        return Ok(Step::Incomplete);
    };

    let len: i64 = match marker {
        b'i' => i64::from(raw[0] as i8),
        b'U' => i64::from(raw[0]),
        b'I' => i64::from(i16::from_be_bytes([raw[0], raw[1]])),
        b'l' => i64::from(i32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]])),
        _ => {
            let mut be = [0u8; 8];
            be.copy_from_slice(raw);
            i64::from_be_bytes(be)
        }
    };
    let len = usize::try_from(len).map_err(|_| FrameError::InvalidLength { offset })?;

    let total = (1 + width)
        .checked_add(len)
        .ok_or(FrameError::InvalidLength { offset })?;
    Ok(Step::Advance(total))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &[u8] = b"{i\x07commandSi\x05hello}";

    fn scan_all(bytes: &[u8]) -> Result<Option<usize>> {
        MessageScanner::default().scan(bytes)
    }

    #[test]
    fn finds_end_of_single_message() {
        assert_eq!(scan_all(HELLO).unwrap(), Some(HELLO.len()));
        assert_eq!(scan_all(b"[]").unwrap(), Some(2));
        assert_eq!(scan_all(b"{}").unwrap(), Some(2));
    }

    #[test]
    fn stops_at_first_message_boundary() {
        let mut wire = HELLO.to_vec();
        wire.extend_from_slice(b"[Z]");
        assert_eq!(scan_all(&wire).unwrap(), Some(HELLO.len()));
    }

    #[test]
    fn resumes_byte_by_byte() {
        let mut scanner = MessageScanner::default();
        for end in 1..HELLO.len() {
            assert_eq!(scanner.scan(&HELLO[..end]).unwrap(), None, "prefix {end}");
        }
        assert_eq!(scanner.scan(HELLO).unwrap(), Some(HELLO.len()));
        assert!(scanner.is_idle());
    }

    #[test]
    fn brackets_in_payloads_are_skipped() {
        // Key "}", string value "]]", int8 0x7d ('}'), int16 0x5d7d.
        let wire = b"{i\x01}Si\x02]]i\x01ai\x7di\x01bI\x5d\x7d}";
        assert_eq!(scan_all(wire).unwrap(), Some(wire.len()));
        assert_eq!(scan_all(&wire[..wire.len() - 1]).unwrap(), None);
    }

    #[test]
    fn nested_containers_in_objects() {
        let wire = b"{i\x06artist[Si\x01ASi\x01B]i\x01o{i\x01x[]}i\x01nZ}";
        assert_eq!(scan_all(wire).unwrap(), Some(wire.len()));
    }

    #[test]
    fn rejects_non_container_start() {
        assert!(matches!(
            scan_all(b"Si\x01a"),
            Err(FrameError::InvalidStart { byte: b'S' })
        ));
    }

    #[test]
    fn rejects_unknown_marker_and_missing_value() {
        assert!(matches!(
            scan_all(b"[H]"),
            Err(FrameError::InvalidMarker {
                marker: b'H',
                offset: 1
            })
        ));
        assert!(matches!(
            scan_all(b"{i\x01k}"),
            Err(FrameError::InvalidMarker { marker: b'}', .. })
        ));
    }

    #[test]
    fn rejects_negative_length() {
        assert!(matches!(
            scan_all(b"[Si\xff"),
            Err(FrameError::InvalidLength { offset: 2 })
        ));
    }

    #[test]
    fn depth_limit() {
        let mut scanner = MessageScanner::new(2);
        assert_eq!(scanner.scan(b"[[]]").unwrap(), Some(4));
        assert!(matches!(
            scanner.scan(b"[[["),
            Err(FrameError::DepthExceeded { max: 2 })
        ));
    }

    #[test]
    fn long_string_split_across_reads() {
        let mut wire = b"[SI\x01\x2c".to_vec();
        wire.extend(std::iter::repeat(b'}').take(300));
        wire.push(b']');

        let mut scanner = MessageScanner::default();
        assert_eq!(scanner.scan(&wire[..100]).unwrap(), None);
        assert_eq!(scanner.scanned(), 305);
        assert_eq!(scanner.scan(&wire[..wire.len() - 1]).unwrap(), None);
        assert_eq!(scanner.scan(&wire).unwrap(), Some(wire.len()));
    }

    #[test]
    fn split_length_header_waits() {
        let mut scanner = MessageScanner::default();
        assert_eq!(scanner.scan(b"[SI\x01").unwrap(), None);
        assert_eq!(scanner.scanned(), 1);
        assert_eq!(scanner.scan(b"[SI\x01\x00").unwrap(), None);
        assert_eq!(scanner.scanned(), 1 + 4 + 256);
    }

    #[test]
    fn release_keeps_container_state() {
        let mut wire = b"[SI\x01\x00".to_vec();
        wire.extend(std::iter::repeat(b'[').take(256));
        wire.push(b']');

        let mut scanner = MessageScanner::default();
        scanner.start_discard();
        assert_eq!(scanner.scan(&wire[..100]).unwrap(), None);
        assert_eq!(scanner.release(100), 100);
        assert_eq!(scanner.depth(), 1);
        assert!(scanner.is_discarding());

        let rest = &wire[100..];
        assert_eq!(scanner.scan(rest).unwrap(), Some(rest.len()));
        assert!(!scanner.is_discarding());
        assert!(scanner.is_idle());
    }
}
