//! Fixed messages with protocol meaning of their own.
//!
//! These are compared byte for byte, never parsed.

/// `{"command":"hello"}`: the first message an agent sends.
pub const HELLO: &[u8] = b"{i\x07commandSi\x05hello}";

/// `{"command":"ping"}`: keepalive probe; the receiver echoes it verbatim.
pub const PING: &[u8] = b"{i\x07commandSi\x04ping}";

/// `{"ping":NoOp}`: keepalive probe sent by older controllers. Also echoed.
pub const LEGACY_PING: &[u8] = b"{i\x04pingN}";

/// Whether `bytes` is one of the keepalive probes.
pub fn is_keepalive(bytes: &[u8]) -> bool {
    bytes == PING || bytes == LEGACY_PING
}
