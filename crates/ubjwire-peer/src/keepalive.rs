//! Keepalive probes.
//!
//! Either side may send a probe; the receiver echoes the identical bytes.
//! A side that has a probe outstanding treats the matching bytes as the echo
//! and does not answer them, so a probe is never bounced back and forth.

use std::time::{Duration, Instant};

pub use ubjwire_frame::{is_keepalive, LEGACY_PING, PING};

/// Default interval between probes.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(1);
/// Default time allowed for an echo to arrive.
pub const DEFAULT_KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(1);

/// What to do with a received probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeAction {
    /// It answers our outstanding probe.
    Echoed,
    /// It is the peer's probe; send the same bytes back.
    Reply,
}

/// Tracks the one probe this side may have outstanding.
#[derive(Debug, Clone, Default)]
pub struct Keepalive {
    pending: Option<Pending>,
    last_echo: Option<Instant>,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    probe: &'static [u8],
    sent_at: Instant,
}

impl Keepalive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `probe` was sent at `now`.
    pub fn sent(&mut self, probe: &'static [u8], now: Instant) {
        self.pending = Some(Pending {
            probe,
            sent_at: now,
        });
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Classify a received keepalive message.
    ///
    /// Probes carry no sender identity, so a peer probe that crosses our own
    /// outstanding one on the wire is taken as its echo and goes unanswered.
    /// When both sides probe at once each counts the other's probe as proof
    /// of life; each side's echo timeout still applies to the next probe.
    pub fn on_probe(&mut self, bytes: &[u8], now: Instant) -> ProbeAction {
        match self.pending {
            Some(pending) if pending.probe == bytes => {
                self.pending = None;
                self.last_echo = Some(now);
                ProbeAction::Echoed
            }
            _ => ProbeAction::Reply,
        }
    }

    /// Whether the outstanding probe has waited longer than `timeout`.
    pub fn expired(&self, timeout: Duration, now: Instant) -> bool {
        self.pending
            .is_some_and(|pending| now.saturating_duration_since(pending.sent_at) > timeout)
    }

    /// Round-trip proof of the last successful probe.
    pub fn last_echo(&self) -> Option<Instant> {
        self.last_echo
    }

    /// Forget an outstanding probe.
    pub fn clear(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_probe_comes_back_as_echo() {
        let now = Instant::now();
        let mut keepalive = Keepalive::new();
        keepalive.sent(PING, now);
        assert!(keepalive.is_pending());

        assert_eq!(keepalive.on_probe(PING, now), ProbeAction::Echoed);
        assert!(!keepalive.is_pending());
        assert_eq!(keepalive.last_echo(), Some(now));

        // With nothing outstanding the same bytes are the peer's probe.
        assert_eq!(keepalive.on_probe(PING, now), ProbeAction::Reply);
    }

    #[test]
    fn crossed_probes_count_as_echoes() {
        let now = Instant::now();
        let mut ours = Keepalive::new();
        let mut theirs = Keepalive::new();
        ours.sent(PING, now);
        theirs.sent(PING, now);

        assert_eq!(ours.on_probe(PING, now), ProbeAction::Echoed);
        assert_eq!(theirs.on_probe(PING, now), ProbeAction::Echoed);
        assert!(!ours.is_pending() && !theirs.is_pending());
    }

    #[test]
    fn legacy_probe_is_answered_while_waiting() {
        let now = Instant::now();
        let mut keepalive = Keepalive::new();
        keepalive.sent(PING, now);
        assert_eq!(keepalive.on_probe(LEGACY_PING, now), ProbeAction::Reply);
        assert!(keepalive.is_pending());
    }

    #[test]
    fn expiry() {
        let start = Instant::now();
        let mut keepalive = Keepalive::new();
        assert!(!keepalive.expired(Duration::ZERO, start));

        keepalive.sent(PING, start);
        let timeout = Duration::from_millis(100);
        assert!(!keepalive.expired(timeout, start + Duration::from_millis(50)));
        assert!(keepalive.expired(timeout, start + Duration::from_millis(150)));

        keepalive.clear();
        assert!(!keepalive.expired(timeout, start + Duration::from_millis(150)));
    }
}
