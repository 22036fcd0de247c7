//! Liveness bookkeeping for one connection.

use std::time::{Duration, Instant};

/// What the read loop should do after a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeepaliveAction {
    /// Nothing is due.
    Wait,
    /// Send a ping now.
    Ping,
    /// The peer has been silent for the whole liveness window.
    Expired,
}

/// Tracks when the peer was last heard from and when we last pinged.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Keepalive {
    ping_interval: Duration,
    pong_wait: Duration,
    last_seen: Instant,
    last_ping: Instant,
}

impl Keepalive {
    pub(crate) const fn new(now: Instant, ping_interval: Duration, pong_wait: Duration) -> Self {
        Self {
            ping_interval,
            pong_wait,
            last_seen: now,
            last_ping: now,
        }
    }

    /// Records that a frame arrived.
    pub(crate) const fn observe(&mut self, now: Instant) {
        self.last_seen = now;
    }

    pub(crate) fn poll(&mut self, now: Instant) -> KeepaliveAction {
        if now.saturating_duration_since(self.last_seen) >= self.pong_wait {
            return KeepaliveAction::Expired;
        }
        if now.saturating_duration_since(self.last_ping) >= self.ping_interval {
            self.last_ping = now;
            return KeepaliveAction::Ping;
        }
        KeepaliveAction::Wait
    }

    pub(crate) const fn pong_wait(&self) -> Duration {
        self.pong_wait
    }
}
