//! Minimum wall-clock spacing between outgoing commands.
//!
//! A blocked command is dropped, not queued: the next tick re-derives what
//! to do from the newest snapshot.

use std::time::{Duration, Instant};

/// Gate that admits at most one command per interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooldownThrottle {
    /// Required spacing between commands.
    interval: Duration,

    /// When the last command was handed off.
    last_sent: Option<Instant>,
}

impl CooldownThrottle {
    /// Create an open throttle with the given spacing.
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_sent: None,
        }
    }

    /// Whether a command may be sent at `now`.
    pub fn can_send(&self, now: Instant) -> bool {
        self.last_sent
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval)
    }

    /// Record that a command was sent at `now`.
    pub const fn mark_sent(&mut self, now: Instant) {
        self.last_sent = Some(now);
    }

    /// Time left until the throttle opens again.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.last_sent.map_or(Duration::ZERO, |last| {
            self.interval
                .saturating_sub(now.saturating_duration_since(last))
        })
    }

    /// Configured spacing.
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}
