//! Stagnation detection.
//!
//! The agent is stuck when its state, its position, and its measurable
//! progress have all been unchanged for longer than a threshold while it is
//! neither animating a gather nor looking at an open deposit container.
//! Each contiguous stuck span is one episode and is reported once. The
//! monitor only observes; it never changes what the engine does.

/// Per-tick signals the monitor needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessInput {
    /// Processed tick number.
    pub tick: u64,
    /// The engine changed state during this tick.
    pub state_changed: bool,
    /// Consecutive processed ticks at the same position.
    pub position_stable_ticks: u32,
    /// Ticks since the last resource or experience gain.
    pub ticks_since_progress: u64,
    /// The avatar is playing a gathering animation.
    pub gathering_animation: bool,
    /// The deposit container is open.
    pub container_open: bool,
}

/// The counters at the moment an episode began.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StuckEpisode {
    /// Tick the episode was detected on.
    pub tick: u64,
    /// Consecutive processed ticks in the same state.
    pub stable_state_ticks: u32,
    /// Consecutive processed ticks at the same position.
    pub position_stable_ticks: u32,
    /// Ticks since the last gain.
    pub ticks_since_progress: u64,
}

/// Computes the stuck predicate and de-duplicates reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivenessMonitor {
    /// Stability threshold in ticks.
    threshold: u32,

    /// Consecutive processed ticks without a state change.
    stable_state_ticks: u32,

    /// An episode has been reported and has not ended yet.
    episode_open: bool,

    /// Tick of the last report.
    last_reported_tick: Option<u64>,
}

impl LivenessMonitor {
    /// Create a monitor with the given threshold.
    pub const fn new(threshold: u32) -> Self {
        Self {
            threshold,
            stable_state_ticks: 0,
            episode_open: false,
            last_reported_tick: None,
        }
    }

    /// Feed one processed tick. Returns an episode the first time the agent
    /// is found stuck; nothing while the same episode continues.
    pub fn observe(&mut self, input: LivenessInput) -> Option<StuckEpisode> {
        self.stable_state_ticks = if input.state_changed {
            0
        } else {
            self.stable_state_ticks.saturating_add(1)
        };

        let stuck = self.stable_state_ticks >= self.threshold
            && input.position_stable_ticks >= self.threshold
            && input.ticks_since_progress > u64::from(self.threshold)
            && !input.gathering_animation
            && !input.container_open;

        if !stuck {
            self.episode_open = false;
            return None;
        }
        if self.episode_open || self.last_reported_tick == Some(input.tick) {
            return None;
        }

        self.episode_open = true;
        self.last_reported_tick = Some(input.tick);
        Some(StuckEpisode {
            tick: input.tick,
            stable_state_ticks: self.stable_state_ticks,
            position_stable_ticks: input.position_stable_ticks,
            ticks_since_progress: input.ticks_since_progress,
        })
    }

    /// Consecutive processed ticks without a state change.
    pub const fn stable_state_ticks(&self) -> u32 {
        self.stable_state_ticks
    }

    /// Configured threshold.
    pub const fn threshold(&self) -> u32 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A tick where nothing changes, `k` ticks into a fresh window.
    fn idle_tick(k: u32) -> LivenessInput {
        LivenessInput {
            tick: 1000 + u64::from(k),
            state_changed: false,
            position_stable_ticks: k,
            ticks_since_progress: u64::from(k),
            gathering_animation: false,
            container_open: false,
        }
    }

    #[test]
    fn fires_once_on_twenty_sixth_tick() {
        let mut monitor = LivenessMonitor::new(25);
        let mut fired = Vec::new();
        for k in 1..=40 {
            if let Some(episode) = monitor.observe(idle_tick(k)) {
                fired.push(episode.tick);
            }
        }
        assert_eq!(fired, vec![1026]);
    }

    #[test]
    fn gathering_animation_is_never_stuck() {
        let mut monitor = LivenessMonitor::new(25);
        for k in 1..=40 {
            let input = LivenessInput {
                gathering_animation: true,
                ..idle_tick(k)
            };
            assert!(monitor.observe(input).is_none());
        }
    }

    #[test]
    fn open_container_is_never_stuck() {
        let mut monitor = LivenessMonitor::new(25);
        for k in 1..=40 {
            let input = LivenessInput {
                container_open: true,
                ..idle_tick(k)
            };
            assert!(monitor.observe(input).is_none());
        }
    }

    #[test]
    fn episode_reopens_after_reset() {
        let mut monitor = LivenessMonitor::new(3);
        let mut fired = 0;
        for k in 1..=6 {
            if monitor.observe(idle_tick(k)).is_some() {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);

        // A state change ends the episode.
        let reset = LivenessInput {
            state_changed: true,
            ..idle_tick(7)
        };
        assert!(monitor.observe(reset).is_none());
        assert_eq!(monitor.stable_state_ticks(), 0);

        for k in 8..=11 {
            if monitor.observe(idle_tick(k)).is_some() {
                fired += 1;
            }
        }
        assert_eq!(fired, 2);
    }

    #[test]
    fn same_tick_is_reported_once() {
        let mut monitor = LivenessMonitor::new(1);
        let input = LivenessInput {
            tick: 5,
            state_changed: false,
            position_stable_ticks: 5,
            ticks_since_progress: 5,
            gathering_animation: false,
            container_open: false,
        };
        assert!(monitor.observe(input).is_some());
        // Force the episode closed, then replay the same tick.
        let calm = LivenessInput {
            container_open: true,
            ..input
        };
        assert!(monitor.observe(calm).is_none());
        assert!(monitor.observe(input).is_none());
    }
}
