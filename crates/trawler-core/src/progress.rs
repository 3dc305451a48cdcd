//! Progress detection from resource and experience gains.
//!
//! A slow action that keeps succeeding shows up as rising resource counts or
//! experience. The engine uses this to avoid re-issuing interactions, and the
//! liveness monitor uses it to avoid false stuck reports.

use std::time::{Duration, Instant};

/// Tracks resource count and experience across processed ticks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressTracker {
    /// Resource count on the previous update.
    last_resource_count: u64,

    /// Experience on the previous update.
    last_experience: u64,

    /// Tick of the most recent gain. Before any gain this is the tick just
    /// before the first observation.
    last_progress_tick: Option<u64>,

    /// Wall-clock time of the most recent gain.
    last_progress_at: Option<Instant>,
}

impl ProgressTracker {
    /// Create a tracker with no baseline.
    pub const fn new() -> Self {
        Self {
            last_resource_count: 0,
            last_experience: 0,
            last_progress_tick: None,
            last_progress_at: None,
        }
    }

    /// Record this tick's counters and report whether either increased.
    ///
    /// The first call sets the baseline and returns `false`. Later calls
    /// overwrite the stored counters unconditionally, so a drop (for
    /// example after depositing) becomes the new baseline.
    pub fn update(&mut self, tick: u64, resource_count: u64, experience: u64, now: Instant) -> bool {
        let progressed = match self.last_progress_tick {
            None => {
                self.last_progress_tick = Some(tick.saturating_sub(1));
                false
            }
            Some(_) => {
                resource_count > self.last_resource_count || experience > self.last_experience
            }
        };

        if progressed {
            self.last_progress_tick = Some(tick);
            self.last_progress_at = Some(now);
        }
        self.last_resource_count = resource_count;
        self.last_experience = experience;
        progressed
    }

    /// Processed ticks elapsed since the most recent gain.
    pub fn ticks_since_progress(&self, tick: u64) -> u64 {
        self.last_progress_tick
            .map_or(0, |last| tick.saturating_sub(last))
    }

    /// Whether a gain happened within `window` of `now`.
    pub fn progressed_within(&self, now: Instant, window: Duration) -> bool {
        self.last_progress_at
            .is_some_and(|at| now.saturating_duration_since(at) < window)
    }

    /// Tick of the most recent gain, if any update has happened.
    pub const fn last_progress_tick(&self) -> Option<u64> {
        self.last_progress_tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_update_sets_baseline() {
        let now = Instant::now();
        let mut progress = ProgressTracker::new();
        assert!(!progress.update(100, 3, 500, now));
        assert_eq!(progress.last_progress_tick(), Some(99));
        assert_eq!(progress.ticks_since_progress(100), 1);
        assert!(!progress.progressed_within(now, Duration::from_secs(7)));
    }

    #[test]
    fn resource_or_experience_gain_counts() {
        let now = Instant::now();
        let mut progress = ProgressTracker::new();
        progress.update(1, 0, 100, now);
        assert!(progress.update(2, 1, 100, now));
        assert!(progress.update(3, 1, 120, now));
        assert!(!progress.update(4, 1, 120, now));
        assert_eq!(progress.last_progress_tick(), Some(3));
        assert_eq!(progress.ticks_since_progress(10), 7);
    }

    #[test]
    fn drop_becomes_new_baseline() {
        let now = Instant::now();
        let mut progress = ProgressTracker::new();
        progress.update(1, 20, 0, now);
        assert!(!progress.update(2, 0, 0, now));
        assert!(progress.update(3, 1, 0, now));
    }

    #[test]
    fn grace_window_is_wall_clock() {
        let start = Instant::now();
        let mut progress = ProgressTracker::new();
        progress.update(1, 0, 0, start);
        progress.update(2, 1, 0, start);
        let window = Duration::from_millis(7000);
        assert!(progress.progressed_within(start + Duration::from_millis(6999), window));
        assert!(!progress.progressed_within(start + Duration::from_millis(7000), window));
    }
}
