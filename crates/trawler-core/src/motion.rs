//! Movement detection from positional deltas.
//!
//! The client exposes an "is moving" flag, but it is unreliable. The only
//! signal used here is whether the reported position changed between two
//! processed ticks.

use trawler_types::Tile;

/// Tracks avatar position across processed ticks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MotionTracker {
    /// Position seen on the previous processed tick.
    last_position: Option<Tile>,

    /// Result of the most recent update.
    moved_this_tick: bool,

    /// Consecutive processed ticks without a position change, including
    /// the first observation.
    stationary_ticks: u32,
}

impl MotionTracker {
    /// Create a tracker that has not seen any position yet.
    pub const fn new() -> Self {
        Self {
            last_position: None,
            moved_this_tick: false,
            stationary_ticks: 0,
        }
    }

    /// Record a position and report whether it differs from the last one.
    ///
    /// The first call always returns `false`.
    pub fn update(&mut self, position: Tile) -> bool {
        let moved = self.last_position.is_some_and(|last| last != position);
        self.last_position = Some(position);
        self.moved_this_tick = moved;
        self.stationary_ticks = if moved {
            0
        } else {
            self.stationary_ticks.saturating_add(1)
        };
        moved
    }

    /// Whether the most recent update saw movement.
    pub const fn moved_this_tick(&self) -> bool {
        self.moved_this_tick
    }

    /// Consecutive processed ticks at the same position.
    pub const fn stationary_ticks(&self) -> u32 {
        self.stationary_ticks
    }

    /// Position seen on the most recent update.
    pub const fn last_position(&self) -> Option<Tile> {
        self.last_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_never_moves() {
        let mut motion = MotionTracker::new();
        assert!(!motion.update(Tile::new(10, 10)));
        assert_eq!(motion.stationary_ticks(), 1);
        assert_eq!(motion.last_position(), Some(Tile::new(10, 10)));
    }

    #[test]
    fn moved_equals_position_changed() {
        let path = [
            Tile::new(0, 0),
            Tile::new(0, 0),
            Tile::new(1, 0),
            Tile::new(1, 1),
            Tile::new(1, 1),
            Tile::new(1, 1),
            Tile::new(0, 1),
        ];
        let mut motion = MotionTracker::new();
        let mut previous: Option<Tile> = None;
        for tile in path {
            let expected = previous.is_some_and(|p| p != tile);
            assert_eq!(motion.update(tile), expected);
            assert_eq!(motion.moved_this_tick(), expected);
            previous = Some(tile);
        }
    }

    #[test]
    fn stationary_counter_resets_on_movement() {
        let mut motion = MotionTracker::new();
        for _ in 0..5 {
            motion.update(Tile::new(3, 3));
        }
        assert_eq!(motion.stationary_ticks(), 5);
        motion.update(Tile::new(3, 4));
        assert_eq!(motion.stationary_ticks(), 0);
        motion.update(Tile::new(3, 4));
        assert_eq!(motion.stationary_ticks(), 1);
    }
}
