//! Activity states of the decision engine.

use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// What the agent is currently trying to do.
///
/// Exactly one state is current at any time. The agent starts in
/// [`ActivityState::Idle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum ActivityState {
    /// Deciding what to do next.
    #[default]
    Idle,
    /// Walking toward the gathering site.
    TravelToGather,
    /// At the gathering site, working the nearest valid target.
    Gathering,
    /// Discarding low-value items to make room.
    UnloadExcess,
    /// Walking toward the deposit site.
    TravelToDeposit,
    /// Moving between vertical levels.
    TraverseLevels,
    /// At the deposit fixture, emptying the inventory.
    Depositing,
}

impl ActivityState {
    /// Wire name of the state.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::TravelToGather => "TRAVEL_TO_GATHER",
            Self::Gathering => "GATHERING",
            Self::UnloadExcess => "UNLOAD_EXCESS",
            Self::TravelToDeposit => "TRAVEL_TO_DEPOSIT",
            Self::TraverseLevels => "TRAVERSE_LEVELS",
            Self::Depositing => "DEPOSITING",
        }
    }
}

impl fmt::Display for ActivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_is_idle() {
        assert_eq!(ActivityState::default(), ActivityState::Idle);
    }

    #[test]
    fn display_matches_serde() {
        for state in [
            ActivityState::Idle,
            ActivityState::TravelToGather,
            ActivityState::Gathering,
            ActivityState::UnloadExcess,
            ActivityState::TravelToDeposit,
            ActivityState::TraverseLevels,
            ActivityState::Depositing,
        ] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{state}\""));
        }
    }
}
