//! Messages forwarded to the optional external monitor.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::snapshot::WorldSnapshot;

/// One fire-and-forget message for the monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum TelemetryMessage {
    /// Human-readable description of what the agent is doing.
    Activity {
        /// The activity line.
        activity: String,
    },
    /// A raw copy of the snapshot the agent just received.
    State {
        /// The snapshot.
        data: Box<WorldSnapshot>,
    },
}

impl TelemetryMessage {
    /// Build an activity message.
    pub fn activity(text: impl Into<String>) -> Self {
        Self::Activity {
            activity: text.into(),
        }
    }

    /// Build a state-forwarding message from a borrowed snapshot.
    pub fn state(snapshot: &WorldSnapshot) -> Self {
        Self::State {
            data: Box::new(snapshot.clone()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn activity_wire_shape() {
        let value = serde_json::to_value(TelemetryMessage::activity("Gathering")).unwrap();
        assert_eq!(value["type"], "activity");
        assert_eq!(value["activity"], "Gathering");
    }

    #[test]
    fn state_wire_shape() {
        let snapshot = WorldSnapshot {
            tick: 9,
            in_world: true,
            ..WorldSnapshot::default()
        };
        let value = serde_json::to_value(TelemetryMessage::state(&snapshot)).unwrap();
        assert_eq!(value["type"], "state");
        assert_eq!(value["data"]["tick"], 9);
        assert_eq!(value["data"]["inGame"], true);
    }
}
