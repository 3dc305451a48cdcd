//! Commands the agent sends back to the game client.
//!
//! Each command serializes to a single JSON object whose `type` field names
//! the client-side handler. The agent emits at most one command per tick.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Key code that dismisses an open container interface.
pub const KEY_ESCAPE: i32 = 27;

/// Key code of the `0` digit; digit `n` is `KEY_DIGIT_ZERO + n`.
pub const KEY_DIGIT_ZERO: i32 = 48;

/// An outbound instruction together with the reason it was chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    /// What the client should do.
    #[serde(flatten)]
    pub kind: CommandKind,
    /// Human-readable explanation, used in logs and stuck diagnostics.
    pub reason: String,
    /// Wall-clock time the command was issued.
    #[serde(rename = "issuedAt")]
    pub issued_at: DateTime<Utc>,
}

impl Command {
    /// Create a command stamped with the current time.
    pub fn new(kind: CommandKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
            issued_at: Utc::now(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind.label(), self.reason)
    }
}

/// The closed set of commands the client understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CommandKind {
    /// Walk to a tile.
    #[serde(rename = "walkTo")]
    TravelTo {
        /// Destination x.
        x: i32,
        /// Destination z.
        z: i32,
    },
    /// Use an option on a nearby actor.
    #[serde(rename = "interactNpc")]
    InteractWithActor {
        /// Client-side actor index.
        #[serde(rename = "npcIndex")]
        actor_index: i32,
        /// 1-based option position.
        #[serde(rename = "optionIndex")]
        option_index: u32,
    },
    /// Use an option on a static world object.
    #[serde(rename = "interactLoc")]
    InteractWithObject {
        /// Object x.
        x: i32,
        /// Object z.
        z: i32,
        /// Object type identifier.
        #[serde(rename = "locId")]
        object_id: i32,
        /// 1-based option position.
        #[serde(rename = "optionIndex")]
        option_index: u32,
    },
    /// Drop the item in an inventory slot.
    #[serde(rename = "dropItem")]
    Drop {
        /// Inventory slot.
        slot: u32,
    },
    /// Move an inventory slot into the open container.
    #[serde(rename = "bankDeposit")]
    Deposit {
        /// Inventory slot.
        slot: u32,
        /// How much of the stack to move.
        amount: DepositAmount,
    },
    /// Pick a prompt choice by its position.
    #[serde(rename = "clickDialog")]
    ChoosePromptOption {
        /// 1-based choice position.
        #[serde(rename = "optionIndex")]
        option_index: u32,
    },
    /// Pick a prompt choice by its raw interface handle.
    #[serde(rename = "clickComponent")]
    ChoosePromptHandle {
        /// Interface handle reported on the choice.
        #[serde(rename = "componentId")]
        handle: i32,
    },
    /// Press a key.
    #[serde(rename = "sendKey")]
    SendKey {
        /// Key code.
        #[serde(rename = "keyCode")]
        key_code: i32,
    },
    /// Climb up through the nearest traversal primitive.
    #[serde(rename = "climbUp")]
    Ascend,
    /// Climb down through the nearest traversal primitive.
    #[serde(rename = "climbDown")]
    Descend,
}

impl CommandKind {
    /// Short, stable label used in logs.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::TravelTo { .. } => "travel-to",
            Self::InteractWithActor { .. } => "interact-with-actor",
            Self::InteractWithObject { .. } => "interact-with-object",
            Self::Drop { .. } => "drop",
            Self::Deposit { .. } => "deposit",
            Self::ChoosePromptOption { .. } => "choose-prompt-option",
            Self::ChoosePromptHandle { .. } => "choose-prompt-handle",
            Self::SendKey { .. } => "send-key",
            Self::Ascend => "ascend",
            Self::Descend => "descend",
        }
    }
}

/// Amount argument of a deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositAmount {
    /// The whole stack; encoded as `-1` on the wire.
    All,
    /// A specific number of items.
    Exact(u32),
}

impl Serialize for DepositAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::All => serializer.serialize_i64(-1),
            Self::Exact(n) => serializer.serialize_i64(i64::from(*n)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn wire(kind: CommandKind) -> serde_json::Value {
        serde_json::to_value(Command::new(kind, "test")).unwrap()
    }

    #[test]
    fn travel_uses_client_field_names() {
        let value = wire(CommandKind::TravelTo { x: 3087, z: 3228 });
        assert_eq!(value["type"], "walkTo");
        assert_eq!(value["x"], 3087);
        assert_eq!(value["z"], 3228);
        assert_eq!(value["reason"], "test");
        assert!(value.get("issuedAt").is_some());
    }

    #[test]
    fn interaction_carries_index_and_option() {
        let value = wire(CommandKind::InteractWithActor {
            actor_index: 12,
            option_index: 2,
        });
        assert_eq!(value["type"], "interactNpc");
        assert_eq!(value["npcIndex"], 12);
        assert_eq!(value["optionIndex"], 2);
    }

    #[test]
    fn deposit_all_is_negative_one() {
        let value = wire(CommandKind::Deposit {
            slot: 4,
            amount: DepositAmount::All,
        });
        assert_eq!(value["type"], "bankDeposit");
        assert_eq!(value["amount"], -1);

        let exact = wire(CommandKind::Deposit {
            slot: 4,
            amount: DepositAmount::Exact(5),
        });
        assert_eq!(exact["amount"], 5);
    }

    #[test]
    fn unit_commands_are_type_only() {
        let value = wire(CommandKind::Descend);
        assert_eq!(value["type"], "climbDown");
        let up = wire(CommandKind::Ascend);
        assert_eq!(up["type"], "climbUp");
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(CommandKind::SendKey { key_code: KEY_ESCAPE }.label(), "send-key");
        assert_eq!(CommandKind::Drop { slot: 0 }.label(), "drop");
    }
}
