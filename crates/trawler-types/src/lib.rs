//! Shared type definitions for the trawler agent.
//!
//! Everything that crosses a process boundary lives here: the world
//! snapshot the client pushes, the commands the agent sends back, and the
//! messages forwarded to the monitor. Snapshot and telemetry types flow to
//! `TypeScript` via `ts-rs` for the monitor dashboard.
//!
//! # Modules
//!
//! - [`snapshot`] -- World snapshot payload and its components
//! - [`command`] -- Outbound command set
//! - [`state`] -- Activity states of the decision engine
//! - [`telemetry`] -- Monitor messages
//! - [`wire`] -- Inbound message envelope

pub mod command;
pub mod snapshot;
pub mod state;
pub mod telemetry;
pub mod wire;

// Re-export all public types at crate root for convenience.
pub use command::{Command, CommandKind, DepositAmount, KEY_DIGIT_ZERO, KEY_ESCAPE};
pub use snapshot::{
    ContainerState, DialogOption, DialogState, InventoryItem, NearbyActor, NearbyObject,
    PlayerState, SkillState, Tile, WorldSnapshot,
};
pub use state::ActivityState;
pub use telemetry::TelemetryMessage;
pub use wire::InboundMessage;
