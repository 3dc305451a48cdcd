//! Recoverable conditions the agent reports but never propagates.
//!
//! Only transport loss stops the loop, and that lives in the runner. Every
//! condition here is logged and labelled for telemetry while the loop keeps
//! running.

use trawler_types::{ActivityState, Tile};

/// A condition observed while deciding.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Condition {
    /// No required tool is carried; gathering is impossible.
    #[error("required tool missing (need one of: {})", .required.join(", "))]
    ToolMissing {
        /// Acceptable tool names.
        required: Vec<String>,
    },

    /// The snapshot carries no nearby-actor data at all.
    #[error("no nearby actors visible; waiting")]
    VisibilityDegraded,

    /// State, position, and progress have been unchanged for too long.
    #[error("stagnation detected in {state} at {position} for {ticks} ticks")]
    StagnationDetected {
        /// State the engine is stuck in.
        state: ActivityState,
        /// Where the avatar is standing.
        position: Tile,
        /// Length of the stable window.
        ticks: u32,
    },

    /// A configured anchor was implausible and has been replaced.
    #[error("implausible anchor for {site}: {from} -> {to} ({distance:.1} tiles)")]
    ConfigImplausible {
        /// Site name.
        site: String,
        /// Anchor before correction.
        from: Tile,
        /// Anchor after correction.
        to: Tile,
        /// Distance that triggered the correction.
        distance: f64,
    },

    /// The client reported an error for a message.
    #[error("upstream error: {message}")]
    UpstreamError {
        /// Error text from the client.
        message: String,
    },
}

impl Condition {
    /// Short activity label for telemetry.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::ToolMissing { .. } => "Missing gathering tool",
            Self::VisibilityDegraded => "No nearby actors visible",
            Self::StagnationDetected { .. } => "Stuck",
            Self::ConfigImplausible { .. } => "Corrected site config",
            Self::UpstreamError { .. } => "Client error",
        }
    }
}
