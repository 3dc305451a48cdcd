//! Decision core for the trawler agent.
//!
//! This crate is synchronous and deterministic. It never reads a clock or
//! touches the network: callers pass the current [`Instant`] and a snapshot,
//! and get back at most one command to dispatch.
//!
//! # Modules
//!
//! - [`agent`] -- [`AgentContext`], the per-run owner of all mutable state.
//! - [`classify`] -- Name-based classification tables and option matching.
//! - [`condition`] -- Recoverable conditions reported while deciding.
//! - [`config`] -- Configuration loading from `trawler-config.yaml` into
//!   strongly-typed structs.
//! - [`engine`] -- The activity state machine.
//! - [`inventory`] -- Inventory view for the active site.
//! - [`liveness`] -- Stagnation detection.
//! - [`motion`] -- Movement derived from position deltas.
//! - [`progress`] -- Progress derived from resource and experience gains.
//! - [`telemetry`] -- [`TelemetrySink`] capability and built-in sinks.
//! - [`throttle`] -- Minimum spacing between commands.
//! - [`validator`] -- Correction of implausible site anchors.
//!
//! [`Instant`]: std::time::Instant
//! [`AgentContext`]: agent::AgentContext
//! [`TelemetrySink`]: telemetry::TelemetrySink

pub mod agent;
pub mod classify;
pub mod condition;
pub mod config;
pub mod engine;
pub mod inventory;
pub mod liveness;
pub mod motion;
pub mod progress;
pub mod telemetry;
pub mod throttle;
pub mod validator;
