//! Agent runtime entry point for the trawler.
//!
//! The runner connects to the game client over WebSocket, polls the latest
//! world snapshot on a fixed interval, runs one decision step per new tick,
//! and sends at most one command back. Activity labels and raw snapshots are
//! forwarded to an optional monitor.
//!
//! # Architecture
//!
//! ```text
//! client (state) --> Transport --> AgentContext --> Transport --> client (command)
//!                                       |
//!                                       +--> MonitorSink --> monitor
//! ```
//!
//! The process exits only when the client connection is lost.

mod config;
mod error;
mod monitor;
mod runner;
mod transport;

use std::path::Path;

use anyhow::Context;
use tracing::{Instrument, error, info, info_span};
use tracing_subscriber::EnvFilter;
use trawler_core::agent::AgentContext;
use trawler_core::config::{SiteConfig, TrawlerConfig};
use trawler_core::telemetry::{NoopTelemetry, TelemetrySink};
use uuid::Uuid;

use crate::config::{LogFormat, RunnerConfig};
use crate::error::RunnerError;
use crate::monitor::MonitorSink;
use crate::runner::AgentRunner;
use crate::transport::Transport;

/// Application entry point.
///
/// Initializes logging, loads configuration, connects to the client, and
/// runs the agent loop until the connection drops.
///
/// # Errors
///
/// Returns an error if startup fails or the transport is lost.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RunnerConfig::from_env()?;
    init_tracing(config.log_format);

    let run_id = Uuid::now_v7();
    let span = info_span!("run", %run_id);
    let result = run(config).instrument(span).await;
    if let Err(e) = &result {
        error!(%run_id, error = %e, "trawler-runner exiting");
    }
    result
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn run(config: RunnerConfig) -> anyhow::Result<()> {
    info!(
        ws_url = config.ws_url,
        monitor_url = ?config.monitor_url,
        poll_interval_ms = config.poll_interval.as_millis(),
        config_path = %config.config_path.display(),
        "trawler-runner starting"
    );

    let (trawler, site) = load_agent_config(&config.config_path)
        .with_context(|| format!("loading {}", config.config_path.display()))?;
    info!(site_key = %trawler.site, site = %site.name, "Site selected");

    let transport = Transport::connect(&config.ws_url).await?;

    let telemetry: Box<dyn TelemetrySink + Send> = match &config.monitor_url {
        Some(url) => Box::new(MonitorSink::spawn(url)),
        None => Box::new(NoopTelemetry),
    };
    let context = AgentContext::new(trawler.engine, site, telemetry);

    AgentRunner::new(transport, context, config.poll_interval)
        .run()
        .await?;
    Ok(())
}

/// Load the agent config file, apply overrides, and resolve the site.
fn load_agent_config(path: &Path) -> Result<(TrawlerConfig, SiteConfig), RunnerError> {
    let mut trawler = TrawlerConfig::load_or_default(path)?;
    trawler.apply_env_overrides()?;
    let site = trawler.active_site()?;
    Ok((trawler, site))
}
