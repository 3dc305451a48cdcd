//! The agent loop.
//!
//! Each iteration reads the latest snapshot, runs one context step, hands
//! any command to the transport, and sleeps for the poll interval. The loop
//! only ends when the transport is lost.

use std::time::{Duration, Instant};

use tracing::{error, info};
use trawler_core::agent::AgentContext;
use trawler_core::telemetry::TelemetrySink;

use crate::error::RunnerError;
use crate::transport::Transport;

/// Drives an [`AgentContext`] from a live [`Transport`].
#[derive(Debug)]
pub struct AgentRunner<T> {
    transport: Transport,
    context: AgentContext<T>,
    poll_interval: Duration,
}

impl<T: TelemetrySink> AgentRunner<T> {
    /// Create a runner.
    pub const fn new(transport: Transport, context: AgentContext<T>, poll_interval: Duration) -> Self {
        Self {
            transport,
            context,
            poll_interval,
        }
    }

    /// Run until the transport is lost.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::TransportLost`] when the client connection
    /// drops. This is the only way the loop ends.
    pub async fn run(mut self) -> Result<(), RunnerError> {
        info!(
            poll_interval_ms = self.poll_interval.as_millis(),
            "Agent loop started"
        );
        loop {
            if let Err(e) = self.iterate() {
                let stats = self.context.stats();
                error!(
                    error = %e,
                    state = %self.context.state(),
                    commands = stats.commands_issued,
                    deposited = stats.resources_deposited,
                    experience_gained = stats.experience_gained(),
                    "Agent loop stopped"
                );
                return Err(e);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    fn iterate(&mut self) -> Result<(), RunnerError> {
        let Some(snapshot) = self.transport.latest()? else {
            return Ok(());
        };
        let outcome = self.context.process(&snapshot, Instant::now());
        if let Some(command) = outcome.command {
            self.transport.dispatch(command)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use futures::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use tokio_tungstenite::tungstenite::Message;
    use trawler_core::config::{EngineConfig, builtin_sites};
    use trawler_core::telemetry::RecordingTelemetry;
    use trawler_types::ActivityState;

    use super::*;

    fn state_frame(tick: u64) -> Message {
        let frame = json!({
            "type": "state",
            "data": {
                "tick": tick,
                "inGame": true,
                "player": { "worldX": 3092, "worldZ": 3243, "level": 0 },
                "inventory": [
                    { "slot": 0, "id": 303, "name": "Small fishing net", "count": 1 }
                ]
            }
        });
        Message::Text(frame.to_string())
    }

    async fn wait_for_tick(runner: &AgentRunner<RecordingTelemetry>, tick: u64) -> bool {
        for _ in 0..200 {
            let latest = runner.transport.latest().unwrap();
            if latest.is_some_and(|s| s.tick == tick) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn iterate_dispatches_and_stops_on_transport_loss() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (next_tick, next_tick_rx) = oneshot::channel::<()>();
        let client = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(state_frame(1)).await.unwrap();
            next_tick_rx.await.unwrap();
            ws.send(state_frame(2)).await.unwrap();
            ws.next().await.unwrap().unwrap().into_text().unwrap()
        });

        let transport = Transport::connect(&format!("ws://{addr}")).await.unwrap();
        let site = builtin_sites().remove("draynor").unwrap();
        let context = AgentContext::new(EngineConfig::default(), site, RecordingTelemetry::new());
        let mut runner = AgentRunner::new(transport, context, Duration::from_millis(10));

        // First tick only leaves Idle.
        assert!(wait_for_tick(&runner, 1).await);
        runner.iterate().unwrap();
        assert_eq!(runner.context.state(), ActivityState::TravelToGather);
        assert_eq!(runner.context.stats().commands_issued, 0);

        // Second tick walks to the gather anchor.
        next_tick.send(()).unwrap();
        assert!(wait_for_tick(&runner, 2).await);
        runner.iterate().unwrap();
        assert_eq!(runner.context.stats().commands_issued, 1);

        let sent: Value = serde_json::from_str(&client.await.unwrap()).unwrap();
        assert_eq!(sent["type"], "walkTo");
        assert_eq!(sent["x"], 3087);
        assert_eq!(sent["z"], 3228);

        // The client is gone; the loop ends with TransportLost.
        let result = tokio::time::timeout(Duration::from_secs(5), runner.run()).await;
        assert!(matches!(result, Ok(Err(RunnerError::TransportLost(_)))));
    }
}
