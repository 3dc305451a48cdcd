//! WebSocket connection to the game client.
//!
//! The client pushes JSON text frames (`state`, `ack`, `error`) and accepts
//! one JSON command per frame. A reader task keeps only the most recent
//! snapshot in a `watch` channel; a writer task drains an unbounded queue of
//! commands. The agent loop never awaits the network: it reads the latest
//! snapshot and hands commands to the queue.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};
use trawler_core::condition::Condition;
use trawler_types::{Command, InboundMessage, WorldSnapshot};

use crate::error::RunnerError;

/// Shared slot holding the most recent snapshot.
type SnapshotSlot = watch::Sender<Option<Arc<WorldSnapshot>>>;

/// Handle to a live client connection.
#[derive(Debug)]
pub struct Transport {
    snapshots: watch::Receiver<Option<Arc<WorldSnapshot>>>,
    commands: mpsc::UnboundedSender<Command>,
}

impl Transport {
    /// Connect to the client and start the reader and writer tasks.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Connect`] if the handshake fails.
    pub async fn connect(url: &str) -> Result<Self, RunnerError> {
        info!(url, "Connecting to client");
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| RunnerError::Connect(format!("failed to connect to {url}: {e}")))?;
        info!(url, "Client connection established");

        let (mut sink, mut source) = stream.split();
        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let (command_tx, mut command_rx) = mpsc::unbounded_channel::<Command>();

        tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => handle_frame(&text, &snapshot_tx),
                    Ok(Message::Close(reason)) => {
                        error!(?reason, "Client closed the connection");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(error = %e, "Client connection failed");
                        break;
                    }
                }
            }
            // Dropping the sender marks the transport as lost.
        });

        tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                let text = match serde_json::to_string(&command) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(command = command.kind.label(), error = %e, "Failed to encode command");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(text)).await {
                    warn!(error = %e, "Failed to send command");
                    break;
                }
            }
        });

        Ok(Self {
            snapshots: snapshot_rx,
            commands: command_tx,
        })
    }

    /// The most recent snapshot, if any has arrived.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::TransportLost`] once the connection is gone.
    pub fn latest(&self) -> Result<Option<Arc<WorldSnapshot>>, RunnerError> {
        self.snapshots
            .has_changed()
            .map_err(|e| RunnerError::TransportLost(format!("snapshot stream ended: {e}")))?;
        Ok(self.snapshots.borrow().clone())
    }

    /// Queue a command for sending. Does not wait for the network.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::TransportLost`] if the writer has stopped.
    pub fn dispatch(&self, command: Command) -> Result<(), RunnerError> {
        self.commands
            .send(command)
            .map_err(|e| RunnerError::TransportLost(format!("command queue closed: {e}")))
    }
}

/// Decode one text frame from the client.
///
/// # Errors
///
/// Returns [`RunnerError::Serde`] if the frame is not a known envelope.
pub fn decode_frame(text: &str) -> Result<InboundMessage, RunnerError> {
    Ok(serde_json::from_str(text)?)
}

fn handle_frame(text: &str, slot: &SnapshotSlot) {
    match decode_frame(text) {
        Ok(InboundMessage::State { data }) => {
            slot.send_replace(Some(Arc::from(data)));
        }
        Ok(InboundMessage::Ack { command_type }) => {
            debug!(command_type = ?command_type, "Client acknowledged command");
        }
        Ok(InboundMessage::Error { message }) => {
            let condition = Condition::UpstreamError {
                message: message.unwrap_or_default(),
            };
            warn!(%condition, "Client reported an error");
        }
        Ok(InboundMessage::Unknown) => {
            debug!("Ignoring unknown message type");
        }
        Err(e) => {
            warn!(error = %e, "Failed to decode client frame, skipping");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::time::Duration;

    use serde_json::{Value, json};
    use tokio::net::TcpListener;
    use trawler_types::CommandKind;

    use super::*;

    fn state_frame(tick: u64) -> String {
        json!({
            "type": "state",
            "data": {
                "tick": tick,
                "inGame": true,
                "player": { "worldX": 3092, "worldZ": 3243, "level": 0 }
            }
        })
        .to_string()
    }

    #[test]
    fn state_frame_fills_the_slot() {
        let (tx, rx) = watch::channel(None);
        handle_frame(&state_frame(41), &tx);
        handle_frame(&state_frame(42), &tx);
        let latest = rx.borrow().clone().unwrap();
        assert_eq!(latest.tick, 42);
        assert!(latest.in_world);
    }

    #[test]
    fn other_frames_leave_the_slot_alone() {
        let (tx, rx) = watch::channel(None);
        handle_frame(r#"{"type":"ack","commandType":"walkTo"}"#, &tx);
        handle_frame(r#"{"type":"error","message":"unknown npc"}"#, &tx);
        handle_frame(r#"{"type":"pong"}"#, &tx);
        handle_frame("not json", &tx);
        assert!(rx.borrow().is_none());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(decode_frame("{"), Err(RunnerError::Serde(_))));
    }

    async fn wait_for_snapshot(transport: &Transport) -> Option<Arc<WorldSnapshot>> {
        for _ in 0..200 {
            if let Some(snapshot) = transport.latest().unwrap() {
                return Some(snapshot);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        None
    }

    #[tokio::test]
    async fn round_trip_with_local_client() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::Text(state_frame(7))).await.unwrap();
            let frame = ws.next().await.unwrap().unwrap();
            frame.into_text().unwrap()
        });

        let transport = Transport::connect(&format!("ws://{addr}")).await.unwrap();
        let snapshot = wait_for_snapshot(&transport).await.unwrap();
        assert_eq!(snapshot.tick, 7);

        transport
            .dispatch(Command::new(CommandKind::TravelTo { x: 3087, z: 3228 }, "test"))
            .unwrap();
        let sent: Value = serde_json::from_str(&client.await.unwrap()).unwrap();
        assert_eq!(sent["type"], "walkTo");
        assert_eq!(sent["x"], 3087);
        assert_eq!(sent["reason"], "test");

        // The client task has ended and dropped its socket.
        let mut lost = false;
        for _ in 0..200 {
            if transport.latest().is_err() {
                lost = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(lost);
    }

    #[tokio::test]
    async fn unreachable_client_is_a_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let result = Transport::connect(&format!("ws://{addr}")).await;
        assert!(matches!(result, Err(RunnerError::Connect(_))));
    }

    // Requires a running client on the default port.
    #[tokio::test]
    #[ignore]
    async fn connect_to_default_client() {
        let transport = Transport::connect("ws://localhost:7780").await.unwrap();
        let snapshot = wait_for_snapshot(&transport).await.unwrap();
        assert!(snapshot.tick > 0);
    }
}
