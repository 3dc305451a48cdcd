//! Best-effort forwarding of telemetry to the external monitor.
//!
//! [`MonitorSink`] queues messages on a bounded channel and never waits. A
//! background task makes one connection attempt and forwards whatever it
//! receives. When the monitor is unreachable, or the queue is full, messages
//! are dropped.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};
use trawler_core::telemetry::TelemetrySink;
use trawler_types::TelemetryMessage;

/// Queue depth between the agent loop and the forwarding task.
const QUEUE_CAPACITY: usize = 64;

/// Telemetry sink backed by a WebSocket connection to the monitor.
#[derive(Debug, Clone)]
pub struct MonitorSink {
    queue: mpsc::Sender<TelemetryMessage>,
}

impl MonitorSink {
    /// Start forwarding to `url` in the background.
    pub fn spawn(url: &str) -> Self {
        let (queue, receiver) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(forward(url.to_owned(), receiver));
        Self { queue }
    }
}

impl TelemetrySink for MonitorSink {
    fn send(&self, message: TelemetryMessage) {
        // Full or closed: the monitor is optional, drop the message.
        let _ = self.queue.try_send(message);
    }
}

async fn forward(url: String, mut receiver: mpsc::Receiver<TelemetryMessage>) {
    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            debug!(url = %url, error = %e, "Monitor unavailable; telemetry disabled");
            while receiver.recv().await.is_some() {}
            return;
        }
    };
    info!(url = %url, "Connected to monitor");

    let (mut sink, _) = stream.split();
    while let Some(message) = receiver.recv().await {
        let Ok(text) = serde_json::to_string(&message) else {
            continue;
        };
        if let Err(e) = sink.send(Message::Text(text)).await {
            debug!(error = %e, "Monitor connection lost; telemetry disabled");
            break;
        }
    }
    while receiver.recv().await.is_some() {}
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::Value;
    use tokio::net::TcpListener;

    use super::*;

    #[test]
    fn full_queue_drops_without_blocking() {
        let (queue, mut receiver) = mpsc::channel(1);
        let sink = MonitorSink { queue };
        sink.send(TelemetryMessage::activity("first"));
        sink.send(TelemetryMessage::activity("second"));
        assert_eq!(
            receiver.try_recv().unwrap(),
            TelemetryMessage::activity("first")
        );
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn closed_queue_is_ignored() {
        let (queue, receiver) = mpsc::channel(1);
        drop(receiver);
        let sink = MonitorSink { queue };
        sink.send(TelemetryMessage::activity("nobody listening"));
    }

    #[tokio::test]
    async fn forwards_to_local_monitor() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let monitor = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.next().await.unwrap().unwrap().into_text().unwrap()
        });

        let sink = MonitorSink::spawn(&format!("ws://{addr}"));
        sink.send(TelemetryMessage::activity("Walking to Draynor Village (32 tiles)"));

        let received: Value = serde_json::from_str(&monitor.await.unwrap()).unwrap();
        assert_eq!(received["type"], "activity");
        assert_eq!(received["activity"], "Walking to Draynor Village (32 tiles)");
    }
}
