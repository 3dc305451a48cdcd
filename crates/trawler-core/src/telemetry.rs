//! Telemetry sink trait and no-op implementation.
//!
//! The agent forwards activity labels and raw snapshots to an optional
//! monitor. Delivery is best-effort: [`TelemetrySink::send`] cannot fail and
//! must not block, so a missing or slow monitor never affects decisions.
//! Environments without a monitor use [`NoopTelemetry`].

use std::sync::Mutex;

use trawler_types::TelemetryMessage;

/// A fire-and-forget destination for telemetry messages.
pub trait TelemetrySink {
    /// Hand a message to the sink. Implementations swallow their own errors.
    fn send(&self, message: TelemetryMessage);
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for Box<T> {
    fn send(&self, message: TelemetryMessage) {
        (**self).send(message);
    }
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for &T {
    fn send(&self, message: TelemetryMessage) {
        (**self).send(message);
    }
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn send(&self, _message: TelemetryMessage) {}
}

/// A sink that keeps every message in memory.
///
/// Useful for tests and for inspecting what would have been forwarded.
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    messages: Mutex<Vec<TelemetryMessage>>,
}

impl RecordingTelemetry {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every message recorded so far.
    pub fn drain(&self) -> Vec<TelemetryMessage> {
        self.messages
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .unwrap_or_default()
    }

    /// Activity labels recorded so far, without draining.
    pub fn activities(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|guard| {
                guard
                    .iter()
                    .filter_map(|m| match m {
                        TelemetryMessage::Activity { activity } => Some(activity.clone()),
                        TelemetryMessage::State { .. } => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn send(&self, message: TelemetryMessage) {
        if let Ok(mut guard) = self.messages.lock() {
            guard.push(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_accepts_anything() {
        let sink: Box<dyn TelemetrySink> = Box::new(NoopTelemetry);
        sink.send(TelemetryMessage::activity("Idle"));
    }

    #[test]
    fn recorder_keeps_order() {
        let recorder = RecordingTelemetry::new();
        recorder.send(TelemetryMessage::activity("one"));
        recorder.send(TelemetryMessage::activity("two"));
        assert_eq!(recorder.activities(), vec!["one", "two"]);
        assert_eq!(recorder.drain().len(), 2);
        assert!(recorder.drain().is_empty());
    }
}
