//! Inbound messages on the snapshot channel.

use serde::Deserialize;

use crate::snapshot::WorldSnapshot;

/// A message pushed by the game client.
///
/// Unrecognized `type` values deserialize to [`InboundMessage::Unknown`]
/// so that newer clients do not break the reader.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundMessage {
    /// A fresh world snapshot.
    State {
        /// The snapshot.
        data: Box<WorldSnapshot>,
    },
    /// The client accepted a command.
    Ack {
        /// Wire name of the acknowledged command.
        #[serde(rename = "commandType", default)]
        command_type: Option<String>,
    },
    /// The client rejected a command or hit an internal error.
    Error {
        /// Error text reported by the client.
        #[serde(default)]
        message: Option<String>,
    },
    /// Any other message type.
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_state() {
        let msg: InboundMessage =
            serde_json::from_str(r#"{"type":"state","data":{"tick":5,"inGame":true}}"#).unwrap();
        assert!(matches!(msg, InboundMessage::State { ref data } if data.tick == 5));
    }

    #[test]
    fn parses_ack_and_error() {
        let ack: InboundMessage =
            serde_json::from_str(r#"{"type":"ack","commandType":"walkTo"}"#).unwrap();
        assert_eq!(
            ack,
            InboundMessage::Ack {
                command_type: Some("walkTo".to_owned())
            }
        );

        let err: InboundMessage =
            serde_json::from_str(r#"{"type":"error","message":"bad slot"}"#).unwrap();
        assert_eq!(
            err,
            InboundMessage::Error {
                message: Some("bad slot".to_owned())
            }
        );
    }

    #[test]
    fn unknown_type_is_tolerated() {
        let msg: InboundMessage = serde_json::from_str(r#"{"type":"hello"}"#).unwrap();
        assert_eq!(msg, InboundMessage::Unknown);
    }
}
