use room_negotiation::{SignalingMessage, SignalingPort};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{error, trace, warn};

use crate::error::ClientError;

/// Queues outgoing messages as JSON lines for the transport loop to flush.
#[derive(Clone)]
pub struct ChannelSignaling {
    outgoing: UnboundedSender<String>,
}

impl ChannelSignaling {
    pub fn new(outgoing: UnboundedSender<String>) -> Self {
        Self { outgoing }
    }

    /// Signaling port plus the receiving end the transport reads from.
    pub fn channel() -> (Self, UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl SignalingPort for ChannelSignaling {
    fn send(&self, message: SignalingMessage) {
        let kind = message.kind();
        let line = match serde_json::to_string(&message) {
            Ok(line) => line,
            Err(e) => {
                error!(kind, error = %e, "failed to encode signaling message");
                return;
            }
        };
        trace!(kind, %line, "queueing signaling message");
        if self.outgoing.send(line).is_err() {
            warn!(kind, "signaling channel closed, dropping message");
        }
    }
}

/// Decodes one inbound line.
pub fn parse_inbound(line: &str) -> Result<SignalingMessage, ClientError> {
    Ok(serde_json::from_str(line.trim())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use room_negotiation::negotiation::signaling::ByeMessage;

    #[test]
    fn test_send_queues_json_line() {
        let (signaling, mut rx) = ChannelSignaling::channel();
        signaling.send(SignalingMessage::Bye(ByeMessage {
            mid: "alice".to_string(),
            rid: "room-1".to_string(),
            target: None,
        }));

        let line = rx.try_recv().unwrap();
        assert_eq!(line, r#"{"type":"bye","mid":"alice","rid":"room-1"}"#);
        assert_eq!(parse_inbound(&line).unwrap().kind(), "bye");
    }

    #[test]
    fn test_send_after_receiver_dropped_does_not_panic() {
        let (signaling, rx) = ChannelSignaling::channel();
        drop(rx);
        signaling.send(SignalingMessage::Bye(ByeMessage {
            mid: "alice".to_string(),
            rid: "room-1".to_string(),
            target: None,
        }));
    }

    #[test]
    fn test_parse_inbound_rejects_unknown_type() {
        assert!(matches!(
            parse_inbound(r#"{"type":"welcome","mid":"x"}"#),
            Err(ClientError::Json(_))
        ));
        assert!(parse_inbound("not json").is_err());
    }
}
