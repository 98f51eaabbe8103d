//! Messages exchanged with remote peers over the signaling channel.

use serde::{Deserialize, Serialize};

use crate::ice::IceCandidateInit;
use crate::sdp::{SdpType, SessionDescription};

/// Offer or answer addressed to one peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionMessage {
    pub sdp: String,
    #[serde(rename = "mid")]
    pub from_id: String,
    #[serde(rename = "target")]
    pub to_id: String,
    #[serde(rename = "rid")]
    pub room_id: String,
    #[serde(rename = "userInfo", default)]
    pub user_info: serde_json::Value,
    /// Sender's tie-break weight for colliding offers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateMessage {
    pub candidate: String,
    #[serde(rename = "id", default)]
    pub sdp_mid: Option<String>,
    #[serde(rename = "label", default)]
    pub sdp_m_line_index: Option<u16>,
    pub mid: String,
    pub target: String,
    pub rid: String,
}

impl CandidateMessage {
    pub fn to_init(&self) -> IceCandidateInit {
        IceCandidateInit::new(
            self.candidate.clone(),
            self.sdp_mid.clone(),
            self.sdp_m_line_index,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingMessage {
    pub mid: String,
    pub target: String,
    pub rid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByeMessage {
    pub mid: String,
    pub rid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SignalingMessage {
    Offer(DescriptionMessage),
    Answer(DescriptionMessage),
    Candidate(CandidateMessage),
    EndOfCandidates(RoutingMessage),
    Bye(ByeMessage),
}

impl SignalingMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            SignalingMessage::Offer(_) => "offer",
            SignalingMessage::Answer(_) => "answer",
            SignalingMessage::Candidate(_) => "candidate",
            SignalingMessage::EndOfCandidates(_) => "endOfCandidates",
            SignalingMessage::Bye(_) => "bye",
        }
    }

    /// Offer or answer wrapped with the message routing fields.
    pub fn from_description(
        description: &SessionDescription,
        from_id: &str,
        to_id: &str,
        room_id: &str,
        user_info: serde_json::Value,
        weight: Option<f64>,
    ) -> Self {
        let message = DescriptionMessage {
            sdp: description.sdp.clone(),
            from_id: from_id.to_string(),
            to_id: to_id.to_string(),
            room_id: room_id.to_string(),
            user_info,
            weight,
        };
        match description.sdp_type {
            SdpType::Offer => SignalingMessage::Offer(message),
            SdpType::Answer => SignalingMessage::Answer(message),
        }
    }

    pub fn description(&self) -> Option<SessionDescription> {
        match self {
            SignalingMessage::Offer(message) => Some(SessionDescription::offer(message.sdp.clone())),
            SignalingMessage::Answer(message) => {
                Some(SessionDescription::answer(message.sdp.clone()))
            }
            _ => None,
        }
    }

    /// Sender session id.
    pub fn from_id(&self) -> &str {
        match self {
            SignalingMessage::Offer(message) | SignalingMessage::Answer(message) => &message.from_id,
            SignalingMessage::Candidate(message) => &message.mid,
            SignalingMessage::EndOfCandidates(message) => &message.mid,
            SignalingMessage::Bye(message) => &message.mid,
        }
    }

    /// Addressee session id, `None` for room-wide messages.
    pub fn target(&self) -> Option<&str> {
        match self {
            SignalingMessage::Offer(message) | SignalingMessage::Answer(message) => {
                Some(&message.to_id)
            }
            SignalingMessage::Candidate(message) => Some(&message.target),
            SignalingMessage::EndOfCandidates(message) => Some(&message.target),
            SignalingMessage::Bye(message) => message.target.as_deref(),
        }
    }
}

/// Outbound half of the signaling channel. Delivery is the implementor's concern.
pub trait SignalingPort: Send + Sync {
    fn send(&self, message: SignalingMessage);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_offer_wire_format() {
        let message = SignalingMessage::from_description(
            &SessionDescription::offer("v=0\r\n"),
            "me",
            "you",
            "room-1",
            json!({"name": "alice"}),
            None,
        );
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "offer",
                "sdp": "v=0\r\n",
                "mid": "me",
                "target": "you",
                "rid": "room-1",
                "userInfo": {"name": "alice"}
            })
        );
    }

    #[test]
    fn test_candidate_wire_format() {
        let raw = r#"{"type":"candidate","candidate":"candidate:1 1 udp 2122260223 10.0.0.2 50000 typ host","id":"0","label":0,"mid":"peer-2","target":"me","rid":"room-1"}"#;
        let message: SignalingMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(message.kind(), "candidate");
        assert_eq!(message.from_id(), "peer-2");
        let SignalingMessage::Candidate(candidate) = message else {
            panic!("expected candidate");
        };
        assert_eq!(candidate.to_init().sdp_mid.as_deref(), Some("0"));
        assert_eq!(candidate.to_init().sdp_m_line_index, Some(0));
    }

    #[test]
    fn test_end_of_candidates_and_bye() {
        let end = SignalingMessage::EndOfCandidates(RoutingMessage {
            mid: "me".to_string(),
            target: "you".to_string(),
            rid: "room-1".to_string(),
        });
        assert_eq!(serde_json::to_value(&end).unwrap()["type"], "endOfCandidates");

        let bye: SignalingMessage =
            serde_json::from_str(r#"{"type":"bye","mid":"you","rid":"room-1"}"#).unwrap();
        assert_eq!(bye.target(), None);
        assert_eq!(bye.description(), None);
    }
}
