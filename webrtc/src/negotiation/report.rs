//! Telemetry events emitted by the controller.

use serde::{Deserialize, Serialize};

use crate::ice::CandidateInfo;
use crate::sdp::SdpType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandshakeProgress {
    Offer,
    Answer,
    Error,
}

impl From<SdpType> for HandshakeProgress {
    fn from(value: SdpType) -> Self {
        match value {
            SdpType::Offer => HandshakeProgress::Offer,
            SdpType::Answer => HandshakeProgress::Answer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeProgressEvent {
    pub peer_id: String,
    pub progress: HandshakeProgress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Negotiation step reported to the stats backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NegotiationStage {
    LocalOffer,
    LocalAnswer,
    RemoteOffer,
    RemoteAnswer,
    ErrorCreateOffer,
    ErrorCreateAnswer,
    ErrorLocalOffer,
    ErrorLocalAnswer,
    ErrorRemoteOffer,
    ErrorRemoteAnswer,
}

impl NegotiationStage {
    pub fn local(sdp_type: SdpType) -> Self {
        match sdp_type {
            SdpType::Offer => NegotiationStage::LocalOffer,
            SdpType::Answer => NegotiationStage::LocalAnswer,
        }
    }

    pub fn remote(sdp_type: SdpType) -> Self {
        match sdp_type {
            SdpType::Offer => NegotiationStage::RemoteOffer,
            SdpType::Answer => NegotiationStage::RemoteAnswer,
        }
    }

    pub fn create_failed(sdp_type: SdpType) -> Self {
        match sdp_type {
            SdpType::Offer => NegotiationStage::ErrorCreateOffer,
            SdpType::Answer => NegotiationStage::ErrorCreateAnswer,
        }
    }

    pub fn local_failed(sdp_type: SdpType) -> Self {
        match sdp_type {
            SdpType::Offer => NegotiationStage::ErrorLocalOffer,
            SdpType::Answer => NegotiationStage::ErrorLocalAnswer,
        }
    }

    pub fn remote_failed(sdp_type: SdpType) -> Self {
        match sdp_type {
            SdpType::Offer => NegotiationStage::ErrorRemoteOffer,
            SdpType::Answer => NegotiationStage::ErrorRemoteAnswer,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NegotiationStage::LocalOffer => "local-offer",
            NegotiationStage::LocalAnswer => "local-answer",
            NegotiationStage::RemoteOffer => "remote-offer",
            NegotiationStage::RemoteAnswer => "remote-answer",
            NegotiationStage::ErrorCreateOffer => "error-create-offer",
            NegotiationStage::ErrorCreateAnswer => "error-create-answer",
            NegotiationStage::ErrorLocalOffer => "error-local-offer",
            NegotiationStage::ErrorLocalAnswer => "error-local-answer",
            NegotiationStage::ErrorRemoteOffer => "error-remote-offer",
            NegotiationStage::ErrorRemoteAnswer => "error-remote-answer",
        }
    }

    pub fn is_error(self) -> bool {
        self.as_str().starts_with("error-")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiationStats {
    pub peer_id: String,
    pub state: NegotiationStage,
    /// Local priority weight at the time of the event.
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_type: Option<SdpType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateState {
    Gathered,
    Received,
    Queued,
    Added,
    Failed,
    Dropped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateStats {
    pub peer_id: String,
    pub candidate: String,
    pub state: CandidateState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceAgentStats {
    pub peer_id: String,
    /// ICE connection state as named by the native engine.
    pub state: String,
    pub is_trickle: bool,
    pub local_candidates: Vec<CandidateInfo>,
    pub remote_candidates: Vec<CandidateInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ReportEvent {
    HandshakeProgress(HandshakeProgressEvent),
    Negotiation(NegotiationStats),
    IceCandidate(IceCandidateStats),
    IceAgent(IceAgentStats),
}

impl ReportEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ReportEvent::HandshakeProgress(_) => "handshakeProgress",
            ReportEvent::Negotiation(_) => "negotiation",
            ReportEvent::IceCandidate(_) => "iceCandidate",
            ReportEvent::IceAgent(_) => "iceAgent",
        }
    }

    pub fn peer_id(&self) -> &str {
        match self {
            ReportEvent::HandshakeProgress(event) => &event.peer_id,
            ReportEvent::Negotiation(event) => &event.peer_id,
            ReportEvent::IceCandidate(event) => &event.peer_id,
            ReportEvent::IceAgent(event) => &event.peer_id,
        }
    }
}

/// Sink for telemetry. Must not block.
pub trait ReportingPort: Send + Sync {
    fn report(&self, event: ReportEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(NegotiationStage::create_failed(SdpType::Offer).as_str(), "error-create-offer");
        assert_eq!(NegotiationStage::local_failed(SdpType::Answer).as_str(), "error-local-answer");
        assert_eq!(NegotiationStage::remote(SdpType::Answer).as_str(), "remote-answer");
        assert!(NegotiationStage::remote_failed(SdpType::Offer).is_error());
        assert!(!NegotiationStage::local(SdpType::Offer).is_error());
        assert_eq!(
            serde_json::to_value(NegotiationStage::ErrorLocalOffer).unwrap(),
            "error-local-offer"
        );
    }

    #[test]
    fn test_event_is_tagged_by_name() {
        let event = ReportEvent::HandshakeProgress(HandshakeProgressEvent {
            peer_id: "peer-1".to_string(),
            progress: HandshakeProgress::Error,
            error: Some("boom".to_string()),
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], event.name());
        assert_eq!(value["peerId"], "peer-1");
        assert_eq!(value["progress"], "error");
    }
}
