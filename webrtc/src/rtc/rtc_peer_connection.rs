//! `RTCPeerConnection` capability consumed by the negotiation layer.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use super::peer_connection_error::PeerConnectionError;
use crate::ice::{IceCandidateInit, StatsSnapshot};
use crate::sdp::SessionDescription;

/// Offer/answer state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    Closed,
}

impl SignalingState {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalingState::Stable => "stable",
            SignalingState::HaveLocalOffer => "have-local-offer",
            SignalingState::HaveRemoteOffer => "have-remote-offer",
            SignalingState::Closed => "closed",
        }
    }
}

impl fmt::Display for SignalingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options passed to `create_offer` / `create_answer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NegotiationConstraints {
    pub offer_to_receive_audio: bool,
    pub offer_to_receive_video: bool,
    pub ice_restart: bool,
    pub voice_activity_detection: bool,
}

/// The native peer connection.
///
/// State queries are synchronous. Everything that the underlying engine
/// completes later is `async`.
#[async_trait]
pub trait RtcPeerConnection: Send + Sync {
    fn signaling_state(&self) -> SignalingState;

    /// Current local description, including candidates gathered so far.
    fn local_description(&self) -> Option<SessionDescription>;

    fn remote_description(&self) -> Option<SessionDescription>;

    /// Adds the local tracks to the connection.
    fn attach_local_media(&self) -> Result<(), PeerConnectionError>;

    fn create_data_channel(&self, label: &str) -> Result<(), PeerConnectionError>;

    async fn create_offer(
        &self,
        constraints: &NegotiationConstraints,
    ) -> Result<SessionDescription, PeerConnectionError>;

    async fn create_answer(
        &self,
        constraints: &NegotiationConstraints,
    ) -> Result<SessionDescription, PeerConnectionError>;

    async fn set_local_description(
        &self,
        description: &SessionDescription,
    ) -> Result<(), PeerConnectionError>;

    async fn set_remote_description(
        &self,
        description: &SessionDescription,
    ) -> Result<(), PeerConnectionError>;

    async fn add_ice_candidate(&self, candidate: &IceCandidateInit)
        -> Result<(), PeerConnectionError>;

    async fn stats_snapshot(&self) -> Result<StatsSnapshot, PeerConnectionError>;

    async fn close(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signaling_state_names() {
        assert_eq!(SignalingState::HaveLocalOffer.to_string(), "have-local-offer");
        assert_eq!(
            serde_json::to_value(SignalingState::HaveRemoteOffer).unwrap(),
            "have-remote-offer"
        );
    }

    #[test]
    fn test_default_constraints_request_nothing() {
        let constraints = NegotiationConstraints::default();
        assert!(!constraints.offer_to_receive_audio);
        assert!(!constraints.ice_restart);
    }
}
