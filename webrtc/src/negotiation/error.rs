use thiserror::Error;

use crate::rtc::{PeerConnectionError, SignalingState};
use crate::sdp::SdpType;

/// An operation refused before touching the native connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardRejection {
    #[error("no negotiation session for this peer")]
    MissingSession,
    #[error("description payload is empty")]
    EmptyDescription,
    #[error("signaling state is {actual}, expected {expected}")]
    InvalidState {
        expected: SignalingState,
        actual: SignalingState,
    },
    #[error("a local description is already being applied")]
    InFlight,
    #[error("session was closed while the operation was pending")]
    Closed,
    #[error("a session already exists for this peer")]
    AlreadyExists,
    #[error("remote offer collided with local state {state} and was ignored")]
    Glare { state: SignalingState },
    #[error("remote candidate queue is full ({limit} pending)")]
    CandidateQueueFull { limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationError {
    #[error("rejected: {0}")]
    Rejected(#[from] GuardRejection),
    #[error("failed to create offer: {0}")]
    CreateOffer(#[source] PeerConnectionError),
    #[error("failed to create answer: {0}")]
    CreateAnswer(#[source] PeerConnectionError),
    #[error("failed to set local {sdp_type}: {source}")]
    SetLocalDescription {
        sdp_type: SdpType,
        source: PeerConnectionError,
    },
    #[error("failed to set remote {sdp_type}: {source}")]
    SetRemoteDescription {
        sdp_type: SdpType,
        source: PeerConnectionError,
    },
    #[error("failed to add remote candidate: {0}")]
    AddCandidate(#[source] PeerConnectionError),
    #[error("failed to read connection stats: {0}")]
    Stats(#[source] PeerConnectionError),
}

impl NegotiationError {
    /// Warning-class outcome: the request was dropped, nothing failed.
    pub fn is_guard_rejection(&self) -> bool {
        matches!(self, NegotiationError::Rejected(_))
    }
}
