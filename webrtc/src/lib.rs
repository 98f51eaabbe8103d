pub mod ice;
pub mod negotiation;
pub mod rtc;
pub mod sdp;

#[cfg(feature = "test-util")]
pub mod testing;

pub use ice::{CandidateInfo, IceCandidateInit};
pub use negotiation::{
    NegotiationController, NegotiationError, NegotiationPolicy, NegotiationStep, ReportEvent,
    ReportingPort, SignalingMessage, SignalingPort,
};
pub use rtc::{RtcPeerConnection, SignalingState};
pub use sdp::SessionDescription;
