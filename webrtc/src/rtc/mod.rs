//! Native connection capability and the options it is driven with.

pub mod peer_connection_error;
pub mod rtc_peer_connection;
pub mod sdp_negotiation;

pub use peer_connection_error::PeerConnectionError;
pub use rtc_peer_connection::{NegotiationConstraints, RtcPeerConnection, SignalingState};
pub use sdp_negotiation::MediaSupport;
