//! Per-peer offer/answer negotiation.

pub mod controller;
pub mod error;
pub mod policy;
pub mod report;
pub mod session;
pub mod signaling;

pub use controller::{
    NegotiationController, NegotiationControllerBuilder, NegotiationResult, NegotiationStep,
    MAIN_CHANNEL,
};
pub use error::{GuardRejection, NegotiationError};
pub use policy::{GlarePolicy, GlareResolution, IgnoreRemoteOffer, NegotiationPolicy};
pub use report::{ReportEvent, ReportingPort};
pub use session::{LocalIdentity, PeerConfig, SessionSnapshot, MAX_PENDING_REMOTE_CANDIDATES};
pub use signaling::{SignalingMessage, SignalingPort};
