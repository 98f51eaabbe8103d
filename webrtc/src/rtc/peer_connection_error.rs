//! Error types for RTC peer connection.

use thiserror::Error;

use crate::sdp::SdpError;

/// Errors reported by the native connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerConnectionError {
    /// Error converting or interpreting SDP descriptions.
    #[error("SDP error: {0}")]
    Sdp(String),
    /// Error originating from the ICE layer.
    #[error("ICE error: {0}")]
    Ice(String),
    /// The connection refused an operation for its current signaling state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Peer connection is closed")]
    Closed,
    #[error("Data channel error: {0}")]
    DataChannel(String),
    #[error("Stats error: {0}")]
    Stats(String),
    /// Local tracks could not be attached.
    #[error("Media error: {0}")]
    Media(String),
}

impl From<SdpError> for PeerConnectionError {
    fn from(value: SdpError) -> Self {
        PeerConnectionError::Sdp(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_sdp_error() {
        let err = PeerConnectionError::from(SdpError::Empty);
        assert_eq!(err.to_string(), "SDP error: SDP error: payload is empty");
    }
}
