//! Offer/answer descriptions as handed to and returned by the native connection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::sdp_error::SdpError;

/// Kind of a session description in the offer/answer exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

impl SdpType {
    pub fn as_str(self) -> &'static str {
        match self {
            SdpType::Offer => "offer",
            SdpType::Answer => "answer",
        }
    }
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SdpType {
    type Err = SdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offer" => Ok(SdpType::Offer),
            "answer" => Ok(SdpType::Answer),
            _ => Err(SdpError::UnknownType(s.to_string())),
        }
    }
}

/// A typed SDP payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn new(sdp_type: SdpType, sdp: impl Into<String>) -> Self {
        Self {
            sdp_type,
            sdp: sdp.into(),
        }
    }

    pub fn offer(sdp: impl Into<String>) -> Self {
        Self::new(SdpType::Offer, sdp)
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self::new(SdpType::Answer, sdp)
    }

    /// True when there is no payload worth applying.
    pub fn is_empty(&self) -> bool {
        self.sdp.trim().is_empty()
    }

    /// First `a=ice-ufrag` value, session or media level.
    pub fn ice_ufrag(&self) -> Option<&str> {
        self.sdp
            .lines()
            .find_map(|line| line.trim_end().strip_prefix("a=ice-ufrag:"))
            .map(str::trim)
    }

    /// Same type, different payload.
    pub fn with_sdp(&self, sdp: String) -> Self {
        Self {
            sdp_type: self.sdp_type,
            sdp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sdp_type_from_str() {
        assert_eq!(SdpType::from_str("offer"), Ok(SdpType::Offer));
        assert_eq!(SdpType::from_str("answer"), Ok(SdpType::Answer));
        assert_eq!(
            SdpType::from_str("pranswer"),
            Err(SdpError::UnknownType("pranswer".to_string()))
        );
    }

    #[test]
    fn test_whitespace_payload_is_empty() {
        assert!(SessionDescription::offer(" \r\n").is_empty());
        assert!(!SessionDescription::offer("v=0\r\n").is_empty());
    }

    #[test]
    fn test_ice_ufrag() {
        let desc = SessionDescription::offer("v=0\r\nm=audio 9 UDP/TLS/RTP/SAVPF 111\r\na=ice-ufrag:F7gI\r\n");
        assert_eq!(desc.ice_ufrag(), Some("F7gI"));
        assert_eq!(SessionDescription::offer("v=0\r\n").ice_ufrag(), None);
    }

    #[test]
    fn test_serializes_type_field() {
        let json = serde_json::to_value(SessionDescription::answer("v=0\r\n")).unwrap();
        assert_eq!(json["type"], "answer");
        assert_eq!(json["sdp"], "v=0\r\n");
    }
}
