//! Representations of local or remote ICE candidates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Types of candidates available during ICE negotiations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateType {
    Host,
    Srflx,
    Prflx,
    Relay,
}

impl CandidateType {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateType::Host => "host",
            CandidateType::Srflx => "srflx",
            CandidateType::Prflx => "prflx",
            CandidateType::Relay => "relay",
        }
    }
}

impl fmt::Display for CandidateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown ICE candidate type \"{0}\"")]
pub struct UnknownCandidateType(pub String);

impl FromStr for CandidateType {
    type Err = UnknownCandidateType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "host" => Ok(CandidateType::Host),
            "srflx" => Ok(CandidateType::Srflx),
            "prflx" => Ok(CandidateType::Prflx),
            "relay" => Ok(CandidateType::Relay),
            other => Err(UnknownCandidateType(other.to_string())),
        }
    }
}

/// Candidate as reported by the native connection's statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    pub id: String,
    pub ip: String,
    pub port: u16,
    pub candidate_type: CandidateType,
    /// Interface kind (`wifi`, `ethernet`, ...). Not every platform reports it.
    pub network_type: Option<String>,
    pub protocol: String,
    pub priority: u32,
}

/// Normalized candidate description used for transmission and reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateInfo {
    pub address: String,
    pub port: u16,
    #[serde(rename = "candidateType")]
    pub candidate_type: CandidateType,
    #[serde(rename = "networkType", skip_serializing_if = "Option::is_none", default)]
    pub network_type: Option<String>,
    pub transport: String,
    pub priority: u32,
}

impl CandidateInfo {
    /// `None` when the record is absent.
    pub fn extract(record: Option<&CandidateRecord>) -> Option<Self> {
        record.map(Self::from)
    }
}

impl From<&CandidateRecord> for CandidateInfo {
    fn from(record: &CandidateRecord) -> Self {
        Self {
            address: record.ip.clone(),
            port: record.port,
            candidate_type: record.candidate_type,
            network_type: record.network_type.clone(),
            transport: record.protocol.clone(),
            priority: record.priority,
        }
    }
}

/// Candidate line plus the media section it belongs to, as exchanged on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidateInit {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub sdp_m_line_index: Option<u16>,
}

impl IceCandidateInit {
    pub fn new(candidate: impl Into<String>, sdp_mid: Option<String>, sdp_m_line_index: Option<u16>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid,
            sdp_m_line_index,
        }
    }
}
