//! Room-wide negotiation settings and the glare tie-break seam.

use serde::{Deserialize, Serialize};

/// Send/receive permissions for one media kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaPolicy {
    pub send: bool,
    pub receive: bool,
}

impl Default for MediaPolicy {
    fn default() -> Self {
        Self {
            send: true,
            receive: true,
        }
    }
}

/// Codec names, matched case-insensitively, removed from local descriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisabledCodecs {
    pub audio: Vec<String>,
    pub video: Vec<String>,
}

impl DisabledCodecs {
    pub fn for_kind(&self, kind: &str) -> &[String] {
        match kind {
            "audio" => &self.audio,
            "video" => &self.video,
            _ => &[],
        }
    }
}

/// Opus `a=fmtp` overrides. `None` leaves the negotiated value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpusParams {
    pub stereo: Option<bool>,
    pub use_inband_fec: Option<bool>,
    pub use_dtx: Option<bool>,
    pub max_playback_rate: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecParams {
    pub opus: OpusParams,
}

/// DTLS role forced into `a=setup:` of local answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DtlsRole {
    Active,
    Passive,
}

impl DtlsRole {
    pub fn setup_value(self) -> &'static str {
        match self {
            DtlsRole::Active => "active",
            DtlsRole::Passive => "passive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationPolicy {
    pub enable_ice_trickle: bool,
    pub enable_ice_restart: bool,
    pub enable_data_channel: bool,
    pub disable_bundle: bool,
    pub disable_remb: bool,
    pub voice_activity_detection: bool,
    pub audio: MediaPolicy,
    pub video: MediaPolicy,
    /// Peer that forwards media for the whole room, if any.
    pub relay_peer_id: Option<String>,
    pub disabled_codecs: DisabledCodecs,
    pub codec_params: CodecParams,
    pub dtls_role: Option<DtlsRole>,
}

impl Default for NegotiationPolicy {
    fn default() -> Self {
        Self {
            enable_ice_trickle: true,
            enable_ice_restart: true,
            enable_data_channel: true,
            disable_bundle: false,
            disable_remb: true,
            voice_activity_detection: true,
            audio: MediaPolicy::default(),
            video: MediaPolicy::default(),
            relay_peer_id: None,
            disabled_codecs: DisabledCodecs::default(),
            codec_params: CodecParams::default(),
            dtls_role: None,
        }
    }
}

impl NegotiationPolicy {
    pub fn is_relay(&self, peer_id: &str) -> bool {
        self.relay_peer_id.as_deref() == Some(peer_id)
    }

    pub fn media(&self, kind: &str) -> Option<MediaPolicy> {
        match kind {
            "audio" => Some(self.audio),
            "video" => Some(self.video),
            _ => None,
        }
    }

    /// Local media goes to every peer, or only to the relay when one exists.
    pub fn attaches_media_for(&self, peer_id: &str) -> bool {
        match &self.relay_peer_id {
            None => true,
            Some(relay) => relay == peer_id,
        }
    }
}

/// Outcome of an offer arriving while a local offer is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlareResolution {
    IgnoreRemote,
    AcceptRemote,
}

/// Tie-break for colliding offers.
pub trait GlarePolicy: Send + Sync {
    fn resolve(&self, peer_id: &str, local_weight: f64, remote_weight: Option<f64>)
        -> GlareResolution;
}

/// Keeps the local offer and drops the remote one.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreRemoteOffer;

impl GlarePolicy for IgnoreRemoteOffer {
    fn resolve(&self, _peer_id: &str, _local: f64, _remote: Option<f64>) -> GlareResolution {
        GlareResolution::IgnoreRemote
    }
}

impl<F> GlarePolicy for F
where
    F: Fn(&str, f64, Option<f64>) -> GlareResolution + Send + Sync,
{
    fn resolve(&self, peer_id: &str, local_weight: f64, remote_weight: Option<f64>)
        -> GlareResolution {
        self(peer_id, local_weight, remote_weight)
    }
}
