//! Per-peer negotiation state.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ice::IceCandidateInit;
use crate::rtc::{MediaSupport, NegotiationConstraints, RtcPeerConnection, SignalingState};
use crate::sdp::{SdpType, SessionDescription};

/// What the remote participant advertised when joining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    pub enable_ice_restart: bool,
    pub enable_data_channel: bool,
    pub supports: MediaSupport,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            enable_ice_restart: true,
            enable_data_channel: true,
            supports: MediaSupport::default(),
        }
    }
}

/// Who we are in the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalIdentity {
    pub session_id: String,
    pub room_id: String,
    pub user_info: serde_json::Value,
    /// Tie-break weight announced with our offers.
    pub priority_weight: f64,
}

impl LocalIdentity {
    pub fn new(
        session_id: impl Into<String>,
        room_id: impl Into<String>,
        user_info: serde_json::Value,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            room_id: room_id.into(),
            user_info,
            priority_weight: generate_priority_weight(),
        }
    }
}

/// Milliseconds since the epoch plus a random offset below one million.
pub fn generate_priority_weight() -> f64 {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as f64)
        .unwrap_or_default();
    now_ms + f64::from(rand::thread_rng().gen_range(0..1_000_000u32))
}

/// Read-only copy of a session, for callers and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub peer_id: String,
    pub epoch: u64,
    pub signaling_state: SignalingState,
    pub processing_local_description: bool,
    pub pending_constraints: Option<NegotiationConstraints>,
    pub ice_gathering_complete: bool,
    pub end_of_candidates_sent: bool,
    pub remote_priority_weight: Option<f64>,
    pub has_main_channel: bool,
    pub last_local_description: Option<SdpType>,
    pub has_pending_transmission: bool,
    pub pending_remote_candidates: usize,
}

/// Remote candidates held while no remote description is set.
pub const MAX_PENDING_REMOTE_CANDIDATES: usize = 64;

pub struct PeerNegotiationSession<C: ?Sized> {
    peer_id: String,
    connection: Arc<C>,
    config: PeerConfig,
    epoch: u64,
    signaling_state: SignalingState,
    closed: bool,
    processing_local_description: bool,
    pending_constraints: Option<NegotiationConstraints>,
    ice_gathering_complete: bool,
    end_of_candidates_sent: bool,
    remote_priority_weight: Option<f64>,
    has_main_channel: bool,
    last_local_description: Option<SdpType>,
    pending_transmission: Option<SessionDescription>,
    pending_remote_candidates: VecDeque<IceCandidateInit>,
}

impl<C: RtcPeerConnection + ?Sized> PeerNegotiationSession<C> {
    pub(crate) fn new(peer_id: String, connection: Arc<C>, config: PeerConfig, epoch: u64) -> Self {
        let signaling_state = connection.signaling_state();
        Self {
            peer_id,
            connection,
            config,
            epoch,
            signaling_state,
            closed: false,
            processing_local_description: false,
            pending_constraints: None,
            ice_gathering_complete: false,
            end_of_candidates_sent: false,
            remote_priority_weight: None,
            has_main_channel: false,
            last_local_description: None,
            pending_transmission: None,
            pending_remote_candidates: VecDeque::new(),
        }
    }

    /// Re-reads the state from the connection. A closed session stays `Closed`.
    pub(crate) fn refresh_state(&mut self) -> SignalingState {
        self.signaling_state = if self.closed {
            SignalingState::Closed
        } else {
            self.connection.signaling_state()
        };
        self.signaling_state
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn config(&self) -> &PeerConfig {
        &self.config
    }

    pub(crate) fn connection(&self) -> Arc<C> {
        Arc::clone(&self.connection)
    }

    pub fn is_processing_local_description(&self) -> bool {
        self.processing_local_description
    }

    pub(crate) fn set_processing_local_description(&mut self, processing: bool) {
        self.processing_local_description = processing;
    }

    pub(crate) fn set_pending_constraints(&mut self, constraints: NegotiationConstraints) {
        self.pending_constraints = Some(constraints);
    }

    /// Every offer, local or remote, starts a new candidate cycle. Restarting
    /// ICE gathers again.
    pub(crate) fn begin_candidate_cycle(&mut self, ice_restart: bool) {
        self.end_of_candidates_sent = false;
        if ice_restart {
            self.ice_gathering_complete = false;
        }
    }

    pub fn ice_gathering_complete(&self) -> bool {
        self.ice_gathering_complete
    }

    pub(crate) fn mark_gathering_complete(&mut self) {
        self.ice_gathering_complete = true;
    }

    pub(crate) fn hold_for_gathering(&mut self, description: SessionDescription) {
        self.pending_transmission = Some(description);
    }

    pub(crate) fn take_pending_transmission(&mut self) -> Option<SessionDescription> {
        self.pending_transmission.take()
    }

    /// True exactly once per candidate cycle.
    pub(crate) fn claim_end_of_candidates(&mut self) -> bool {
        if self.end_of_candidates_sent {
            return false;
        }
        self.end_of_candidates_sent = true;
        true
    }

    /// Returns false, dropping the candidate, once the queue is full.
    pub(crate) fn queue_remote_candidate(&mut self, candidate: IceCandidateInit) -> bool {
        if self.pending_remote_candidates.len() >= MAX_PENDING_REMOTE_CANDIDATES {
            return false;
        }
        self.pending_remote_candidates.push_back(candidate);
        true
    }

    pub(crate) fn take_pending_remote_candidates(&mut self) -> Vec<IceCandidateInit> {
        self.pending_remote_candidates.drain(..).collect()
    }

    pub fn remote_priority_weight(&self) -> Option<f64> {
        self.remote_priority_weight
    }

    pub(crate) fn set_remote_priority_weight(&mut self, weight: f64) {
        self.remote_priority_weight = Some(weight);
    }

    pub fn has_main_channel(&self) -> bool {
        self.has_main_channel
    }

    pub(crate) fn mark_main_channel(&mut self) {
        self.has_main_channel = true;
    }

    pub(crate) fn record_local_description(&mut self, sdp_type: SdpType) {
        self.last_local_description = Some(sdp_type);
    }

    pub(crate) fn close(&mut self) {
        self.closed = true;
        self.signaling_state = SignalingState::Closed;
        self.processing_local_description = false;
        self.pending_transmission = None;
        self.pending_remote_candidates.clear();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            peer_id: self.peer_id.clone(),
            epoch: self.epoch,
            signaling_state: self.signaling_state,
            processing_local_description: self.processing_local_description,
            pending_constraints: self.pending_constraints,
            ice_gathering_complete: self.ice_gathering_complete,
            end_of_candidates_sent: self.end_of_candidates_sent,
            remote_priority_weight: self.remote_priority_weight,
            has_main_channel: self.has_main_channel,
            last_local_description: self.last_local_description,
            has_pending_transmission: self.pending_transmission.is_some(),
            pending_remote_candidates: self.pending_remote_candidates.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_weight_is_after_now() {
        let before = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as f64;
        let weight = generate_priority_weight();
        assert!(weight >= before);
        assert!(weight < before + 1_000_000.0 + 60_000.0);
    }

    #[test]
    fn test_identity_carries_user_info() {
        let identity = LocalIdentity::new("me", "room-1", serde_json::json!({"name": "alice"}));
        assert_eq!(identity.session_id, "me");
        assert_eq!(identity.user_info["name"], "alice");
        assert!(identity.priority_weight > 0.0);
    }

    #[test]
    fn test_peer_config_defaults_enable_everything() {
        let config: PeerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PeerConfig::default());
        assert!(config.supports.video);
    }
}
