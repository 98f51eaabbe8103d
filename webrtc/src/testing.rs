//! In-memory stand-ins for the native connection and the outbound ports.
//!
//! Available with the `test-util` feature.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::ice::{IceCandidateInit, StatsSnapshot};
use crate::negotiation::report::{CandidateState, HandshakeProgress, NegotiationStage, ReportEvent, ReportingPort};
use crate::negotiation::signaling::{SignalingMessage, SignalingPort};
use crate::rtc::{NegotiationConstraints, PeerConnectionError, RtcPeerConnection, SignalingState};
use crate::sdp::{SdpType, SessionDescription};

pub const SAMPLE_OFFER_SDP: &str = "v=0\r\n\
o=- 4611731400430051336 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
a=group:BUNDLE 0 1 2\r\n\
a=msid-semantic: WMS stream\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111 0\r\n\
c=IN IP4 0.0.0.0\r\n\
a=ice-ufrag:F7gI\r\n\
a=ice-pwd:x9cml/YzichV2+XlhiMu8g\r\n\
a=fingerprint:sha-256 49:66:12:17:0D:1C:91:AE:57:4C:C6:36:DD:D5:97:D2:7D:62:C9:9A:7F:B9:A3:F4:70:03:E7:43:91:73:23:5E\r\n\
a=setup:actpass\r\n\
a=mid:0\r\n\
a=sendrecv\r\n\
a=rtcp-mux\r\n\
a=rtpmap:111 opus/48000/2\r\n\
a=rtcp-fb:111 transport-cc\r\n\
a=fmtp:111 useinbandfec=1;minptime=10\r\n\
a=rtpmap:0 PCMU/8000\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96 97 102 103 104\r\n\
c=IN IP4 0.0.0.0\r\n\
a=ice-ufrag:F7gI\r\n\
a=ice-pwd:x9cml/YzichV2+XlhiMu8g\r\n\
a=fingerprint:sha-256 49:66:12:17:0D:1C:91:AE:57:4C:C6:36:DD:D5:97:D2:7D:62:C9:9A:7F:B9:A3:F4:70:03:E7:43:91:73:23:5E\r\n\
a=setup:actpass\r\n\
a=mid:1\r\n\
a=sendrecv\r\n\
a=rtcp-mux\r\n\
a=rtpmap:96 VP8/90000\r\n\
a=rtcp-fb:96 goog-remb\r\n\
a=rtcp-fb:96 nack\r\n\
a=rtpmap:97 rtx/90000\r\n\
a=fmtp:97 apt=96\r\n\
a=rtpmap:102 H264/90000\r\n\
a=rtcp-fb:102 goog-remb\r\n\
a=fmtp:102 packetization-mode=1;profile-level-id=42001f;level-asymmetry-allowed=1\r\n\
a=rtpmap:103 rtx/90000\r\n\
a=fmtp:103 apt=102\r\n\
a=rtpmap:104 rtx/90000\r\n\
a=fmtp:104 apt=125\r\n\
m=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n\
c=IN IP4 0.0.0.0\r\n\
a=mid:2\r\n\
a=sctp-port:5000\r\n";

pub const SAMPLE_ANSWER_SDP: &str = "v=0\r\n\
o=- 7038381092373478563 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
a=group:BUNDLE 0 1 2\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
c=IN IP4 0.0.0.0\r\n\
a=setup:active\r\n\
a=mid:0\r\n\
a=sendrecv\r\n\
a=rtpmap:111 opus/48000/2\r\n\
a=fmtp:111 minptime=10;useinbandfec=1\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96 97\r\n\
c=IN IP4 0.0.0.0\r\n\
a=setup:active\r\n\
a=mid:1\r\n\
a=sendrecv\r\n\
a=rtpmap:96 VP8/90000\r\n\
a=rtcp-fb:96 nack\r\n\
a=rtpmap:97 rtx/90000\r\n\
a=fmtp:97 apt=96\r\n\
m=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n\
c=IN IP4 0.0.0.0\r\n\
a=mid:2\r\n\
a=sctp-port:5000\r\n";

/// One call made on a [`FakePeerConnection`].
#[derive(Debug, Clone, PartialEq)]
pub enum FakeCall {
    AttachLocalMedia,
    CreateDataChannel(String),
    CreateOffer(NegotiationConstraints),
    CreateAnswer(NegotiationConstraints),
    SetLocalDescription(SessionDescription),
    SetRemoteDescription(SessionDescription),
    AddIceCandidate(IceCandidateInit),
    StatsSnapshot,
    Close,
}

/// Failures injected into the next matching call, one shot each.
#[derive(Debug, Default)]
struct Failures {
    attach_local_media: Option<PeerConnectionError>,
    create_data_channel: Option<PeerConnectionError>,
    create_offer: Option<PeerConnectionError>,
    create_answer: Option<PeerConnectionError>,
    set_local: Option<PeerConnectionError>,
    set_remote: Option<PeerConnectionError>,
    add_candidate: Option<PeerConnectionError>,
    stats: Option<PeerConnectionError>,
}

struct FakeState {
    signaling_state: SignalingState,
    local: Option<SessionDescription>,
    remote: Option<SessionDescription>,
    offer_sdp: String,
    answer_sdp: String,
    stats: StatsSnapshot,
    hold_set_local: bool,
    failures: Failures,
    calls: Vec<FakeCall>,
}

/// Offer/answer state machine of a browser connection, without any transport.
pub struct FakePeerConnection {
    state: Mutex<FakeState>,
    set_local_started: Notify,
    set_local_gate: Notify,
}

impl Default for FakePeerConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePeerConnection {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                signaling_state: SignalingState::Stable,
                local: None,
                remote: None,
                offer_sdp: SAMPLE_OFFER_SDP.to_string(),
                answer_sdp: SAMPLE_ANSWER_SDP.to_string(),
                stats: StatsSnapshot::new(),
                hold_set_local: false,
                failures: Failures::default(),
                calls: Vec::new(),
            }),
            set_local_started: Notify::new(),
            set_local_gate: Notify::new(),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn set_offer_sdp(&self, sdp: impl Into<String>) {
        self.state.lock().offer_sdp = sdp.into();
    }

    pub fn set_answer_sdp(&self, sdp: impl Into<String>) {
        self.state.lock().answer_sdp = sdp.into();
    }

    pub fn set_stats(&self, stats: StatsSnapshot) {
        self.state.lock().stats = stats;
    }

    pub fn fail_attach_local_media(&self, error: PeerConnectionError) {
        self.state.lock().failures.attach_local_media = Some(error);
    }

    pub fn fail_create_data_channel(&self, error: PeerConnectionError) {
        self.state.lock().failures.create_data_channel = Some(error);
    }

    pub fn fail_create_offer(&self, error: PeerConnectionError) {
        self.state.lock().failures.create_offer = Some(error);
    }

    pub fn fail_create_answer(&self, error: PeerConnectionError) {
        self.state.lock().failures.create_answer = Some(error);
    }

    pub fn fail_set_local(&self, error: PeerConnectionError) {
        self.state.lock().failures.set_local = Some(error);
    }

    pub fn fail_set_remote(&self, error: PeerConnectionError) {
        self.state.lock().failures.set_remote = Some(error);
    }

    pub fn fail_add_candidate(&self, error: PeerConnectionError) {
        self.state.lock().failures.add_candidate = Some(error);
    }

    pub fn fail_stats(&self, error: PeerConnectionError) {
        self.state.lock().failures.stats = Some(error);
    }

    /// Makes `set_local_description` wait for [`Self::release_set_local`].
    pub fn hold_set_local(&self) {
        self.state.lock().hold_set_local = true;
    }

    pub fn release_set_local(&self) {
        self.state.lock().hold_set_local = false;
        self.set_local_gate.notify_one();
    }

    /// Resolves once a held `set_local_description` has been entered.
    pub async fn set_local_started(&self) {
        self.set_local_started.notified().await;
    }

    /// Appends a gathered candidate line to the local description.
    pub fn complete_gathering(&self, candidate_line: &str) {
        let mut state = self.state.lock();
        if let Some(local) = state.local.as_mut() {
            local.sdp.push_str(candidate_line);
            local.sdp.push_str("\r\n");
        }
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.state.lock().calls.clone()
    }

    pub fn count_calls(&self, matches: impl Fn(&FakeCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|call| matches(call)).count()
    }

    pub fn set_local_calls(&self) -> Vec<SessionDescription> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                FakeCall::SetLocalDescription(description) => Some(description.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: FakeCall) -> Option<PeerConnectionError> {
        let mut state = self.state.lock();
        state.calls.push(call);
        (state.signaling_state == SignalingState::Closed).then_some(PeerConnectionError::Closed)
    }

    fn invalid(state: SignalingState, operation: &str) -> PeerConnectionError {
        PeerConnectionError::InvalidState(format!("cannot {operation} in state {state}"))
    }
}

#[async_trait]
impl RtcPeerConnection for FakePeerConnection {
    fn signaling_state(&self) -> SignalingState {
        self.state.lock().signaling_state
    }

    fn local_description(&self) -> Option<SessionDescription> {
        self.state.lock().local.clone()
    }

    fn remote_description(&self) -> Option<SessionDescription> {
        self.state.lock().remote.clone()
    }

    fn attach_local_media(&self) -> Result<(), PeerConnectionError> {
        if let Some(closed) = self.record(FakeCall::AttachLocalMedia) {
            return Err(closed);
        }
        self.state
            .lock()
            .failures
            .attach_local_media
            .take()
            .map_or(Ok(()), Err)
    }

    fn create_data_channel(&self, label: &str) -> Result<(), PeerConnectionError> {
        if let Some(closed) = self.record(FakeCall::CreateDataChannel(label.to_string())) {
            return Err(closed);
        }
        self.state
            .lock()
            .failures
            .create_data_channel
            .take()
            .map_or(Ok(()), Err)
    }

    async fn create_offer(
        &self,
        constraints: &NegotiationConstraints,
    ) -> Result<SessionDescription, PeerConnectionError> {
        if let Some(closed) = self.record(FakeCall::CreateOffer(*constraints)) {
            return Err(closed);
        }
        let mut state = self.state.lock();
        if let Some(error) = state.failures.create_offer.take() {
            return Err(error);
        }
        Ok(SessionDescription::offer(state.offer_sdp.clone()))
    }

    async fn create_answer(
        &self,
        constraints: &NegotiationConstraints,
    ) -> Result<SessionDescription, PeerConnectionError> {
        if let Some(closed) = self.record(FakeCall::CreateAnswer(*constraints)) {
            return Err(closed);
        }
        let mut state = self.state.lock();
        if let Some(error) = state.failures.create_answer.take() {
            return Err(error);
        }
        if state.signaling_state != SignalingState::HaveRemoteOffer {
            return Err(Self::invalid(state.signaling_state, "create answer"));
        }
        Ok(SessionDescription::answer(state.answer_sdp.clone()))
    }

    async fn set_local_description(
        &self,
        description: &SessionDescription,
    ) -> Result<(), PeerConnectionError> {
        if let Some(closed) = self.record(FakeCall::SetLocalDescription(description.clone())) {
            return Err(closed);
        }
        let hold = self.state.lock().hold_set_local;
        if hold {
            self.set_local_started.notify_one();
            self.set_local_gate.notified().await;
        }

        let mut state = self.state.lock();
        if let Some(error) = state.failures.set_local.take() {
            return Err(error);
        }
        let next = match (description.sdp_type, state.signaling_state) {
            (SdpType::Offer, SignalingState::Stable | SignalingState::HaveLocalOffer) => {
                SignalingState::HaveLocalOffer
            }
            (SdpType::Answer, SignalingState::HaveRemoteOffer) => SignalingState::Stable,
            (_, current) => return Err(Self::invalid(current, "set local description")),
        };
        state.signaling_state = next;
        state.local = Some(description.clone());
        Ok(())
    }

    async fn set_remote_description(
        &self,
        description: &SessionDescription,
    ) -> Result<(), PeerConnectionError> {
        if let Some(closed) = self.record(FakeCall::SetRemoteDescription(description.clone())) {
            return Err(closed);
        }
        let mut state = self.state.lock();
        if let Some(error) = state.failures.set_remote.take() {
            return Err(error);
        }
        let next = match (description.sdp_type, state.signaling_state) {
            // A remote offer over a local one rolls the local offer back.
            (SdpType::Offer, SignalingState::Stable | SignalingState::HaveLocalOffer) => {
                SignalingState::HaveRemoteOffer
            }
            (SdpType::Answer, SignalingState::HaveLocalOffer) => SignalingState::Stable,
            (_, current) => return Err(Self::invalid(current, "set remote description")),
        };
        state.signaling_state = next;
        state.remote = Some(description.clone());
        Ok(())
    }

    async fn add_ice_candidate(
        &self,
        candidate: &IceCandidateInit,
    ) -> Result<(), PeerConnectionError> {
        if let Some(closed) = self.record(FakeCall::AddIceCandidate(candidate.clone())) {
            return Err(closed);
        }
        let mut state = self.state.lock();
        if let Some(error) = state.failures.add_candidate.take() {
            return Err(error);
        }
        if state.remote.is_none() {
            return Err(PeerConnectionError::Ice(
                "no remote description for candidate".to_string(),
            ));
        }
        Ok(())
    }

    async fn stats_snapshot(&self) -> Result<StatsSnapshot, PeerConnectionError> {
        if let Some(closed) = self.record(FakeCall::StatsSnapshot) {
            return Err(closed);
        }
        let mut state = self.state.lock();
        match state.failures.stats.take() {
            Some(error) => Err(error),
            None => Ok(state.stats.clone()),
        }
    }

    async fn close(&self) {
        let mut state = self.state.lock();
        state.calls.push(FakeCall::Close);
        state.signaling_state = SignalingState::Closed;
    }
}

/// Keeps every message handed to the signaling channel.
#[derive(Default)]
pub struct RecordingSignaling {
    messages: Mutex<Vec<SignalingMessage>>,
}

impl RecordingSignaling {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages(&self) -> Vec<SignalingMessage> {
        self.messages.lock().clone()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.messages
            .lock()
            .iter()
            .filter(|message| message.kind() == kind)
            .count()
    }

    pub fn take(&self) -> Vec<SignalingMessage> {
        std::mem::take(&mut *self.messages.lock())
    }
}

impl SignalingPort for RecordingSignaling {
    fn send(&self, message: SignalingMessage) {
        self.messages.lock().push(message);
    }
}

/// Keeps every telemetry event.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().clone()
    }

    pub fn negotiation_stages(&self) -> Vec<NegotiationStage> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ReportEvent::Negotiation(stats) => Some(stats.state),
                _ => None,
            })
            .collect()
    }

    pub fn handshake_progress(&self) -> Vec<HandshakeProgress> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ReportEvent::HandshakeProgress(event) => Some(event.progress),
                _ => None,
            })
            .collect()
    }

    pub fn candidate_states(&self) -> Vec<CandidateState> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ReportEvent::IceCandidate(stats) => Some(stats.state),
                _ => None,
            })
            .collect()
    }
}

impl ReportingPort for RecordingReporter {
    fn report(&self, event: ReportEvent) {
        self.events.lock().push(event);
    }
}
