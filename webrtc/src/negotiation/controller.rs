//! Offer/answer state machine driven per remote peer.
//!
//! The controller owns one [`PeerNegotiationSession`] per peer in a registry
//! guarded by a `parking_lot::Mutex`. The lock is taken for short,
//! synchronous sections only: every native call is awaited with the lock
//! released, and the session is looked up again afterwards by `(peer, epoch)`
//! so that a continuation never acts on a session that was closed, or closed
//! and recreated, while it was suspended.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::error::{GuardRejection, NegotiationError};
use super::policy::{GlarePolicy, GlareResolution, IgnoreRemoteOffer, NegotiationPolicy};
use super::report::{
    CandidateState, HandshakeProgress, HandshakeProgressEvent, IceAgentStats, IceCandidateStats,
    NegotiationStage, NegotiationStats, ReportEvent, ReportingPort,
};
use super::session::{
    LocalIdentity, PeerConfig, PeerNegotiationSession, SessionSnapshot,
    MAX_PENDING_REMOTE_CANDIDATES,
};
use super::signaling::{CandidateMessage, RoutingMessage, SignalingMessage, SignalingPort};
use crate::ice::{candidate_pair_infos, IceCandidateInit};
use crate::rtc::sdp_negotiation::{answer_constraints, offer_constraints};
use crate::rtc::{RtcPeerConnection, SignalingState};
use crate::sdp::{SdpTransformPipeline, SdpType, SessionDescription};

/// Label of the data channel opened with the first offer to a peer.
pub const MAIN_CHANNEL: &str = "main";

/// What an operation ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationStep {
    /// Local description applied and transmitted.
    Sent(SdpType),
    /// Local description applied, transmission waits for gathering to finish.
    AwaitingGathering(SdpType),
    RemoteApplied(SdpType),
    CandidateAdded,
    CandidateQueued,
    CandidateSent,
    EndOfCandidatesSent,
    Reported,
    Closed,
    /// Nothing to do.
    Idle,
}

pub type NegotiationResult = Result<NegotiationStep, NegotiationError>;

struct Shared<C: ?Sized> {
    identity: LocalIdentity,
    policy: NegotiationPolicy,
    signaling: Arc<dyn SignalingPort>,
    reporting: Arc<dyn ReportingPort>,
    glare: Box<dyn GlarePolicy>,
    sessions: Mutex<HashMap<String, PeerNegotiationSession<C>>>,
    next_epoch: AtomicU64,
}

pub struct NegotiationControllerBuilder<C: ?Sized> {
    identity: LocalIdentity,
    signaling: Arc<dyn SignalingPort>,
    reporting: Arc<dyn ReportingPort>,
    policy: NegotiationPolicy,
    glare: Box<dyn GlarePolicy>,
    _connection: PhantomData<fn() -> Arc<C>>,
}

impl<C: RtcPeerConnection + ?Sized> NegotiationControllerBuilder<C> {
    pub fn policy(mut self, policy: NegotiationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn glare_policy(mut self, glare: impl GlarePolicy + 'static) -> Self {
        self.glare = Box::new(glare);
        self
    }

    pub fn build(self) -> NegotiationController<C> {
        NegotiationController {
            shared: Arc::new(Shared {
                identity: self.identity,
                policy: self.policy,
                signaling: self.signaling,
                reporting: self.reporting,
                glare: self.glare,
                sessions: Mutex::new(HashMap::new()),
                next_epoch: AtomicU64::new(1),
            }),
        }
    }
}

/// Cheap to clone; clones share the same registry.
pub struct NegotiationController<C: RtcPeerConnection + ?Sized> {
    shared: Arc<Shared<C>>,
}

impl<C: RtcPeerConnection + ?Sized> Clone for NegotiationController<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: RtcPeerConnection + ?Sized> NegotiationController<C> {
    pub fn builder(
        identity: LocalIdentity,
        signaling: Arc<dyn SignalingPort>,
        reporting: Arc<dyn ReportingPort>,
    ) -> NegotiationControllerBuilder<C> {
        NegotiationControllerBuilder {
            identity,
            signaling,
            reporting,
            policy: NegotiationPolicy::default(),
            glare: Box::new(IgnoreRemoteOffer),
            _connection: PhantomData,
        }
    }

    pub fn identity(&self) -> &LocalIdentity {
        &self.shared.identity
    }

    pub fn policy(&self) -> &NegotiationPolicy {
        &self.shared.policy
    }

    /// Registers a peer and takes ownership of its connection.
    pub fn add_peer(
        &self,
        peer_id: &str,
        connection: Arc<C>,
        config: PeerConfig,
    ) -> Result<(), NegotiationError> {
        let mut sessions = self.shared.sessions.lock();
        if sessions.contains_key(peer_id) {
            warn!(peer_id, "peer already has a negotiation session");
            return Err(GuardRejection::AlreadyExists.into());
        }
        let epoch = self.shared.next_epoch.fetch_add(1, Ordering::Relaxed);
        sessions.insert(
            peer_id.to_string(),
            PeerNegotiationSession::new(peer_id.to_string(), connection, config, epoch),
        );
        info!(peer_id, epoch, "negotiation session created");
        Ok(())
    }

    pub fn set_remote_priority_weight(&self, peer_id: &str, weight: f64) -> bool {
        self.shared
            .sessions
            .lock()
            .get_mut(peer_id)
            .map(|session| session.set_remote_priority_weight(weight))
            .is_some()
    }

    pub fn snapshot(&self, peer_id: &str) -> Option<SessionSnapshot> {
        self.shared
            .sessions
            .lock()
            .get(peer_id)
            .map(PeerNegotiationSession::snapshot)
    }

    pub fn peer_ids(&self) -> Vec<String> {
        let mut peers: Vec<String> = self.shared.sessions.lock().keys().cloned().collect();
        peers.sort();
        peers
    }

    pub async fn on_negotiation_needed(&self, peer_id: &str) -> NegotiationResult {
        self.create_offer(peer_id, false).await
    }

    pub async fn create_offer(&self, peer_id: &str, ice_restart_requested: bool) -> NegotiationResult {
        let policy = &self.shared.policy;
        let prepared = {
            let mut sessions = self.shared.sessions.lock();
            match sessions.get_mut(peer_id) {
                None => Err(GuardRejection::MissingSession),
                Some(session) => {
                    let state = session.refresh_state();
                    if state != SignalingState::Stable {
                        Err(GuardRejection::InvalidState {
                            expected: SignalingState::Stable,
                            actual: state,
                        })
                    } else {
                        let connection = session.connection();
                        self.attach_media(peer_id, connection.as_ref());
                        if policy.enable_data_channel
                            && session.config().enable_data_channel
                            && !session.has_main_channel()
                        {
                            match connection.create_data_channel(MAIN_CHANNEL) {
                                Ok(()) => session.mark_main_channel(),
                                Err(e) => warn!(peer_id, error = %e, "failed to create main data channel"),
                            }
                        }
                        let constraints =
                            offer_constraints(policy, peer_id, session.config(), ice_restart_requested);
                        session.begin_candidate_cycle(constraints.ice_restart);
                        session.set_pending_constraints(constraints);
                        Ok((connection, session.epoch(), constraints))
                    }
                }
            }
        };
        let (connection, epoch, constraints) = match prepared {
            Ok(prepared) => prepared,
            Err(rejection) => return self.reject(peer_id, "create offer", rejection),
        };

        debug!(peer_id, ?constraints, "creating offer");
        let offer = match connection.create_offer(&constraints).await {
            Ok(offer) => offer,
            Err(e) => {
                error!(peer_id, error = %e, "failed to create offer");
                self.progress(peer_id, HandshakeProgress::Error, Some(e.to_string()));
                self.report_negotiation(
                    peer_id,
                    NegotiationStage::ErrorCreateOffer,
                    None,
                    Some(e.to_string()),
                );
                return Err(NegotiationError::CreateOffer(e));
            }
        };

        self.report_negotiation(peer_id, NegotiationStage::LocalOffer, Some(&offer), None);
        self.apply_local(peer_id, Some(epoch), offer).await
    }

    pub async fn create_answer(&self, peer_id: &str) -> NegotiationResult {
        self.create_answer_for(peer_id, None).await
    }

    async fn create_answer_for(&self, peer_id: &str, expected_epoch: Option<u64>) -> NegotiationResult {
        let policy = &self.shared.policy;
        let prepared = {
            let mut sessions = self.shared.sessions.lock();
            match sessions.get_mut(peer_id) {
                None => Err(GuardRejection::MissingSession),
                Some(session) if expected_epoch.is_some_and(|epoch| epoch != session.epoch()) => {
                    Err(GuardRejection::Closed)
                }
                Some(session) => {
                    let state = session.refresh_state();
                    if state != SignalingState::HaveRemoteOffer {
                        Err(GuardRejection::InvalidState {
                            expected: SignalingState::HaveRemoteOffer,
                            actual: state,
                        })
                    } else {
                        let connection = session.connection();
                        self.attach_media(peer_id, connection.as_ref());
                        let remote = connection.remote_description();
                        let constraints =
                            answer_constraints(policy, peer_id, session.config(), remote.as_ref());
                        session.set_pending_constraints(constraints);
                        Ok((connection, session.epoch(), constraints))
                    }
                }
            }
        };
        let (connection, epoch, constraints) = match prepared {
            Ok(prepared) => prepared,
            Err(rejection) => return self.reject(peer_id, "create answer", rejection),
        };

        debug!(peer_id, ?constraints, "creating answer");
        let answer = match connection.create_answer(&constraints).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(peer_id, error = %e, "failed to create answer");
                self.progress(peer_id, HandshakeProgress::Error, Some(e.to_string()));
                self.report_negotiation(
                    peer_id,
                    NegotiationStage::ErrorCreateAnswer,
                    None,
                    Some(e.to_string()),
                );
                return Err(NegotiationError::CreateAnswer(e));
            }
        };

        self.apply_local(peer_id, Some(epoch), answer).await
    }

    /// Transforms, applies and transmits a local description.
    pub async fn set_local_and_send(
        &self,
        peer_id: &str,
        description: SessionDescription,
    ) -> NegotiationResult {
        self.apply_local(peer_id, None, description).await
    }

    async fn apply_local(
        &self,
        peer_id: &str,
        expected_epoch: Option<u64>,
        description: SessionDescription,
    ) -> NegotiationResult {
        let sdp_type = description.sdp_type;
        let operation = match sdp_type {
            SdpType::Offer => "set local offer",
            SdpType::Answer => "set local answer",
        };
        if description.is_empty() {
            return self.reject(peer_id, operation, GuardRejection::EmptyDescription);
        }

        let claimed = {
            let mut sessions = self.shared.sessions.lock();
            match sessions.get_mut(peer_id) {
                None => Err(GuardRejection::MissingSession),
                Some(session) if expected_epoch.is_some_and(|epoch| epoch != session.epoch()) => {
                    Err(GuardRejection::Closed)
                }
                Some(session) => {
                    let expected = match sdp_type {
                        SdpType::Offer => SignalingState::Stable,
                        SdpType::Answer => SignalingState::HaveRemoteOffer,
                    };
                    let state = session.refresh_state();
                    if state != expected {
                        Err(GuardRejection::InvalidState {
                            expected,
                            actual: state,
                        })
                    } else if session.is_processing_local_description() {
                        Err(GuardRejection::InFlight)
                    } else {
                        session.set_processing_local_description(true);
                        Ok((session.connection(), session.epoch()))
                    }
                }
            }
        };
        let (connection, epoch) = match claimed {
            Ok(claimed) => claimed,
            Err(rejection) => return self.reject(peer_id, operation, rejection),
        };

        let transformed = SdpTransformPipeline::new(&self.shared.policy).apply(peer_id, &description);
        let applied = connection.set_local_description(&transformed).await;

        let outcome = {
            let mut sessions = self.shared.sessions.lock();
            match sessions.get_mut(peer_id) {
                Some(session) if session.epoch() == epoch => {
                    session.set_processing_local_description(false);
                    session.refresh_state();
                    if applied.is_ok() {
                        session.record_local_description(sdp_type);
                        if !self.shared.policy.enable_ice_trickle && !session.ice_gathering_complete() {
                            session.hold_for_gathering(transformed.clone());
                            Some(false)
                        } else {
                            Some(true)
                        }
                    } else {
                        Some(false)
                    }
                }
                _ => None,
            }
        };
        let Some(transmit) = outcome else {
            return self.reject(peer_id, operation, GuardRejection::Closed);
        };

        if let Err(e) = applied {
            error!(peer_id, %sdp_type, error = %e, "failed to apply local description");
            self.progress(peer_id, HandshakeProgress::Error, Some(e.to_string()));
            self.report_negotiation(
                peer_id,
                NegotiationStage::local_failed(sdp_type),
                Some(&transformed),
                Some(e.to_string()),
            );
            return Err(NegotiationError::SetLocalDescription { sdp_type, source: e });
        }

        info!(peer_id, %sdp_type, "local description applied");
        self.progress(peer_id, sdp_type.into(), None);
        self.report_negotiation(peer_id, NegotiationStage::local(sdp_type), Some(&transformed), None);

        if !transmit {
            debug!(peer_id, %sdp_type, "holding local description until gathering completes");
            return Ok(NegotiationStep::AwaitingGathering(sdp_type));
        }
        let rendered = connection
            .local_description()
            .filter(|current| current.sdp_type == sdp_type)
            .unwrap_or(transformed);
        self.send_description(peer_id, &rendered);
        Ok(NegotiationStep::Sent(sdp_type))
    }

    pub async fn on_remote_description(
        &self,
        peer_id: &str,
        description: SessionDescription,
    ) -> NegotiationResult {
        let sdp_type = description.sdp_type;
        let operation = match sdp_type {
            SdpType::Offer => "set remote offer",
            SdpType::Answer => "set remote answer",
        };
        if description.is_empty() {
            return self.reject(peer_id, operation, GuardRejection::EmptyDescription);
        }

        let checked = {
            let mut sessions = self.shared.sessions.lock();
            match sessions.get_mut(peer_id) {
                None => Err(GuardRejection::MissingSession),
                Some(session) => {
                    let state = session.refresh_state();
                    match sdp_type {
                        _ if state == SignalingState::Closed => Err(GuardRejection::Closed),
                        SdpType::Offer if state != SignalingState::Stable => {
                            let resolution = self.shared.glare.resolve(
                                peer_id,
                                self.shared.identity.priority_weight,
                                session.remote_priority_weight(),
                            );
                            match resolution {
                                GlareResolution::IgnoreRemote => Err(GuardRejection::Glare { state }),
                                GlareResolution::AcceptRemote => {
                                    info!(peer_id, %state, "accepting colliding remote offer");
                                    Ok((session.connection(), session.epoch()))
                                }
                            }
                        }
                        SdpType::Answer if state != SignalingState::HaveLocalOffer => {
                            Err(GuardRejection::InvalidState {
                                expected: SignalingState::HaveLocalOffer,
                                actual: state,
                            })
                        }
                        _ => Ok((session.connection(), session.epoch())),
                    }
                }
            }
        };
        let (connection, epoch) = match checked {
            Ok(checked) => checked,
            Err(rejection) => return self.reject(peer_id, operation, rejection),
        };

        // A changed remote ufrag means the remote restarted ICE.
        let ice_restart = sdp_type == SdpType::Offer
            && connection
                .remote_description()
                .as_ref()
                .and_then(SessionDescription::ice_ufrag)
                != description.ice_ufrag();
        let applied = connection.set_remote_description(&description).await;

        let pending = {
            let mut sessions = self.shared.sessions.lock();
            match sessions.get_mut(peer_id) {
                Some(session) if session.epoch() == epoch => {
                    session.refresh_state();
                    if applied.is_err() {
                        Some(Vec::new())
                    } else {
                        if sdp_type == SdpType::Offer {
                            session.begin_candidate_cycle(ice_restart);
                        }
                        Some(session.take_pending_remote_candidates())
                    }
                }
                _ => None,
            }
        };
        let Some(pending) = pending else {
            return self.reject(peer_id, operation, GuardRejection::Closed);
        };

        if let Err(e) = applied {
            error!(peer_id, %sdp_type, error = %e, "failed to apply remote description");
            self.progress(peer_id, HandshakeProgress::Error, Some(e.to_string()));
            self.report_negotiation(
                peer_id,
                NegotiationStage::remote_failed(sdp_type),
                Some(&description),
                Some(e.to_string()),
            );
            return Err(NegotiationError::SetRemoteDescription { sdp_type, source: e });
        }

        info!(peer_id, %sdp_type, "remote description applied");
        self.progress(peer_id, sdp_type.into(), None);
        self.report_negotiation(peer_id, NegotiationStage::remote(sdp_type), Some(&description), None);

        if !pending.is_empty() {
            debug!(peer_id, count = pending.len(), "adding queued remote candidates");
        }
        for candidate in pending {
            // Failures are reported per candidate.
            let _ = self.add_candidate(peer_id, connection.as_ref(), &candidate).await;
        }

        match sdp_type {
            SdpType::Offer => self.create_answer_for(peer_id, Some(epoch)).await,
            SdpType::Answer => Ok(NegotiationStep::RemoteApplied(SdpType::Answer)),
        }
    }

    pub async fn on_remote_candidate(
        &self,
        peer_id: &str,
        candidate: IceCandidateInit,
    ) -> NegotiationResult {
        self.report_candidate(peer_id, &candidate.candidate, CandidateState::Received, None);

        let routed = {
            let mut sessions = self.shared.sessions.lock();
            match sessions.get_mut(peer_id) {
                None => Err(GuardRejection::MissingSession),
                Some(session) => {
                    let connection = session.connection();
                    if connection.remote_description().is_some() {
                        Ok(Some(connection))
                    } else if session.queue_remote_candidate(candidate.clone()) {
                        Ok(None)
                    } else {
                        Err(GuardRejection::CandidateQueueFull {
                            limit: MAX_PENDING_REMOTE_CANDIDATES,
                        })
                    }
                }
            }
        };

        match routed {
            Err(rejection) => {
                self.report_candidate(
                    peer_id,
                    &candidate.candidate,
                    CandidateState::Dropped,
                    Some(rejection.to_string()),
                );
                self.reject(peer_id, "add remote candidate", rejection)
            }
            Ok(None) => {
                debug!(peer_id, "queueing remote candidate until a remote description is set");
                self.report_candidate(peer_id, &candidate.candidate, CandidateState::Queued, None);
                Ok(NegotiationStep::CandidateQueued)
            }
            Ok(Some(connection)) => self.add_candidate(peer_id, connection.as_ref(), &candidate).await,
        }
    }

    async fn add_candidate(
        &self,
        peer_id: &str,
        connection: &C,
        candidate: &IceCandidateInit,
    ) -> NegotiationResult {
        match connection.add_ice_candidate(candidate).await {
            Ok(()) => {
                self.report_candidate(peer_id, &candidate.candidate, CandidateState::Added, None);
                Ok(NegotiationStep::CandidateAdded)
            }
            Err(e) => {
                error!(peer_id, candidate = %candidate.candidate, error = %e, "failed to add remote candidate");
                self.report_candidate(
                    peer_id,
                    &candidate.candidate,
                    CandidateState::Failed,
                    Some(e.to_string()),
                );
                Err(NegotiationError::AddCandidate(e))
            }
        }
    }

    /// Forwards a freshly gathered local candidate when trickle is enabled.
    pub async fn on_local_candidate(
        &self,
        peer_id: &str,
        candidate: IceCandidateInit,
    ) -> NegotiationResult {
        if !self.shared.sessions.lock().contains_key(peer_id) {
            return self.reject(peer_id, "send local candidate", GuardRejection::MissingSession);
        }
        if !self.shared.policy.enable_ice_trickle {
            debug!(peer_id, "trickle disabled, candidate travels in the description");
            return Ok(NegotiationStep::Idle);
        }

        let identity = &self.shared.identity;
        self.shared.signaling.send(SignalingMessage::Candidate(CandidateMessage {
            candidate: candidate.candidate.clone(),
            sdp_mid: candidate.sdp_mid.clone(),
            sdp_m_line_index: candidate.sdp_m_line_index,
            mid: identity.session_id.clone(),
            target: peer_id.to_string(),
            rid: identity.room_id.clone(),
        }));
        self.report_candidate(peer_id, &candidate.candidate, CandidateState::Gathered, None);
        Ok(NegotiationStep::CandidateSent)
    }

    pub async fn on_ice_gathering_complete(&self, peer_id: &str) -> NegotiationResult {
        let trickle = self.shared.policy.enable_ice_trickle;
        let state = {
            let mut sessions = self.shared.sessions.lock();
            sessions.get_mut(peer_id).map(|session| {
                session.mark_gathering_complete();
                let held = session.take_pending_transmission();
                let end_of_candidates = trickle && session.claim_end_of_candidates();
                (session.connection(), held, end_of_candidates)
            })
        };
        let Some((connection, held, end_of_candidates)) = state else {
            return self.reject(peer_id, "complete gathering", GuardRejection::MissingSession);
        };
        debug!(peer_id, "ice gathering complete");

        let mut step = NegotiationStep::Idle;
        if let Some(held) = held {
            let sdp_type = held.sdp_type;
            let rendered = connection
                .local_description()
                .filter(|current| current.sdp_type == sdp_type)
                .unwrap_or(held);
            info!(peer_id, %sdp_type, "sending local description held for gathering");
            self.send_description(peer_id, &rendered);
            step = NegotiationStep::Sent(sdp_type);
        }
        if end_of_candidates {
            let identity = &self.shared.identity;
            self.shared
                .signaling
                .send(SignalingMessage::EndOfCandidates(RoutingMessage {
                    mid: identity.session_id.clone(),
                    target: peer_id.to_string(),
                    rid: identity.room_id.clone(),
                }));
            if step == NegotiationStep::Idle {
                step = NegotiationStep::EndOfCandidatesSent;
            }
        }
        Ok(step)
    }

    /// Closes the peer's session. Closing twice is not an error.
    pub async fn on_peer_closed(&self, peer_id: &str) -> NegotiationResult {
        let removed = self.shared.sessions.lock().remove(peer_id);
        let Some(mut session) = removed else {
            debug!(peer_id, "peer already closed");
            return Ok(NegotiationStep::Idle);
        };
        session.close();
        session.connection().close().await;
        info!(peer_id, epoch = session.epoch(), "negotiation session closed");
        Ok(NegotiationStep::Closed)
    }

    /// Closes every session. Returns how many were open.
    pub async fn leave_room(&self) -> usize {
        let sessions: Vec<PeerNegotiationSession<C>> = {
            let mut registry = self.shared.sessions.lock();
            registry.drain().map(|(_, session)| session).collect()
        };
        let count = sessions.len();
        for mut session in sessions {
            session.close();
            session.connection().close().await;
            debug!(peer_id = session.peer_id(), "negotiation session closed on leave");
        }
        info!(room_id = %self.shared.identity.room_id, count, "left room");
        count
    }

    /// Reports the candidates of every pair in the connection's stats.
    pub async fn report_ice_agent_state(&self, peer_id: &str, state: &str) -> NegotiationResult {
        let connection = self
            .shared
            .sessions
            .lock()
            .get(peer_id)
            .map(PeerNegotiationSession::connection);
        let Some(connection) = connection else {
            return self.reject(peer_id, "report ice agent state", GuardRejection::MissingSession);
        };

        let snapshot = connection.stats_snapshot().await.map_err(|e| {
            warn!(peer_id, error = %e, "failed to read candidate pair stats");
            NegotiationError::Stats(e)
        })?;
        let (local_candidates, remote_candidates) = candidate_pair_infos(&snapshot);
        self.shared.reporting.report(ReportEvent::IceAgent(IceAgentStats {
            peer_id: peer_id.to_string(),
            state: state.to_string(),
            is_trickle: self.shared.policy.enable_ice_trickle,
            local_candidates,
            remote_candidates,
        }));
        Ok(NegotiationStep::Reported)
    }

    fn attach_media(&self, peer_id: &str, connection: &C) {
        if !self.shared.policy.attaches_media_for(peer_id) {
            debug!(peer_id, "not attaching local media, room uses a relay");
            return;
        }
        if let Err(e) = connection.attach_local_media() {
            warn!(peer_id, error = %e, "failed to attach local media");
        }
    }

    fn reject(&self, peer_id: &str, operation: &'static str, rejection: GuardRejection) -> NegotiationResult {
        warn!(peer_id, operation, reason = %rejection, "negotiation step dropped");
        Err(rejection.into())
    }

    fn send_description(&self, peer_id: &str, description: &SessionDescription) {
        let identity = &self.shared.identity;
        let weight = match description.sdp_type {
            SdpType::Offer => Some(identity.priority_weight),
            SdpType::Answer => None,
        };
        self.shared.signaling.send(SignalingMessage::from_description(
            description,
            &identity.session_id,
            peer_id,
            &identity.room_id,
            identity.user_info.clone(),
            weight,
        ));
    }

    fn progress(&self, peer_id: &str, progress: HandshakeProgress, error: Option<String>) {
        self.shared
            .reporting
            .report(ReportEvent::HandshakeProgress(HandshakeProgressEvent {
                peer_id: peer_id.to_string(),
                progress,
                error,
            }));
    }

    fn report_negotiation(
        &self,
        peer_id: &str,
        state: NegotiationStage,
        description: Option<&SessionDescription>,
        error: Option<String>,
    ) {
        self.shared.reporting.report(ReportEvent::Negotiation(NegotiationStats {
            peer_id: peer_id.to_string(),
            state,
            weight: self.shared.identity.priority_weight,
            sdp: description.map(|d| d.sdp.clone()),
            sdp_type: description.map(|d| d.sdp_type),
            error,
        }));
    }

    fn report_candidate(&self, peer_id: &str, candidate: &str, state: CandidateState, error: Option<String>) {
        self.shared.reporting.report(ReportEvent::IceCandidate(IceCandidateStats {
            peer_id: peer_id.to_string(),
            candidate: candidate.to_string(),
            state,
            error,
        }));
    }
}
