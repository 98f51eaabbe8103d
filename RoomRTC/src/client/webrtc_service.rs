use std::sync::Arc;

use room_negotiation::negotiation::signaling::ByeMessage;
use room_negotiation::negotiation::PeerConfig;
use room_negotiation::{
    NegotiationController, NegotiationStep, ReportingPort, RtcPeerConnection, SessionDescription,
    SignalingMessage, SignalingPort,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::client::signaling_client::parse_inbound;
use crate::config::AppConfig;
use crate::error::ClientError;

/// Builds the connection for a peer whose first message is an offer.
pub type ConnectionFactory<C> = Arc<dyn Fn(&str) -> Arc<C> + Send + Sync>;

/// One participant in a room: routes signaling traffic into the negotiation
/// controller.
pub struct RoomSession<C: RtcPeerConnection + ?Sized> {
    controller: NegotiationController<C>,
    signaling: Arc<dyn SignalingPort>,
    connection_factory: Option<ConnectionFactory<C>>,
}

impl<C: RtcPeerConnection + ?Sized> RoomSession<C> {
    pub fn new(
        config: &AppConfig,
        session_id: &str,
        signaling: Arc<dyn SignalingPort>,
        reporting: Arc<dyn ReportingPort>,
    ) -> Self {
        let controller =
            NegotiationController::builder(config.local_identity(session_id), signaling.clone(), reporting)
                .policy(config.negotiation.clone())
                .build();
        Self::from_controller(controller, signaling)
    }

    pub fn from_controller(
        controller: NegotiationController<C>,
        signaling: Arc<dyn SignalingPort>,
    ) -> Self {
        Self {
            controller,
            signaling,
            connection_factory: None,
        }
    }

    pub fn with_connection_factory(
        mut self,
        factory: impl Fn(&str) -> Arc<C> + Send + Sync + 'static,
    ) -> Self {
        self.connection_factory = Some(Arc::new(factory));
        self
    }

    pub fn controller(&self) -> &NegotiationController<C> {
        &self.controller
    }

    pub fn session_id(&self) -> &str {
        &self.controller.identity().session_id
    }

    /// Registers a peer that will call us.
    pub fn register_peer(
        &self,
        peer_id: &str,
        connection: Arc<C>,
        config: PeerConfig,
    ) -> Result<(), ClientError> {
        Ok(self.controller.add_peer(peer_id, connection, config)?)
    }

    /// Registers a peer and sends it an offer.
    pub async fn connect_peer(
        &self,
        peer_id: &str,
        connection: Arc<C>,
        config: PeerConfig,
    ) -> Result<NegotiationStep, ClientError> {
        self.register_peer(peer_id, connection, config)?;
        Ok(self.controller.on_negotiation_needed(peer_id).await?)
    }

    pub async fn handle_line(&self, line: &str) -> Result<NegotiationStep, ClientError> {
        let message = parse_inbound(line)?;
        self.dispatch(message).await
    }

    pub async fn dispatch(&self, message: SignalingMessage) -> Result<NegotiationStep, ClientError> {
        let from = message.from_id().to_string();
        if from == self.session_id() {
            return Ok(NegotiationStep::Idle);
        }
        if let Some(target) = message.target() {
            if target != self.session_id() {
                debug!(kind = message.kind(), from = %from, to = target, "message for another peer");
                return Ok(NegotiationStep::Idle);
            }
        }

        match message {
            SignalingMessage::Offer(offer) => {
                self.ensure_peer(&from);
                if let Some(weight) = offer.weight {
                    self.controller.set_remote_priority_weight(&from, weight);
                }
                let description = SessionDescription::offer(offer.sdp);
                Ok(self.controller.on_remote_description(&from, description).await?)
            }
            SignalingMessage::Answer(answer) => {
                let description = SessionDescription::answer(answer.sdp);
                Ok(self.controller.on_remote_description(&from, description).await?)
            }
            SignalingMessage::Candidate(candidate) => Ok(self
                .controller
                .on_remote_candidate(&from, candidate.to_init())
                .await?),
            SignalingMessage::EndOfCandidates(_) => {
                debug!(peer_id = %from, "remote finished gathering");
                Ok(NegotiationStep::Idle)
            }
            SignalingMessage::Bye(_) => Ok(self.controller.on_peer_closed(&from).await?),
        }
    }

    fn ensure_peer(&self, peer_id: &str) {
        let Some(factory) = &self.connection_factory else {
            return;
        };
        if self.controller.snapshot(peer_id).is_some() {
            return;
        }
        if let Err(e) = self
            .controller
            .add_peer(peer_id, (**factory)(peer_id), PeerConfig::default())
        {
            warn!(peer_id, error = %e, "failed to register calling peer");
        }
    }

    /// Handles inbound lines until the transport closes the channel.
    pub async fn run(&self, mut inbound: UnboundedReceiver<String>) {
        while let Some(line) = inbound.recv().await {
            if let Err(e) = self.handle_line(&line).await {
                warn!(error = %e, "inbound signaling message failed");
            }
        }
        info!(session_id = self.session_id(), "signaling channel closed");
    }

    /// Says goodbye to the room and closes every session.
    pub async fn leave(&self) -> usize {
        let identity = self.controller.identity();
        self.signaling.send(SignalingMessage::Bye(ByeMessage {
            mid: identity.session_id.clone(),
            rid: identity.room_id.clone(),
            target: None,
        }));
        self.controller.leave_room().await
    }
}
