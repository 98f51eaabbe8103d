//! Turns negotiation telemetry into stats-server requests.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{SecondsFormat, Utc};
use rand::Rng;
use room_negotiation::ice::CandidateType;
use room_negotiation::negotiation::report::{IceAgentStats, IceCandidateStats, NegotiationStats};
use room_negotiation::{ReportEvent, ReportingPort};
use serde_json::{json, Map, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::config::AppConfig;

/// Stats server endpoints, relative to `/rest/stats/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsEndpoint {
    IceConnection,
    IceCandidate,
    Negotiation,
}

impl StatsEndpoint {
    pub fn path(self) -> &'static str {
        match self {
            StatsEndpoint::IceConnection => "client/iceconnection",
            StatsEndpoint::IceCandidate => "client/icecandidate",
            StatsEndpoint::Negotiation => "client/negotiation",
        }
    }
}

/// A POST the delivery layer should perform.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsRequest {
    pub url: String,
    pub body: Value,
}

pub fn build_stats_url(force_ssl: bool, stats_url: &str, endpoint: StatsEndpoint) -> String {
    let scheme = if force_ssl { "https:" } else { "http:" };
    format!("{scheme}{stats_url}/rest/stats/{}", endpoint.path())
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// `<owner>_<now_ms + random>`, with `dummy` when there is no owner.
pub fn create_client_id(owner: Option<&str>) -> String {
    let salt = rand::thread_rng().gen_range(0..1_000_000u64);
    format!("{}_{}", owner.unwrap_or("dummy"), now_ms() + salt)
}

fn candidate_kind(candidate: &str) -> String {
    candidate
        .split_whitespace()
        .skip_while(|token| *token != "typ")
        .nth(1)
        .and_then(|kind| kind.parse::<CandidateType>().ok())
        .map_or_else(|| "unknown".to_string(), |kind| kind.to_string())
}

pub struct StatsReporter {
    enabled: bool,
    force_ssl: bool,
    stats_url: String,
    client_id: String,
    app_key: String,
    room_id: String,
    user_id: String,
    session_id: String,
    outgoing: UnboundedSender<StatsRequest>,
}

impl StatsReporter {
    pub fn new(
        config: &AppConfig,
        session_id: impl Into<String>,
        outgoing: UnboundedSender<StatsRequest>,
    ) -> Self {
        Self {
            enabled: config.enable_stats,
            force_ssl: config.force_ssl,
            stats_url: config.stats_url.clone(),
            client_id: create_client_id(config.app_key_owner.as_deref()),
            app_key: config.app_key.clone(),
            room_id: config.room_id.clone(),
            user_id: config.user_id.clone(),
            session_id: session_id.into(),
            outgoing,
        }
    }

    pub fn channel(
        config: &AppConfig,
        session_id: impl Into<String>,
    ) -> (Self, UnboundedReceiver<StatsRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(config, session_id, tx), rx)
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn base(&self, remote_peer_id: &str) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("client_id".into(), json!(self.client_id));
        body.insert("app_key".into(), json!(self.app_key));
        body.insert("room_id".into(), json!(self.room_id));
        body.insert(
            "timestamp".into(),
            json!(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        body.insert("user_id".into(), json!(self.user_id));
        body.insert("peer_id".into(), json!(self.session_id));
        body.insert("remote_peer_id".into(), json!(remote_peer_id));
        body
    }

    fn negotiation(&self, stats: &NegotiationStats) -> Value {
        let mut body = self.base(&stats.peer_id);
        body.insert("state".into(), json!(stats.state.as_str()));
        body.insert("error".into(), json!(stats.error));
        body.insert("weight".into(), json!(stats.weight));
        body.insert("sdp_type".into(), json!(stats.sdp_type.map(|t| t.as_str())));
        body.insert("sdp_sdp".into(), json!(stats.sdp));
        Value::Object(body)
    }

    fn ice_candidate(&self, stats: &IceCandidateStats) -> Value {
        let mut body = self.base(&stats.peer_id);
        body.insert(
            "candidate_id".into(),
            json!(format!("{}_{}", candidate_kind(&stats.candidate), now_ms())),
        );
        body.insert("state".into(), json!(stats.state));
        body.insert("candidate".into(), json!(stats.candidate));
        body.insert("error".into(), json!(stats.error));
        Value::Object(body)
    }

    fn ice_agent(&self, stats: &IceAgentStats) -> Value {
        let mut body = self.base(&stats.peer_id);
        body.insert("state".into(), json!(stats.state));
        body.insert("is_trickle".into(), json!(stats.is_trickle));
        body.insert(
            "local_candidate".into(),
            json!(serde_json::to_string(&stats.local_candidates).unwrap_or_default()),
        );
        body.insert(
            "remote_candidate".into(),
            json!(serde_json::to_string(&stats.remote_candidates).unwrap_or_default()),
        );
        Value::Object(body)
    }
}

impl ReportingPort for StatsReporter {
    fn report(&self, event: ReportEvent) {
        let (endpoint, body) = match &event {
            ReportEvent::HandshakeProgress(progress) => {
                info!(
                    peer_id = %progress.peer_id,
                    progress = ?progress.progress,
                    error = progress.error.as_deref(),
                    "handshake progress"
                );
                return;
            }
            ReportEvent::Negotiation(stats) => (StatsEndpoint::Negotiation, self.negotiation(stats)),
            ReportEvent::IceCandidate(stats) => (StatsEndpoint::IceCandidate, self.ice_candidate(stats)),
            ReportEvent::IceAgent(stats) => (StatsEndpoint::IceConnection, self.ice_agent(stats)),
        };
        if !self.enabled {
            return;
        }

        let url = build_stats_url(self.force_ssl, &self.stats_url, endpoint);
        debug!(event = event.name(), %url, "queueing stats request");
        if self.outgoing.send(StatsRequest { url, body }).is_err() {
            warn!(event = event.name(), "stats channel closed, dropping event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use room_negotiation::negotiation::report::{
        CandidateState, HandshakeProgress, HandshakeProgressEvent, NegotiationStage,
    };
    use room_negotiation::sdp::SdpType;

    fn config(enable_stats: bool) -> AppConfig {
        AppConfig {
            room_id: "room-1".to_string(),
            user_id: "alice".to_string(),
            app_key: "key-123".to_string(),
            app_key_owner: Some("acme".to_string()),
            enable_stats,
            stats_url: "//stats.example.com/api".to_string(),
            ..Default::default()
        }
    }

    fn negotiation_event() -> ReportEvent {
        ReportEvent::Negotiation(NegotiationStats {
            peer_id: "bob".to_string(),
            state: NegotiationStage::ErrorLocalOffer,
            weight: 42.0,
            sdp: Some("v=0\r\n".to_string()),
            sdp_type: Some(SdpType::Offer),
            error: Some("rejected".to_string()),
        })
    }

    #[test]
    fn test_build_stats_url() {
        assert_eq!(
            build_stats_url(true, "//stats.example.com/api", StatsEndpoint::Negotiation),
            "https://stats.example.com/api/rest/stats/client/negotiation"
        );
        assert_eq!(
            build_stats_url(false, "//localhost:3000", StatsEndpoint::IceConnection),
            "http://localhost:3000/rest/stats/client/iceconnection"
        );
    }

    #[test]
    fn test_client_id_prefix() {
        assert!(create_client_id(Some("acme")).starts_with("acme_"));
        let id = create_client_id(None);
        let (owner, stamp) = id.split_once('_').unwrap();
        assert_eq!(owner, "dummy");
        assert!(stamp.parse::<u64>().is_ok());
    }

    #[test]
    fn test_negotiation_payload() {
        let (reporter, mut rx) = StatsReporter::channel(&config(true), "alice-session");
        reporter.report(negotiation_event());

        let request = rx.try_recv().unwrap();
        assert_eq!(
            request.url,
            "https://stats.example.com/api/rest/stats/client/negotiation"
        );
        let body = &request.body;
        assert_eq!(body["client_id"], reporter.client_id());
        assert_eq!(body["app_key"], "key-123");
        assert_eq!(body["room_id"], "room-1");
        assert_eq!(body["user_id"], "alice");
        assert_eq!(body["peer_id"], "alice-session");
        assert_eq!(body["remote_peer_id"], "bob");
        assert_eq!(body["state"], "error-local-offer");
        assert_eq!(body["weight"], 42.0);
        assert_eq!(body["sdp_type"], "offer");
        assert_eq!(body["error"], "rejected");
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_candidate_payload_names_candidate_type() {
        let (reporter, mut rx) = StatsReporter::channel(&config(true), "alice-session");
        reporter.report(ReportEvent::IceCandidate(IceCandidateStats {
            peer_id: "bob".to_string(),
            candidate: "candidate:1 1 udp 1686052607 203.0.113.7 61000 typ srflx".to_string(),
            state: CandidateState::Added,
            error: None,
        }));

        let request = rx.try_recv().unwrap();
        assert!(request.url.ends_with("/rest/stats/client/icecandidate"));
        assert!(request.body["candidate_id"].as_str().unwrap().starts_with("srflx_"));
        assert_eq!(request.body["state"], "added");
        assert!(request.body["error"].is_null());
    }

    #[test]
    fn test_disabled_stats_and_handshake_progress_are_not_queued() {
        let (reporter, mut rx) = StatsReporter::channel(&config(false), "alice-session");
        reporter.report(negotiation_event());
        assert!(rx.try_recv().is_err());

        let (reporter, mut rx) = StatsReporter::channel(&config(true), "alice-session");
        reporter.report(ReportEvent::HandshakeProgress(HandshakeProgressEvent {
            peer_id: "bob".to_string(),
            progress: HandshakeProgress::Offer,
            error: None,
        }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_ice_agent_payload_serializes_candidate_lists() {
        let (reporter, mut rx) = StatsReporter::channel(&config(true), "alice-session");
        reporter.report(ReportEvent::IceAgent(IceAgentStats {
            peer_id: "bob".to_string(),
            state: "checking".to_string(),
            is_trickle: true,
            local_candidates: vec![],
            remote_candidates: vec![],
        }));

        let request = rx.try_recv().unwrap();
        assert!(request.url.ends_with("/rest/stats/client/iceconnection"));
        assert_eq!(request.body["local_candidate"], "[]");
        assert_eq!(request.body["is_trickle"], true);
    }
}
