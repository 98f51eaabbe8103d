//! Constraint derivation for offers and answers.

use serde::{Deserialize, Serialize};

use super::rtc_peer_connection::NegotiationConstraints;
use crate::negotiation::policy::NegotiationPolicy;
use crate::negotiation::session::PeerConfig;
use crate::sdp::{SdpLines, SessionDescription};

/// Media kinds a side is willing to exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSupport {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaSupport {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

impl MediaSupport {
    pub fn intersect(self, other: MediaSupport) -> MediaSupport {
        MediaSupport {
            audio: self.audio && other.audio,
            video: self.video && other.video,
        }
    }
}

/// Audio/video sections with a non-zero port in a remote description.
///
/// An unreadable description is treated as supporting everything, leaving the
/// decision to the native connection.
pub fn remote_media_support(sdp: &str) -> MediaSupport {
    let Ok(lines) = SdpLines::parse(sdp) else {
        return MediaSupport::default();
    };
    let active = |kind: &str| {
        lines
            .media_sections()
            .iter()
            .any(|section| section.kind == kind && section.port != 0)
    };
    MediaSupport {
        audio: active("audio"),
        video: active("video"),
    }
}

fn media_constraints(
    policy: &NegotiationPolicy,
    peer_id: &str,
    support: MediaSupport,
    ice_restart: bool,
) -> NegotiationConstraints {
    let relay = policy.is_relay(peer_id);
    NegotiationConstraints {
        offer_to_receive_audio: (policy.audio.receive || relay) && support.audio,
        offer_to_receive_video: (policy.video.receive || relay) && support.video,
        ice_restart,
        voice_activity_detection: policy.voice_activity_detection,
    }
}

pub fn offer_constraints(
    policy: &NegotiationPolicy,
    peer_id: &str,
    config: &PeerConfig,
    ice_restart_requested: bool,
) -> NegotiationConstraints {
    let ice_restart =
        ice_restart_requested && config.enable_ice_restart && policy.enable_ice_restart;
    media_constraints(policy, peer_id, config.supports, ice_restart)
}

/// Answers never restart ICE; media is limited to what the remote offer carries.
pub fn answer_constraints(
    policy: &NegotiationPolicy,
    peer_id: &str,
    config: &PeerConfig,
    remote: Option<&SessionDescription>,
) -> NegotiationConstraints {
    let support = match remote {
        Some(description) => config.supports.intersect(remote_media_support(&description.sdp)),
        None => config.supports,
    };
    media_constraints(policy, peer_id, support, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiation::policy::MediaPolicy;

    const AUDIO_ONLY: &str = "v=0\r\ns=-\r\nm=audio 9 UDP/TLS/RTP/SAVPF 111\r\nm=video 0 UDP/TLS/RTP/SAVPF 96\r\n";

    #[test]
    fn test_remote_media_support_ignores_rejected_sections() {
        assert_eq!(
            remote_media_support(AUDIO_ONLY),
            MediaSupport {
                audio: true,
                video: false
            }
        );
        assert_eq!(remote_media_support("garbage"), MediaSupport::default());
    }

    #[test]
    fn test_offer_constraints_ice_restart_needs_all_three() {
        let policy = NegotiationPolicy::default();
        let mut config = PeerConfig::default();

        assert!(offer_constraints(&policy, "p", &config, true).ice_restart);
        assert!(!offer_constraints(&policy, "p", &config, false).ice_restart);

        config.enable_ice_restart = false;
        assert!(!offer_constraints(&policy, "p", &config, true).ice_restart);
    }

    #[test]
    fn test_audio_and_video_are_not_swapped() {
        let policy = NegotiationPolicy {
            audio: MediaPolicy {
                send: true,
                receive: false,
            },
            ..Default::default()
        };
        let constraints = offer_constraints(&policy, "p", &PeerConfig::default(), false);
        assert!(!constraints.offer_to_receive_audio);
        assert!(constraints.offer_to_receive_video);
    }

    #[test]
    fn test_relay_always_receives() {
        let policy = NegotiationPolicy {
            audio: MediaPolicy {
                send: true,
                receive: false,
            },
            relay_peer_id: Some("mcu".to_string()),
            ..Default::default()
        };
        let constraints = offer_constraints(&policy, "mcu", &PeerConfig::default(), false);
        assert!(constraints.offer_to_receive_audio);
    }

    #[test]
    fn test_answer_constraints_follow_remote_offer() {
        let policy = NegotiationPolicy::default();
        let remote = SessionDescription::offer(AUDIO_ONLY);
        let constraints =
            answer_constraints(&policy, "p", &PeerConfig::default(), Some(&remote));
        assert!(constraints.offer_to_receive_audio);
        assert!(!constraints.offer_to_receive_video);
        assert!(!constraints.ice_restart);
    }
}
