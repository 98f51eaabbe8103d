//! Ordered SDP rewrites applied to every local description before it is set.
//!
//! Each stage is a plain function over [`SdpLines`]. Stages only drop or
//! rewrite lines in place, so applying the pipeline twice gives the same
//! result as applying it once.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use super::sdp_lines::{split_payload_attribute, SdpLines};
use super::session_description::{SdpType, SessionDescription};
use crate::negotiation::policy::NegotiationPolicy;

const FIREFOX_H264_PREF: &str = "a=fmtp:0 profile-level-id=0x42e00c;packetization-mode=1";

/// What a stage may look at besides the lines themselves.
pub struct TransformContext<'a> {
    pub peer_id: &'a str,
    pub sdp_type: SdpType,
    pub policy: &'a NegotiationPolicy,
}

/// Returns true when the stage changed something.
pub type Stage = fn(&TransformContext<'_>, &mut SdpLines) -> bool;

pub const STAGES: [(&str, Stage); 7] = [
    ("remove_firefox_h264_pref", remove_firefox_h264_pref),
    ("normalize_codec_params", normalize_codec_params),
    ("remove_unknown_apt_rtx", remove_unknown_apt_rtx),
    ("remove_disabled_codecs", remove_disabled_codecs),
    ("apply_connection_settings", apply_connection_settings),
    ("remove_remb_feedback", remove_remb_feedback),
    ("remove_bundle_group", remove_bundle_group),
];

pub struct SdpTransformPipeline<'a> {
    policy: &'a NegotiationPolicy,
}

impl<'a> SdpTransformPipeline<'a> {
    pub fn new(policy: &'a NegotiationPolicy) -> Self {
        Self { policy }
    }

    /// Runs every stage in order. Malformed input comes back unchanged.
    pub fn apply(&self, peer_id: &str, description: &SessionDescription) -> SessionDescription {
        let mut lines = match SdpLines::parse(&description.sdp) {
            Ok(lines) => lines,
            Err(e) => {
                warn!(peer_id, error = %e, "malformed local description, skipping transforms");
                return description.clone();
            }
        };

        let context = TransformContext {
            peer_id,
            sdp_type: description.sdp_type,
            policy: self.policy,
        };
        for (name, stage) in STAGES {
            if stage(&context, &mut lines) {
                debug!(peer_id, stage = name, "sdp stage rewrote description");
            }
        }

        description.with_sdp(lines.render())
    }
}

fn remove_firefox_h264_pref(_: &TransformContext<'_>, lines: &mut SdpLines) -> bool {
    lines.retain_lines(|line| line != FIREFOX_H264_PREF)
}

fn normalize_codec_params(context: &TransformContext<'_>, lines: &mut SdpLines) -> bool {
    let opus = &context.policy.codec_params.opus;
    let mut rewrites = Vec::new();

    for section in lines.media_sections() {
        let codecs = lines.codecs(&section);
        for index in section.start + 1..section.end {
            let Some(line) = lines.line(index) else {
                continue;
            };
            let Some(("fmtp", pt, raw)) = split_payload_attribute(line) else {
                continue;
            };
            let Some(mut params) = parse_params(raw) else {
                continue;
            };

            if codecs
                .get(pt)
                .is_some_and(|codec| codec.eq_ignore_ascii_case("opus"))
            {
                let flag = |on: bool| (if on { "1" } else { "0" }).to_string();
                if let Some(stereo) = opus.stereo {
                    params.insert("stereo".to_string(), flag(stereo));
                }
                if let Some(fec) = opus.use_inband_fec {
                    params.insert("useinbandfec".to_string(), flag(fec));
                }
                if let Some(dtx) = opus.use_dtx {
                    params.insert("usedtx".to_string(), flag(dtx));
                }
                if let Some(rate) = opus.max_playback_rate {
                    params.insert("maxplaybackrate".to_string(), rate.to_string());
                }
            }

            let rendered = params
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect::<Vec<_>>()
                .join(";");
            rewrites.push((index, format!("a=fmtp:{pt} {rendered}")));
        }
    }

    let mut changed = false;
    for (index, line) in rewrites {
        changed |= lines.set_line(index, line);
    }
    changed
}

/// `key=value;key=value` into a sorted map, or `None` if any part is not a pair.
fn parse_params(raw: &str) -> Option<BTreeMap<String, String>> {
    if raw.trim().is_empty() {
        return None;
    }
    let mut params = BTreeMap::new();
    for param in raw.split(';') {
        let (key, value) = param.trim().split_once('=')?;
        let key = key.trim();
        if key.is_empty() || params.contains_key(key) {
            return None;
        }
        params.insert(key.to_string(), value.trim().to_string());
    }
    Some(params)
}

fn remove_unknown_apt_rtx(_: &TransformContext<'_>, lines: &mut SdpLines) -> bool {
    let mut drops = BTreeMap::new();

    for section in lines.media_sections().iter().filter(|s| s.is_rtp()) {
        let codecs = lines.codecs(section);
        let is_rtx = |pt: &str| {
            codecs
                .get(pt)
                .is_some_and(|codec| codec.eq_ignore_ascii_case("rtx"))
        };
        let primary: BTreeSet<&str> = section
            .formats
            .iter()
            .map(String::as_str)
            .filter(|pt| !is_rtx(*pt))
            .collect();

        let unknown: BTreeSet<String> = section
            .formats
            .iter()
            .filter(|pt| is_rtx(pt.as_str()))
            .filter(|pt| match lines.apt_of(section, pt.as_str()) {
                Some(apt) => !primary.contains(apt.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        if !unknown.is_empty() {
            drops.insert(section.index, unknown);
        }
    }

    !drops.is_empty() && lines.remove_payload_types(&drops)
}

fn remove_disabled_codecs(context: &TransformContext<'_>, lines: &mut SdpLines) -> bool {
    let mut drops = BTreeMap::new();

    for section in lines.media_sections().iter().filter(|s| s.is_rtp()) {
        let disabled = context.policy.disabled_codecs.for_kind(&section.kind);
        if disabled.is_empty() {
            continue;
        }
        let codecs = lines.codecs(section);
        let mut dropped: BTreeSet<String> = section
            .formats
            .iter()
            .filter(|pt| {
                codecs.get(*pt).is_some_and(|codec| {
                    disabled.iter().any(|name| name.eq_ignore_ascii_case(codec))
                })
            })
            .cloned()
            .collect();
        if dropped.is_empty() {
            continue;
        }

        let rtx: Vec<String> = section
            .formats
            .iter()
            .filter(|pt| {
                codecs
                    .get(*pt)
                    .is_some_and(|codec| codec.eq_ignore_ascii_case("rtx"))
            })
            .filter(|pt| {
                lines
                    .apt_of(section, pt.as_str())
                    .is_some_and(|apt| dropped.contains(&apt))
            })
            .cloned()
            .collect();
        dropped.extend(rtx);
        drops.insert(section.index, dropped);
    }

    !drops.is_empty() && lines.remove_payload_types(&drops)
}

fn apply_connection_settings(context: &TransformContext<'_>, lines: &mut SdpLines) -> bool {
    let policy = context.policy;
    let relay = policy.is_relay(context.peer_id);
    let setup = match (context.sdp_type, policy.dtls_role) {
        (SdpType::Answer, Some(role)) => Some(format!("a=setup:{}", role.setup_value())),
        _ => None,
    };
    let mut rewrites = Vec::new();

    for section in lines.media_sections() {
        let media = policy.media(&section.kind);
        for index in section.start + 1..section.end {
            let Some(line) = lines.line(index) else {
                continue;
            };
            if let (Some(media), Some((sends, receives))) = (media, direction(line)) {
                let narrowed = render_direction(
                    sends && media.send,
                    receives && (media.receive || relay),
                );
                rewrites.push((index, narrowed.to_string()));
            } else if let Some(setup) = &setup {
                if line.starts_with("a=setup:") {
                    rewrites.push((index, setup.clone()));
                }
            }
        }
    }

    let mut changed = false;
    for (index, line) in rewrites {
        changed |= lines.set_line(index, line);
    }
    changed
}

fn direction(line: &str) -> Option<(bool, bool)> {
    match line {
        "a=sendrecv" => Some((true, true)),
        "a=sendonly" => Some((true, false)),
        "a=recvonly" => Some((false, true)),
        "a=inactive" => Some((false, false)),
        _ => None,
    }
}

fn render_direction(sends: bool, receives: bool) -> &'static str {
    match (sends, receives) {
        (true, true) => "a=sendrecv",
        (true, false) => "a=sendonly",
        (false, true) => "a=recvonly",
        (false, false) => "a=inactive",
    }
}

fn remove_remb_feedback(context: &TransformContext<'_>, lines: &mut SdpLines) -> bool {
    if !context.policy.disable_remb {
        return false;
    }
    lines.retain_lines(|line| {
        !matches!(
            split_payload_attribute(line),
            Some(("rtcp-fb", _, feedback)) if feedback.trim() == "goog-remb"
        )
    })
}

fn remove_bundle_group(context: &TransformContext<'_>, lines: &mut SdpLines) -> bool {
    if !context.policy.disable_bundle {
        return false;
    }
    lines.retain_lines(|line| !line.starts_with("a=group:BUNDLE"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiation::policy::{DisabledCodecs, DtlsRole, MediaPolicy};

    const OFFER: &str = "v=0\r\n\
o=- 4611731400430051336 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
a=group:BUNDLE 0 1\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111 0\r\n\
c=IN IP4 0.0.0.0\r\n\
a=mid:0\r\n\
a=setup:actpass\r\n\
a=sendrecv\r\n\
a=rtpmap:111 opus/48000/2\r\n\
a=fmtp:111 useinbandfec=1;minptime=10\r\n\
a=rtpmap:0 PCMU/8000\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96 97 98 99 100\r\n\
c=IN IP4 0.0.0.0\r\n\
a=mid:1\r\n\
a=setup:actpass\r\n\
a=sendrecv\r\n\
a=rtpmap:96 VP8/90000\r\n\
a=rtcp-fb:96 goog-remb\r\n\
a=rtcp-fb:96 nack\r\n\
a=rtpmap:97 rtx/90000\r\n\
a=fmtp:97 apt=96\r\n\
a=rtpmap:98 H264/90000\r\n\
a=fmtp:98 level-asymmetry-allowed=1;profile-level-id=42e01f;packetization-mode=1\r\n\
a=rtpmap:99 rtx/90000\r\n\
a=fmtp:99 apt=98\r\n\
a=rtpmap:100 rtx/90000\r\n\
a=fmtp:100 apt=120\r\n";

    fn run(policy: &NegotiationPolicy, sdp_type: SdpType, sdp: &str) -> String {
        SdpTransformPipeline::new(policy)
            .apply("peer-1", &SessionDescription::new(sdp_type, sdp))
            .sdp
    }

    #[test]
    fn test_pipeline_is_idempotent() {
        let policy = NegotiationPolicy {
            disable_bundle: true,
            disabled_codecs: DisabledCodecs {
                audio: vec!["pcmu".to_string()],
                video: vec!["H264".to_string()],
            },
            ..Default::default()
        };
        let once = run(&policy, SdpType::Offer, OFFER);
        let twice = run(&policy, SdpType::Offer, &once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_malformed_input_passes_through() {
        let policy = NegotiationPolicy::default();
        let garbage = "this is not sdp";
        assert_eq!(run(&policy, SdpType::Offer, garbage), garbage);
    }

    #[test]
    fn test_remove_firefox_h264_pref() {
        let sdp = format!("v=0\r\n{FIREFOX_H264_PREF}\r\na=fmtp:0 other=1\r\n");
        let out = run(&NegotiationPolicy::default(), SdpType::Offer, &sdp);
        assert_eq!(out, "v=0\r\na=fmtp:0 other=1\r\n");
    }

    #[test]
    fn test_normalize_codec_params_sorts_and_overrides_opus() {
        let mut policy = NegotiationPolicy::default();
        policy.codec_params.opus.stereo = Some(true);
        policy.codec_params.opus.max_playback_rate = Some(48000);

        let out = run(&policy, SdpType::Offer, OFFER);
        assert!(out.contains("a=fmtp:111 maxplaybackrate=48000;minptime=10;stereo=1;useinbandfec=1\r\n"));
        assert!(out.contains(
            "a=fmtp:98 level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42e01f\r\n"
        ));
    }

    #[test]
    fn test_remove_unknown_apt_rtx() {
        let out = run(&NegotiationPolicy::default(), SdpType::Offer, OFFER);
        assert!(out.contains("m=video 9 UDP/TLS/RTP/SAVPF 96 97 98 99\r\n"));
        assert!(!out.contains("a=rtpmap:100"));
        assert!(!out.contains("apt=120"));
        assert!(out.contains("a=fmtp:97 apt=96"));
    }

    #[test]
    fn test_remove_disabled_codecs_takes_rtx_along() {
        let policy = NegotiationPolicy {
            disabled_codecs: DisabledCodecs {
                audio: vec![],
                video: vec!["h264".to_string()],
            },
            ..Default::default()
        };
        let out = run(&policy, SdpType::Offer, OFFER);
        assert!(out.contains("m=video 9 UDP/TLS/RTP/SAVPF 96 97\r\n"));
        assert!(!out.contains("H264"));
        assert!(!out.contains("a=fmtp:99"));
        assert!(out.contains("m=audio 9 UDP/TLS/RTP/SAVPF 111 0\r\n"));
    }

    #[test]
    fn test_disabling_every_codec_keeps_section() {
        let policy = NegotiationPolicy {
            disabled_codecs: DisabledCodecs {
                audio: vec!["opus".to_string(), "PCMU".to_string()],
                video: vec![],
            },
            ..Default::default()
        };
        let out = run(&policy, SdpType::Offer, OFFER);
        assert!(out.contains("m=audio 9 UDP/TLS/RTP/SAVPF 111 0\r\n"));
        assert!(out.contains("a=rtpmap:0 PCMU/8000"));
    }

    #[test]
    fn test_connection_settings_narrow_direction() {
        let policy = NegotiationPolicy {
            audio: MediaPolicy {
                send: true,
                receive: false,
            },
            video: MediaPolicy {
                send: false,
                receive: true,
            },
            ..Default::default()
        };
        let out = run(&policy, SdpType::Offer, OFFER);
        let sections: Vec<&str> = out.split("m=").collect();
        assert!(sections[1].contains("a=sendonly"));
        assert!(sections[2].contains("a=recvonly"));

        let relay = NegotiationPolicy {
            relay_peer_id: Some("peer-1".to_string()),
            ..policy
        };
        let out = run(&relay, SdpType::Offer, OFFER);
        let sections: Vec<&str> = out.split("m=").collect();
        assert!(sections[1].contains("a=sendrecv"));
    }

    #[test]
    fn test_dtls_role_only_rewrites_answers() {
        let policy = NegotiationPolicy {
            dtls_role: Some(DtlsRole::Passive),
            ..Default::default()
        };
        let offer = run(&policy, SdpType::Offer, OFFER);
        assert!(offer.contains("a=setup:actpass"));

        let answer = run(&policy, SdpType::Answer, OFFER);
        assert!(!answer.contains("a=setup:actpass"));
        assert_eq!(answer.matches("a=setup:passive").count(), 2);
    }

    #[test]
    fn test_remb_and_bundle_removal() {
        let out = run(&NegotiationPolicy::default(), SdpType::Offer, OFFER);
        assert!(!out.contains("goog-remb"));
        assert!(out.contains("a=rtcp-fb:96 nack"));
        assert!(out.contains("a=group:BUNDLE 0 1"));

        let policy = NegotiationPolicy {
            disable_remb: false,
            disable_bundle: true,
            ..Default::default()
        };
        let out = run(&policy, SdpType::Offer, OFFER);
        assert!(out.contains("a=rtcp-fb:96 goog-remb"));
        assert!(!out.contains("a=group:BUNDLE"));
    }
}
