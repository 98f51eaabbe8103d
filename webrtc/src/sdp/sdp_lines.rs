//! Line-level view of an SDP payload.
//!
//! The transform stages never need a full structured model: they drop or
//! rewrite individual lines. `SdpLines` keeps the original line order and
//! line ending so that untouched lines come back byte for byte.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use super::sdp_error::SdpError;

/// Line terminator used by the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    CrLf,
    Lf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::CrLf => "\r\n",
            LineEnding::Lf => "\n",
        }
    }
}

/// One `m=` section and the range of lines that belongs to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSection {
    /// Position among the media sections, starting at 0.
    pub index: usize,
    pub kind: String,
    pub port: u16,
    pub protocol: String,
    /// Line index of the `m=` line.
    pub start: usize,
    /// One past the last line of the section.
    pub end: usize,
    /// Formats listed on the `m=` line, payload types for RTP sections.
    pub formats: Vec<String>,
}

impl MediaSection {
    pub fn is_rtp(&self) -> bool {
        self.protocol.contains("RTP")
    }

    fn render_m_line(&self, formats: &[&String]) -> String {
        let mut line = format!("m={} {} {}", self.kind, self.port, self.protocol);
        for format in formats {
            line.push(' ');
            line.push_str(format);
        }
        line
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdpLines {
    lines: Vec<String>,
    ending: LineEnding,
    terminated: bool,
}

impl SdpLines {
    pub fn parse(sdp: &str) -> Result<Self, SdpError> {
        if sdp.trim().is_empty() {
            return Err(SdpError::Empty);
        }

        let crlf = sdp.matches("\r\n").count();
        let lf = sdp.matches('\n').count();
        let ending = if crlf > 0 {
            if crlf != lf {
                return Err(SdpError::MixedLineEndings);
            }
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        };

        let terminated = sdp.ends_with(ending.as_str());
        let body = sdp.strip_suffix(ending.as_str()).unwrap_or(sdp);
        let lines: Vec<String> = body.split(ending.as_str()).map(str::to_string).collect();

        let first = lines.first().map(String::as_str).unwrap_or_default();
        if !first.starts_with("v=") {
            return Err(SdpError::MissingVersion(first.to_string()));
        }

        for (index, line) in lines.iter().enumerate() {
            let bytes = line.as_bytes();
            if bytes.len() < 2 || !bytes[0].is_ascii_lowercase() || bytes[1] != b'=' {
                return Err(SdpError::InvalidLine {
                    line: index + 1,
                    content: line.clone(),
                });
            }
        }

        Ok(Self {
            lines,
            ending,
            terminated,
        })
    }

    pub fn render(&self) -> String {
        let mut out = self.lines.join(self.ending.as_str());
        if self.terminated {
            out.push_str(self.ending.as_str());
        }
        out
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// Replaces a line, returning whether its content changed.
    pub fn set_line(&mut self, index: usize, content: String) -> bool {
        match self.lines.get_mut(index) {
            Some(line) if *line != content => {
                *line = content;
                true
            }
            _ => false,
        }
    }

    /// Keeps only the lines accepted by `keep`, returning whether any was dropped.
    pub fn retain_lines<F>(&mut self, mut keep: F) -> bool
    where
        F: FnMut(&str) -> bool,
    {
        let before = self.lines.len();
        self.lines.retain(|line| keep(line));
        self.lines.len() != before
    }

    pub fn media_sections(&self) -> Vec<MediaSection> {
        let starts: Vec<usize> = self
            .lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.starts_with("m="))
            .map(|(index, _)| index)
            .collect();

        starts
            .iter()
            .enumerate()
            .map(|(index, &start)| {
                let end = starts.get(index + 1).copied().unwrap_or(self.lines.len());
                let mut tokens = self.lines[start][2..].split_whitespace();
                let kind = tokens.next().unwrap_or_default().to_string();
                let port = tokens
                    .next()
                    .and_then(|port| port.split('/').next())
                    .and_then(|port| port.parse().ok())
                    .unwrap_or(0);
                let protocol = tokens.next().unwrap_or_default().to_string();
                let formats = tokens.map(str::to_string).collect();
                MediaSection {
                    index,
                    kind,
                    port,
                    protocol,
                    start,
                    end,
                    formats,
                }
            })
            .collect()
    }

    /// Lines of a section after its `m=` line.
    pub fn section_lines<'a>(&'a self, section: &MediaSection) -> &'a [String] {
        let start = (section.start + 1).min(self.lines.len());
        let end = section.end.min(self.lines.len()).max(start);
        &self.lines[start..end]
    }

    /// Payload type to codec name, from the `a=rtpmap` lines of a section.
    pub fn codecs(&self, section: &MediaSection) -> BTreeMap<String, String> {
        self.section_lines(section)
            .iter()
            .filter_map(|line| {
                let rest = line.strip_prefix("a=rtpmap:")?;
                let (pt, encoding) = rest.split_once(' ')?;
                let name = encoding.split('/').next()?;
                Some((pt.to_string(), name.to_string()))
            })
            .collect()
    }

    /// The `apt=` target of an `a=fmtp` line for `pt` inside a section.
    pub fn apt_of(&self, section: &MediaSection, pt: &str) -> Option<String> {
        self.section_lines(section).iter().find_map(|line| {
            let (attribute, line_pt, params) = split_payload_attribute(line)?;
            if attribute != "fmtp" || line_pt != pt {
                return None;
            }
            params
                .split(';')
                .filter_map(|param| param.trim().split_once('='))
                .find(|(key, _)| key.trim() == "apt")
                .map(|(_, value)| value.trim().to_string())
        })
    }

    /// Drops payload types per media section index.
    ///
    /// The `m=` line is rewritten and the `a=rtpmap`, `a=fmtp` and `a=rtcp-fb`
    /// lines of the dropped types are removed. A section that would lose all
    /// of its formats is left untouched.
    pub fn remove_payload_types(&mut self, drops: &BTreeMap<usize, BTreeSet<String>>) -> bool {
        let mut keep = vec![true; self.lines.len()];
        let mut rewrites = Vec::new();

        for section in self.media_sections() {
            let Some(dropped) = drops.get(&section.index) else {
                continue;
            };
            let remaining: Vec<&String> = section
                .formats
                .iter()
                .filter(|pt| !dropped.contains(*pt))
                .collect();
            if remaining.len() == section.formats.len() {
                continue;
            }
            if remaining.is_empty() {
                warn!(
                    media = %section.kind,
                    section = section.index,
                    "keeping payload types, removal would empty the media section"
                );
                continue;
            }

            rewrites.push((section.start, section.render_m_line(&remaining)));
            for index in section.start + 1..section.end {
                if let Some((_, pt, _)) = split_payload_attribute(&self.lines[index]) {
                    if dropped.contains(pt) {
                        keep[index] = false;
                    }
                }
            }
        }

        if rewrites.is_empty() {
            return false;
        }
        for (index, line) in rewrites {
            self.lines[index] = line;
        }
        let mut flags = keep.into_iter();
        self.lines.retain(|_| flags.next().unwrap_or(true));
        true
    }
}

/// Splits `a=<rtpmap|fmtp|rtcp-fb>:<pt> <rest>` into its parts.
pub fn split_payload_attribute(line: &str) -> Option<(&str, &str, &str)> {
    let rest = line.strip_prefix("a=")?;
    let (attribute, value) = rest.split_once(':')?;
    if !matches!(attribute, "rtpmap" | "fmtp" | "rtcp-fb") {
        return None;
    }
    let (pt, params) = value.split_once(' ').unwrap_or((value, ""));
    Some((attribute, pt, params))
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUDIO_VIDEO: &str = "v=0\r\n\
o=- 1 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111 0\r\n\
a=rtpmap:111 opus/48000/2\r\n\
a=fmtp:111 minptime=10;useinbandfec=1\r\n\
a=rtpmap:0 PCMU/8000\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96 97\r\n\
a=rtpmap:96 VP8/90000\r\n\
a=rtcp-fb:96 nack\r\n\
a=rtpmap:97 rtx/90000\r\n\
a=fmtp:97 apt=96\r\n";

    #[test]
    fn test_parse_and_render_preserves_payload() {
        let lines = SdpLines::parse(AUDIO_VIDEO).unwrap();
        assert_eq!(lines.render(), AUDIO_VIDEO);

        let lf = AUDIO_VIDEO.replace("\r\n", "\n");
        let lines = SdpLines::parse(&lf).unwrap();
        assert_eq!(lines.render(), lf);
    }

    #[test]
    fn test_parse_rejects_malformed_payloads() {
        assert_eq!(SdpLines::parse("  "), Err(SdpError::Empty));
        assert_eq!(
            SdpLines::parse("o=- 1 2 IN IP4 0.0.0.0\r\n"),
            Err(SdpError::MissingVersion("o=- 1 2 IN IP4 0.0.0.0".to_string()))
        );
        assert_eq!(
            SdpLines::parse("v=0\r\nnot a line\r\n"),
            Err(SdpError::InvalidLine {
                line: 2,
                content: "not a line".to_string()
            })
        );
        assert_eq!(
            SdpLines::parse("v=0\r\ns=-\nt=0 0\r\n"),
            Err(SdpError::MixedLineEndings)
        );
    }

    #[test]
    fn test_media_sections() {
        let lines = SdpLines::parse(AUDIO_VIDEO).unwrap();
        let sections = lines.media_sections();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].kind, "audio");
        assert_eq!(sections[0].formats, vec!["111", "0"]);
        assert_eq!((sections[0].start, sections[0].end), (4, 8));
        assert_eq!(sections[1].kind, "video");
        assert!(sections[1].is_rtp());
        assert_eq!(lines.codecs(&sections[1]).get("97").map(String::as_str), Some("rtx"));
        assert_eq!(lines.apt_of(&sections[1], "97"), Some("96".to_string()));
        assert_eq!(lines.apt_of(&sections[1], "96"), None);
    }

    #[test]
    fn test_remove_payload_types_drops_attributes() {
        let mut lines = SdpLines::parse(AUDIO_VIDEO).unwrap();
        let drops = BTreeMap::from([(1, BTreeSet::from(["97".to_string()]))]);
        assert!(lines.remove_payload_types(&drops));

        let rendered = lines.render();
        assert!(rendered.contains("m=video 9 UDP/TLS/RTP/SAVPF 96\r\n"));
        assert!(!rendered.contains("a=rtpmap:97"));
        assert!(!rendered.contains("a=fmtp:97"));
        assert!(rendered.contains("a=rtcp-fb:96 nack"));
    }

    #[test]
    fn test_remove_payload_types_keeps_non_empty_sections() {
        let mut lines = SdpLines::parse(AUDIO_VIDEO).unwrap();
        let drops = BTreeMap::from([(0, BTreeSet::from(["111".to_string(), "0".to_string()]))]);
        assert!(!lines.remove_payload_types(&drops));
        assert_eq!(lines.render(), AUDIO_VIDEO);
    }
}
