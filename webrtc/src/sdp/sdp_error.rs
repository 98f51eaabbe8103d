use thiserror::Error;

/// Reasons a session description payload cannot be handled line by line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SdpError {
    #[error("SDP error: payload is empty")]
    Empty,
    #[error("SDP error: \"{0}\" is not a version line")]
    MissingVersion(String),
    #[error("SDP error: line {line} \"{content}\" is not a <type>=<value> line")]
    InvalidLine { line: usize, content: String },
    #[error("SDP error: payload mixes CRLF and LF line endings")]
    MixedLineEndings,
    #[error("SDP error: \"{0}\" is not a session description type")]
    UnknownType(String),
}
