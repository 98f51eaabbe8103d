//! Session descriptions and the line-level rewrites applied to them.

mod sdp_error;
mod sdp_lines;
mod session_description;
pub mod transform;

pub use sdp_error::SdpError;
pub use sdp_lines::{LineEnding, MediaSection, SdpLines};
pub use session_description::{SdpType, SessionDescription};
pub use transform::SdpTransformPipeline;
