pub mod signaling_client;
pub mod stats_reporter;
pub mod webrtc_service;

pub use signaling_client::{parse_inbound, ChannelSignaling};
pub use stats_reporter::{StatsEndpoint, StatsReporter, StatsRequest};
pub use webrtc_service::{ConnectionFactory, RoomSession};
