//! Room client: signaling transport, stats reporting and config around the
//! negotiation engine.

pub mod client;
pub mod config;
pub mod error;
pub mod logger;

pub use client::{ChannelSignaling, RoomSession, StatsReporter};
pub use config::AppConfig;
pub use error::ClientError;
