use std::fs;
use std::path::Path;

use room_negotiation::negotiation::LocalIdentity;
use room_negotiation::NegotiationPolicy;
use serde::Deserialize;

use crate::error::ClientError;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub room_id: String,
    pub user_id: String,
    pub app_key: String,
    /// Account the app key belongs to, prefix of the stats client id.
    pub app_key_owner: Option<String>,
    pub user_info: serde_json::Value,
    pub enable_stats: bool,
    /// Stats server host and optional path, without scheme.
    pub stats_url: String,
    pub force_ssl: bool,
    pub log_file: String,
    pub log_level: String,
    pub negotiation: NegotiationPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            room_id: "default".to_string(),
            user_id: "anonymous".to_string(),
            app_key: String::new(),
            app_key_owner: None,
            user_info: serde_json::Value::Object(serde_json::Map::new()),
            enable_stats: false,
            stats_url: "//127.0.0.1:8080".to_string(),
            force_ssl: true,
            log_file: "roomrtc.log".to_string(),
            log_level: "info".to_string(),
            negotiation: NegotiationPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Reads a TOML config. A missing file gives the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn local_identity(&self, session_id: impl Into<String>) -> LocalIdentity {
        LocalIdentity::new(session_id, self.room_id.clone(), self.user_info.clone())
    }
}
