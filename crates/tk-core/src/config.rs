use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default minimum remaining validity for a restored session.
pub const DEFAULT_GRACE_WINDOW_MS: u64 = 60_000;

/// Storage keys and restore policy for a session manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub token_key: String,
    pub expiry_key: String,
    /// A persisted session with this much validity left (or less) is not restored.
    pub grace_window_ms: u64,
}

impl SessionConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn with_grace_window(mut self, window: Duration) -> Self {
        self.grace_window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_keys(mut self, token_key: impl Into<String>, expiry_key: impl Into<String>) -> Self {
        self.token_key = token_key.into();
        self.expiry_key = expiry_key.into();
        self
    }

    pub fn grace_window(&self) -> Duration {
        Duration::from_millis(self.grace_window_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_key: "token".into(),
            expiry_key: "expirationTime".into(),
            grace_window_ms: DEFAULT_GRACE_WINDOW_MS,
        }
    }
}
