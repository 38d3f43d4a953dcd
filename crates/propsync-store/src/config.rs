//! Backend configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default root key under which property records live
pub const DEFAULT_ROOT: &str = "properties";

/// Remote store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database URL, e.g. `https://example-default-rtdb.firebaseio.com`
    pub database_url: Option<String>,
    /// Database secret or ID token passed as the `auth` query parameter
    pub auth_token: Option<String>,
    /// Root key for property records
    pub root: String,
    /// Per-request timeout in seconds (event streams are not bounded)
    pub timeout_secs: u64,
}

impl StoreConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With database URL
    #[inline]
    #[must_use]
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// With auth token
    #[inline]
    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// With root key
    #[inline]
    #[must_use]
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Request timeout as a duration
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            auth_token: None,
            root: DEFAULT_ROOT.to_string(),
            timeout_secs: 15,
        }
    }
}
