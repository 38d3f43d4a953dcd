//! Sync configuration
//!
//! Loaded from TOML, then overridden from the environment:
//!
//! ```toml
//! [store]
//! database_url = "https://example-default-rtdb.firebaseio.com"
//! root = "properties"
//!
//! [banner]
//! dismiss_after_ms = 5000
//!
//! [roles]
//! units = ["storage"]
//! contacts = ["unit-manager"]
//! ```

use crate::error::ConfigError;
use crate::model::{RoleKind, RoleTable};
use crate::notify::BannerBoard;
use propsync_store::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding `store.database_url`
pub const ENV_DATABASE_URL: &str = "PROPSYNC_DATABASE_URL";

/// Environment variable overriding `store.auth_token`
pub const ENV_AUTH_TOKEN: &str = "PROPSYNC_AUTH_TOKEN";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Remote store
    pub store: StoreConfig,
    /// Notification banner
    pub banner: BannerConfig,
    /// Extra role-kind entries
    pub roles: RolesConfig,
}

/// Banner configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BannerConfig {
    /// Auto-dismiss interval in milliseconds; 0 keeps banners until replaced
    pub dismiss_after_ms: u64,
}

impl Default for BannerConfig {
    fn default() -> Self {
        Self {
            dismiss_after_ms: 5_000,
        }
    }
}

/// Role identifiers with an explicit kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolesConfig {
    /// Roles storing a scalar
    pub units: Vec<String>,
    /// Roles storing a `{name, email}` contact
    pub contacts: Vec<String>,
}

impl SyncConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a TOML file
    ///
    /// # Errors
    /// [`ConfigError`] when the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// [`ConfigError::Toml`] on malformed input
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// With store configuration
    #[inline]
    #[must_use]
    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    /// With banner dismiss interval
    #[inline]
    #[must_use]
    pub fn with_dismiss_after(mut self, after: Duration) -> Self {
        self.banner.dismiss_after_ms = u64::try_from(after.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Apply `PROPSYNC_*` overrides from the process environment
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`; empty values are ignored
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty(ENV_DATABASE_URL) {
            self.store.database_url = Some(url);
        }
        if let Some(token) = non_empty(ENV_AUTH_TOKEN) {
            self.store.auth_token = Some(token);
        }
        self
    }

    /// Check values are consistent
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] naming the first offending value
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "store.timeout_secs must be positive".into(),
            ));
        }
        if self.store.root.trim_matches('/').is_empty() {
            return Err(ConfigError::Invalid("store.root must not be empty".into()));
        }
        if let Some(role) = self
            .roles
            .units
            .iter()
            .find(|role| self.roles.contacts.contains(role))
        {
            return Err(ConfigError::Invalid(format!(
                "role '{role}' is listed as both unit and contact"
            )));
        }
        Ok(())
    }

    /// Standard role table plus the configured entries
    #[must_use]
    pub fn role_table(&self) -> RoleTable {
        let table = self
            .roles
            .units
            .iter()
            .fold(RoleTable::standard(), |t, role| t.with_role(role.as_str(), RoleKind::Unit));
        self.roles
            .contacts
            .iter()
            .fold(table, |t, role| t.with_role(role.as_str(), RoleKind::Contact))
    }

    /// Banner board honouring the dismiss interval
    #[must_use]
    pub fn banner_board(&self) -> BannerBoard {
        match self.banner.dismiss_after_ms {
            0 => BannerBoard::persistent(),
            ms => BannerBoard::new(Duration::from_millis(ms)),
        }
    }
}
