//! Error types for the form sync controller
//!
//! Provides error handling for:
//! - Page titles that carry no state name
//! - Store failures on the load path
//! - Page document I/O
//! - Configuration loading

use propsync_store::StoreError;
use std::path::PathBuf;

/// Main sync error type
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// No state key in the page title
    #[error("cannot derive state: {0}")]
    Title(#[from] TitleError),

    /// Remote store failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Page document could not be read or written
    #[error("page error: {0}")]
    Page(#[from] PageError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Page title does not follow `"<purpose>: <State>"`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TitleError {
    /// No `": "` in the title
    #[error("title '{title}' has no \": \" before the state name")]
    MissingSeparator { title: String },

    /// Separator present but nothing after it
    #[error("title '{title}' has an empty state name")]
    EmptyState { title: String },
}

/// Page document errors
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    /// IO error reading or writing the document
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Extension is neither JSON nor YAML
    #[error("unsupported page format: {0} (expected .json, .yaml or .yml)")]
    UnsupportedFormat(PathBuf),

    /// JSON document malformed
    #[error("invalid JSON page: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML document malformed
    #[error("invalid YAML page: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl PageError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading the config file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML malformed
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// Values inconsistent
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Result type alias for sync operations
pub type SyncResult<T> = Result<T, SyncError>;
