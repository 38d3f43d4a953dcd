//! Error types for the remote store
//!
//! Two failure families matter to callers:
//! - write failures (`write` / `patch` rejected by transport or permissions)
//! - read failures (`read_once` or a live subscription breaking)

use crate::path::PathError;

/// Remote store error
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Write or patch rejected
    #[error("write to '{path}' failed: {reason}")]
    Write { path: String, reason: String },

    /// Read or subscription failed
    #[error("read of '{path}' failed: {reason}")]
    Read { path: String, reason: String },

    /// Location is not addressable
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),

    /// Backend answered with something that is not JSON
    #[error("malformed value at '{path}': {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Backend misconfigured
    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Create write error for path
    pub fn write(path: impl ToString, reason: impl Into<String>) -> Self {
        Self::Write {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Create read error for path
    pub fn read(path: impl ToString, reason: impl Into<String>) -> Self {
        Self::Read {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Check if this is a write-path failure
    #[inline]
    #[must_use]
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write { .. })
    }

    /// Check if this is a read-path failure
    #[inline]
    #[must_use]
    pub fn is_read(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Decode { .. })
    }
}
