//! propsync store - the remote key-value tree behind the contact forms
//!
//! A path-addressed JSON tree with four operations:
//! - `write`: replace the value at a path
//! - `patch`: merge top-level keys into the value at a path
//! - `read_once`: current value at a path
//! - `subscribe`: current value, then one snapshot per change
//!
//! # Backends
//!
//! - [`FirebaseStore`]: Realtime Database REST API with server-sent events
//! - [`MemoryStore`]: in-process tree for dry runs and tests
//!
//! # Example
//!
//! ```rust,ignore
//! use propsync_store::{MemoryStore, RemoteStore, StorePath};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! let path: StorePath = "properties/Delaware/Westover Pointe".parse()?;
//! store.write(&path, json!({"unit-101": "101"})).await?;
//! assert!(store.read_once(&path).await?.is_some());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod firebase;
pub mod memory;
pub mod path;
pub mod store;

mod sse;
mod tree;

pub use config::{StoreConfig, DEFAULT_ROOT};
pub use error::StoreError;
pub use firebase::FirebaseStore;
pub use memory::MemoryStore;
pub use path::{PathError, StorePath};
pub use store::{RemoteStore, SnapshotStream};

#[cfg(any(test, feature = "mock"))]
pub use store::MockRemoteStore;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
