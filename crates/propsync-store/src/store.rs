//! The remote store seam
//!
//! [`RemoteStore`] is everything the sync layer needs from the backend:
//! full writes, merge patches, one-shot reads and live subscriptions over a
//! path-addressed JSON tree. Implementations do no caching and no retries.

use crate::error::StoreError;
use crate::path::StorePath;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Stream of snapshots for one location
///
/// The first item is the current value; every later item follows a change.
/// `None` means nothing is stored there. Dropping the stream unsubscribes.
pub type SnapshotStream = BoxStream<'static, Result<Option<Value>, StoreError>>;

/// Path-addressed hierarchical key-value store
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Replace the entire value at `path`
    ///
    /// # Errors
    /// [`StoreError::Write`] on transport or permission failure
    async fn write(&self, path: &StorePath, value: Value) -> Result<(), StoreError>;

    /// Merge the top-level keys of `partial` into the value at `path`
    ///
    /// Each key replaces the child of the same name; keys not named in
    /// `partial` are left as they are.
    ///
    /// # Errors
    /// [`StoreError::Write`] on transport or permission failure
    async fn patch(&self, path: &StorePath, partial: Map<String, Value>)
        -> Result<(), StoreError>;

    /// Current value at `path`
    ///
    /// # Errors
    /// [`StoreError::Read`] on transport or permission failure
    async fn read_once(&self, path: &StorePath) -> Result<Option<Value>, StoreError>;

    /// Live snapshots of `path`
    ///
    /// # Errors
    /// [`StoreError::Read`] if the subscription cannot be opened; failures
    /// after that arrive as `Err` items on the stream.
    async fn subscribe(&self, path: &StorePath) -> Result<SnapshotStream, StoreError>;
}

#[async_trait]
impl<S: RemoteStore + ?Sized> RemoteStore for Arc<S> {
    async fn write(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        (**self).write(path, value).await
    }

    async fn patch(
        &self,
        path: &StorePath,
        partial: Map<String, Value>,
    ) -> Result<(), StoreError> {
        (**self).patch(path, partial).await
    }

    async fn read_once(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        (**self).read_once(path).await
    }

    async fn subscribe(&self, path: &StorePath) -> Result<SnapshotStream, StoreError> {
        (**self).subscribe(path).await
    }
}
