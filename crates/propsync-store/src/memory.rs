//! In-process store with the same tree semantics as the remote backend
//!
//! Used for dry runs and tests. Subscribers get the current snapshot first,
//! then a fresh snapshot after every write or patch that touches their path.

use crate::error::StoreError;
use crate::path::StorePath;
use crate::store::{RemoteStore, SnapshotStream};
use crate::tree;
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

#[derive(Debug)]
struct Watcher {
    path: StorePath,
    sender: mpsc::UnboundedSender<Option<Value>>,
}

#[derive(Debug, Default)]
struct Tree {
    root: Value,
    watchers: Vec<Watcher>,
}

impl Tree {
    /// Push fresh snapshots to watchers overlapping `changed`, dropping closed ones
    fn notify(&mut self, changed: &StorePath) {
        let root = &self.root;
        self.watchers.retain(|watcher| {
            if watcher.path.overlaps(changed) {
                watcher
                    .sender
                    .send(tree::read(root, watcher.path.segments()))
                    .is_ok()
            } else {
                !watcher.sender.is_closed()
            }
        });
    }
}

/// In-memory [`RemoteStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    tree: Mutex<Tree>,
}

impl MemoryStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with `root` as the whole tree
    #[must_use]
    pub fn with_value(root: Value) -> Self {
        Self {
            tree: Mutex::new(Tree {
                root,
                watchers: Vec::new(),
            }),
        }
    }

    /// Copy of the whole tree
    #[must_use]
    pub fn snapshot(&self) -> Value {
        self.tree.lock().root.clone()
    }

    /// Number of live subscriptions
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let mut guard = self.tree.lock();
        guard.watchers.retain(|w| !w.sender.is_closed());
        guard.watchers.len()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn write(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        let mut guard = self.tree.lock();
        tree::put(&mut guard.root, path.segments(), value);
        guard.notify(path);
        tracing::trace!(%path, "memory write");
        Ok(())
    }

    async fn patch(
        &self,
        path: &StorePath,
        partial: Map<String, Value>,
    ) -> Result<(), StoreError> {
        for key in partial.keys() {
            path.child(key.as_str())?;
        }
        let mut guard = self.tree.lock();
        tree::merge(&mut guard.root, path.segments(), partial);
        guard.notify(path);
        tracing::trace!(%path, "memory patch");
        Ok(())
    }

    async fn read_once(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        Ok(tree::read(&self.tree.lock().root, path.segments()))
    }

    async fn subscribe(&self, path: &StorePath) -> Result<SnapshotStream, StoreError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        {
            let mut guard = self.tree.lock();
            // Sent under the lock so no change can slip in before the first snapshot
            let _ = sender.send(tree::read(&guard.root, path.segments()));
            guard.watchers.push(Watcher {
                path: path.clone(),
                sender,
            });
        }
        let stream = futures::stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|snapshot| (Ok(snapshot), receiver))
        });
        Ok(stream.boxed())
    }
}
