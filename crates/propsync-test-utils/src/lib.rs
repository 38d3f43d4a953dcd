//! Testing utilities for the propsync workspace
//!
//! Store fakes with failure injection and gating, plus stored-data fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use propsync_store::{MemoryStore, RemoteStore, SnapshotStream, StoreError, StorePath};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// One call seen by a [`ScriptedStore`]
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Write { path: String, value: Value },
    Patch { path: String, partial: Map<String, Value> },
    ReadOnce { path: String },
    Subscribe { path: String },
}

/// [`MemoryStore`] that records calls, fails writes for chosen properties and
/// can hold writes until released
#[derive(Debug, Default)]
pub struct ScriptedStore {
    inner: MemoryStore,
    failing: HashSet<String>,
    calls: Mutex<Vec<StoreCall>>,
    gate: Option<Arc<Semaphore>>,
    waiting: AtomicUsize,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeded with `root` as the whole tree
    pub fn with_value(root: Value) -> Self {
        Self {
            inner: MemoryStore::with_value(root),
            ..Self::default()
        }
    }

    /// Writes and patches to a path ending in `property` fail
    pub fn failing(mut self, property: impl Into<String>) -> Self {
        self.failing.insert(property.into());
        self
    }

    /// Writes and patches wait for [`ScriptedStore::release`]
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Let `n` held writes proceed
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Writes currently held by the gate
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    pub fn patch_count(&self) -> usize {
        self.count(|c| matches!(c, StoreCall::Patch { .. }))
    }

    pub fn write_count(&self) -> usize {
        self.count(|c| matches!(c, StoreCall::Write { .. }))
    }

    /// Whole tree
    pub fn snapshot(&self) -> Value {
        self.inner.snapshot()
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn count(&self, pred: impl Fn(&StoreCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|&c| pred(c)).count()
    }

    async fn pass_gate(&self) {
        let Some(gate) = &self.gate else {
            return;
        };
        self.waiting.fetch_add(1, Ordering::SeqCst);
        if let Ok(permit) = gate.acquire().await {
            permit.forget();
        }
        self.waiting.fetch_sub(1, Ordering::SeqCst);
    }

    fn rejects(&self, path: &StorePath) -> Result<(), StoreError> {
        match path.last() {
            Some(last) if self.failing.contains(last) => {
                Err(StoreError::write(path, "Permission denied"))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteStore for ScriptedStore {
    async fn write(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        self.calls.lock().push(StoreCall::Write {
            path: path.to_string(),
            value: value.clone(),
        });
        self.pass_gate().await;
        self.rejects(path)?;
        self.inner.write(path, value).await
    }

    async fn patch(
        &self,
        path: &StorePath,
        partial: Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.calls.lock().push(StoreCall::Patch {
            path: path.to_string(),
            partial: partial.clone(),
        });
        self.pass_gate().await;
        self.rejects(path)?;
        self.inner.patch(path, partial).await
    }

    async fn read_once(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        self.calls.lock().push(StoreCall::ReadOnce {
            path: path.to_string(),
        });
        self.inner.read_once(path).await
    }

    async fn subscribe(&self, path: &StorePath) -> Result<SnapshotStream, StoreError> {
        self.calls.lock().push(StoreCall::Subscribe {
            path: path.to_string(),
        });
        self.inner.subscribe(path).await
    }
}

/// Stored tree with two Delaware properties and one in Ohio
pub fn delaware_tree() -> Value {
    json!({
        "properties": {
            "Delaware": {
                "Westover Pointe": {
                    "accountant": {"name": "Jane Doe", "email": "jane@x.com"},
                    "manager": {"name": "Sam Reyes"},
                    "unit-101": "101",
                    "leasing": {"name": "Unmapped Role", "email": "leasing@x.com"}
                },
                "Harbor View": {
                    "7-unit": "7",
                    "manager": {"email": "hv@x.com"}
                }
            },
            "Ohio": {
                "Lakeside": {"accountant": {"name": "Olu"}}
            }
        }
    })
}
