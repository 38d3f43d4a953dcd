//! Property-level operations over a [`RemoteStore`]
//!
//! Paths follow one scheme below a configurable root key:
//! - `{root}` → every state
//! - `{root}/{state}` → every property of a state
//! - `{root}/{state}/{property}` → one property record
//!
//! Stored data is decoded leniently: a property or role whose shape does not
//! fit is skipped and reported as a [`DecodeIssue`] instead of failing the
//! whole snapshot.

use crate::model::{encode_property, PropertyData, RoleValue, StateData, StateKey};
use futures::stream::BoxStream;
use futures::StreamExt;
use indexmap::IndexMap;
use propsync_store::{RemoteStore, StoreError, StorePath, DEFAULT_ROOT};
use serde_json::Value;

/// Every state: state name → properties
pub type AllStates = IndexMap<String, StateData>;

/// Stored value that could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeIssue {
    /// Location of the offending value, relative to the root
    pub path: String,
    /// What was wrong with it
    pub reason: String,
}

/// Decoded data plus whatever had to be skipped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot<T> {
    pub data: T,
    pub issues: Vec<DecodeIssue>,
}

/// Snapshot of `{root}/{state}`
pub type StateSnapshot = Snapshot<StateData>;

/// Snapshot of `{root}`
pub type AllSnapshot = Snapshot<AllStates>;

/// Live snapshots of one state
pub type StateStream = BoxStream<'static, Result<StateSnapshot, StoreError>>;

/// Live snapshots of every state
pub type AllStream = BoxStream<'static, Result<AllSnapshot, StoreError>>;

/// Typed facade for property records
#[derive(Debug, Clone)]
pub struct PropertyRecords<S> {
    store: S,
    root: StorePath,
}

impl<S: RemoteStore> PropertyRecords<S> {
    /// Records under the default `properties` root
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            root: StorePath::root()
                .child(DEFAULT_ROOT)
                .unwrap_or_else(|_| StorePath::root()),
        }
    }

    /// Records under a custom root, e.g. `staging/properties`
    ///
    /// # Errors
    /// [`StoreError::InvalidPath`] when `root` is not a valid path
    pub fn with_root(store: S, root: &str) -> Result<Self, StoreError> {
        Ok(Self {
            store,
            root: root.parse()?,
        })
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Root path
    #[inline]
    #[must_use]
    pub fn root(&self) -> &StorePath {
        &self.root
    }

    /// Path of `{root}/{state}`
    ///
    /// # Errors
    /// [`StoreError::InvalidPath`] when the state name is not a valid key
    pub fn state_path(&self, state: &StateKey) -> Result<StorePath, StoreError> {
        Ok(self.root.child(state.as_str())?)
    }

    /// Path of `{root}/{state}/{property}`
    ///
    /// # Errors
    /// [`StoreError::InvalidPath`] when either name is not a valid key
    pub fn property_path(&self, state: &StateKey, property: &str) -> Result<StorePath, StoreError> {
        Ok(self.state_path(state)?.child(property)?)
    }

    /// Replace the whole record of one property
    ///
    /// # Errors
    /// [`StoreError`] when the write is rejected; it is logged before returning
    pub async fn write_property_data(
        &self,
        state: &StateKey,
        property: &str,
        data: &PropertyData,
    ) -> Result<(), StoreError> {
        let result = async {
            let path = self.property_path(state, property)?;
            self.store
                .write(&path, Value::Object(encode_property(data)))
                .await
        }
        .await;
        match &result {
            Ok(()) => tracing::info!("Property data written for {}/{}", state, property),
            Err(e) => tracing::error!("Error writing property data for {}/{}: {}", state, property, e),
        }
        result
    }

    /// Merge `data` into the record of one property
    ///
    /// Each role in `data` replaces the stored role of the same name; other
    /// stored roles are left untouched.
    ///
    /// # Errors
    /// [`StoreError`] when the patch is rejected; it is logged before returning
    pub async fn update_property_data(
        &self,
        state: &StateKey,
        property: &str,
        data: &PropertyData,
    ) -> Result<(), StoreError> {
        let result = async {
            let path = self.property_path(state, property)?;
            self.store.patch(&path, encode_property(data)).await
        }
        .await;
        match &result {
            Ok(()) => tracing::info!("Property data updated for {}/{}", state, property),
            Err(e) => tracing::error!("Error updating property data for {}/{}: {}", state, property, e),
        }
        result
    }

    /// Every property of `state`, read once
    ///
    /// # Errors
    /// [`StoreError`] when the read fails; it is logged before returning
    pub async fn property_data_by_state(&self, state: &StateKey) -> Result<StateSnapshot, StoreError> {
        let result = async {
            let path = self.state_path(state)?;
            self.store.read_once(&path).await
        }
        .await;
        match result {
            Ok(value) => Ok(decode_state(state.as_str(), value)),
            Err(e) => {
                tracing::error!("Error getting property data for {}: {}", state, e);
                Err(e)
            }
        }
    }

    /// Every property of `state`, now and after each change
    ///
    /// # Errors
    /// [`StoreError`] when the subscription cannot be opened
    pub async fn watch_state(&self, state: &StateKey) -> Result<StateStream, StoreError> {
        let path = self.state_path(state)?;
        let stream = self.store.subscribe(&path).await.map_err(|e| {
            tracing::error!("Error subscribing to {}: {}", path, e);
            e
        })?;
        let prefix = state.to_string();
        Ok(stream
            .map(move |item| item.map(|value| decode_state(&prefix, value)))
            .boxed())
    }

    /// Every state, read once
    ///
    /// # Errors
    /// [`StoreError`] when the read fails; it is logged before returning
    pub async fn all_property_data(&self) -> Result<AllSnapshot, StoreError> {
        match self.store.read_once(&self.root).await {
            Ok(value) => Ok(decode_all(value)),
            Err(e) => {
                tracing::error!("Error getting all property data: {}", e);
                Err(e)
            }
        }
    }

    /// Every state, now and after each change
    ///
    /// # Errors
    /// [`StoreError`] when the subscription cannot be opened
    pub async fn watch_all(&self) -> Result<AllStream, StoreError> {
        let stream = self.store.subscribe(&self.root).await.map_err(|e| {
            tracing::error!("Error subscribing to {}: {}", self.root, e);
            e
        })?;
        Ok(stream.map(|item| item.map(decode_all)).boxed())
    }
}

/// Decode `{root}/{state}`; `prefix` labels issues
#[must_use]
pub fn decode_state(prefix: &str, value: Option<Value>) -> StateSnapshot {
    let mut snapshot = StateSnapshot::default();
    decode_state_into(prefix, value, &mut snapshot.data, &mut snapshot.issues);
    snapshot
}

/// Decode `{root}`
#[must_use]
pub fn decode_all(value: Option<Value>) -> AllSnapshot {
    let mut snapshot = AllSnapshot::default();
    let states = match value {
        None => return snapshot,
        Some(Value::Object(states)) => states,
        Some(other) => {
            snapshot.issues.push(issue("", &other, "expected an object of states"));
            return snapshot;
        }
    };
    for (state, value) in states {
        let mut data = StateData::new();
        decode_state_into(&state, Some(value), &mut data, &mut snapshot.issues);
        snapshot.data.insert(state, data);
    }
    snapshot
}

fn decode_state_into(
    prefix: &str,
    value: Option<Value>,
    data: &mut StateData,
    issues: &mut Vec<DecodeIssue>,
) {
    let properties = match value {
        None => return,
        Some(Value::Object(properties)) => properties,
        Some(other) => {
            issues.push(issue(prefix, &other, "expected an object of properties"));
            return;
        }
    };
    for (property, record) in properties {
        let at = format!("{prefix}/{property}");
        let roles = match record {
            Value::Object(roles) => roles,
            other => {
                issues.push(issue(&at, &other, "expected an object of roles"));
                continue;
            }
        };
        let mut decoded = PropertyData::new();
        for (role, value) in roles {
            match decode_role(&value) {
                Some(role_value) => {
                    decoded.insert(role, role_value);
                }
                None => issues.push(issue(
                    &format!("{at}/{role}"),
                    &value,
                    "expected a scalar or a {name, email} object",
                )),
            }
        }
        data.insert(property, decoded);
    }
}

/// Numbers and booleans are kept as their text, the way a form field shows them
fn decode_role(value: &Value) -> Option<RoleValue> {
    match value {
        Value::Number(n) => Some(RoleValue::Scalar(n.to_string())),
        Value::Bool(b) => Some(RoleValue::Scalar(b.to_string())),
        other => serde_json::from_value(other.clone()).ok(),
    }
}

fn issue(path: &str, value: &Value, expected: &str) -> DecodeIssue {
    tracing::warn!("Skipping stored value at {}: {}, got {}", path, expected, value);
    DecodeIssue {
        path: path.to_string(),
        reason: format!("{expected}, got {value}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Contact;
    use propsync_store::{MemoryStore, MockRemoteStore};
    use serde_json::json;

    fn state() -> StateKey {
        StateKey::new("Delaware").unwrap()
    }

    fn westover() -> PropertyData {
        let mut data = PropertyData::new();
        data.insert(
            "accountant".into(),
            RoleValue::Contact(Contact::new("Jane Doe", "jane@x.com")),
        );
        data.insert("unit-101".into(), RoleValue::Scalar("101".into()));
        data
    }

    #[tokio::test]
    async fn update_merges_into_record() {
        let store = MemoryStore::with_value(json!({
            "properties": {"Delaware": {"Westover Pointe": {"manager": {"name": "Sam"}}}}
        }));
        let records = PropertyRecords::new(store);
        records
            .update_property_data(&state(), "Westover Pointe", &westover())
            .await
            .unwrap();

        assert_eq!(
            records.store().snapshot(),
            json!({"properties": {"Delaware": {"Westover Pointe": {
                "manager": {"name": "Sam"},
                "accountant": {"name": "Jane Doe", "email": "jane@x.com"},
                "unit-101": "101"
            }}}})
        );
    }

    #[tokio::test]
    async fn write_replaces_record() {
        let store = MemoryStore::with_value(json!({
            "properties": {"Delaware": {"Westover Pointe": {"manager": {"name": "Sam"}}}}
        }));
        let records = PropertyRecords::new(store);
        records
            .write_property_data(&state(), "Westover Pointe", &westover())
            .await
            .unwrap();

        let snapshot = records.property_data_by_state(&state()).await.unwrap();
        assert_eq!(snapshot.data["Westover Pointe"], westover());
        assert!(snapshot.issues.is_empty());
    }

    #[tokio::test]
    async fn missing_state_is_empty() {
        let records = PropertyRecords::new(MemoryStore::new());
        let snapshot = records.property_data_by_state(&state()).await.unwrap();
        assert!(snapshot.data.is_empty());
    }

    #[tokio::test]
    async fn custom_root() {
        let records = PropertyRecords::with_root(MemoryStore::new(), "staging/properties").unwrap();
        records
            .update_property_data(&state(), "A", &westover())
            .await
            .unwrap();
        assert!(records.store().snapshot()["staging"]["properties"]["Delaware"]["A"].is_object());
    }

    #[tokio::test]
    async fn invalid_property_name_fails_without_store_call() {
        let mut store = MockRemoteStore::new();
        store.expect_patch().never();
        let records = PropertyRecords::new(store);
        let err = records
            .update_property_data(&state(), "Suite 4.B", &westover())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn read_failure_is_returned() {
        let mut store = MockRemoteStore::new();
        store
            .expect_read_once()
            .returning(|path| Err(StoreError::read(path, "Permission denied")));
        let records = PropertyRecords::new(store);
        let err = records.property_data_by_state(&state()).await.unwrap_err();
        assert!(err.is_read());
    }

    #[test]
    fn lenient_decoding_reports_issues() {
        let snapshot = decode_state(
            "Delaware",
            Some(json!({
                "A": {"unit-1": "1", "accountant": {"name": "Jo"}, "bad": [4, 2]},
                "B": "not a record"
            })),
        );
        assert_eq!(snapshot.data.len(), 1);
        assert_eq!(snapshot.data["A"].len(), 2);
        assert_eq!(
            snapshot.data["A"]["accountant"],
            RoleValue::Contact(Contact {
                name: Some("Jo".into()),
                email: None
            })
        );
        let paths: Vec<_> = snapshot.issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["Delaware/A/bad", "Delaware/B"]);
    }

    #[test]
    fn numbers_and_booleans_decode_as_text() {
        let snapshot = decode_state(
            "Delaware",
            Some(json!({"A": {"unit-101": 101, "unit-2": 2.5, "unit-vacant": true}})),
        );
        assert!(snapshot.issues.is_empty());
        let record = &snapshot.data["A"];
        assert_eq!(record["unit-101"], RoleValue::Scalar("101".into()));
        assert_eq!(record["unit-2"], RoleValue::Scalar("2.5".into()));
        assert_eq!(record["unit-vacant"], RoleValue::Scalar("true".into()));
    }

    #[test]
    fn decode_all_states() {
        let all = decode_all(Some(json!({
            "Delaware": {"A": {"unit-1": "1"}},
            "Ohio": {"B": {"manager": {"email": "m@x.com"}}}
        })));
        assert_eq!(all.data.keys().collect::<Vec<_>>(), vec!["Delaware", "Ohio"]);
        assert!(all.issues.is_empty());
        assert!(decode_all(None).data.is_empty());
    }

    #[tokio::test]
    async fn watch_state_follows_changes() {
        let records = PropertyRecords::new(MemoryStore::new());
        let mut stream = records.watch_state(&state()).await.unwrap();
        assert!(stream.next().await.unwrap().unwrap().data.is_empty());

        records
            .update_property_data(&state(), "Westover Pointe", &westover())
            .await
            .unwrap();
        let next = stream.next().await.unwrap().unwrap();
        assert_eq!(next.data["Westover Pointe"], westover());
    }
}
