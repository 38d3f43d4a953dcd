//! Record types stored under `properties/{state}/{property}`
//!
//! - [`StateKey`]: top-level partition key taken from the page title
//! - [`RoleValue`]: either a scalar (unit numbers) or a `{name, email}` contact
//! - [`PropertyData`]: role identifier → value, the full record of one property
//! - [`RoleTable`]: decides which of the two shapes a role uses

use crate::error::TitleError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Separator between the page purpose and the state name in a title
pub const TITLE_SEPARATOR: &str = ": ";

/// State identifier (e.g. `Delaware`), the first key below the root
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateKey(String);

impl StateKey {
    /// Create a state key
    ///
    /// # Errors
    /// [`TitleError::EmptyState`] when `name` is empty
    pub fn new(name: impl Into<String>) -> Result<Self, TitleError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TitleError::EmptyState { title: name });
        }
        Ok(Self(name))
    }

    /// Derive the state from a page title of the form `"<purpose>: <State>"`
    ///
    /// The title is split on every `": "` and the second piece is taken, so
    /// `"Contacts: Delaware: draft"` yields `Delaware`.
    ///
    /// # Errors
    /// [`TitleError::MissingSeparator`] when the title has no `": "`,
    /// [`TitleError::EmptyState`] when the piece after it is empty.
    pub fn from_title(title: &str) -> Result<Self, TitleError> {
        let state = title
            .split(TITLE_SEPARATOR)
            .nth(1)
            .ok_or_else(|| TitleError::MissingSeparator {
                title: title.to_string(),
            })?;
        if state.is_empty() {
            return Err(TitleError::EmptyState {
                title: title.to_string(),
            });
        }
        Ok(Self(state.to_string()))
    }

    /// Get the key as a string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Person attached to a role
///
/// Either attribute may be missing from stored data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Contact {
    /// Contact with both attributes set
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: Some(email.into()),
        }
    }
}

/// Value stored for one role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoleValue {
    /// Single string, used by unit roles
    Scalar(String),
    /// Name and email pair, used by every other role
    Contact(Contact),
}

impl RoleValue {
    /// Shape of this value
    #[inline]
    #[must_use]
    pub fn kind(&self) -> RoleKind {
        match self {
            Self::Scalar(_) => RoleKind::Unit,
            Self::Contact(_) => RoleKind::Contact,
        }
    }

    /// JSON form as stored remotely
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Scalar(s) => Value::String(s.clone()),
            Self::Contact(contact) => {
                let mut map = Map::new();
                if let Some(name) = &contact.name {
                    map.insert("name".to_string(), Value::String(name.clone()));
                }
                if let Some(email) = &contact.email {
                    map.insert("email".to_string(), Value::String(email.clone()));
                }
                Value::Object(map)
            }
        }
    }
}

/// Full record of one property: role identifier → value
pub type PropertyData = IndexMap<String, RoleValue>;

/// Every property of one state
pub type StateData = IndexMap<String, PropertyData>;

/// Record as a JSON object, ready to write or patch
#[must_use]
pub fn encode_property(data: &PropertyData) -> Map<String, Value> {
    data.iter()
        .map(|(role, value)| (role.clone(), value.to_json()))
        .collect()
}

/// Which shape a role stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleKind {
    /// Scalar string under the bare role id
    Unit,
    /// `{name, email}` under the role id, fields `{role}-name` / `{role}-email`
    Contact,
}

/// Attribute a form field carries for its role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSlot {
    /// The whole scalar value
    Scalar,
    /// Contact name
    Name,
    /// Contact email
    Email,
}

/// Role identifier and attribute addressed by a form field id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    /// Role id with any `-name` / `-email` suffix removed
    pub role: String,
    /// Attribute of the role
    pub slot: FieldSlot,
}

/// Role-kind table
///
/// Explicit entries win; any other role is a unit when its identifier
/// contains `unit` and a contact otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTable {
    entries: HashMap<String, RoleKind>,
}

impl RoleTable {
    /// Table with no explicit entries
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Table knowing the standard contact roles
    #[must_use]
    pub fn standard() -> Self {
        Self::empty()
            .with_role("accountant", RoleKind::Contact)
            .with_role("manager", RoleKind::Contact)
    }

    /// With an explicit entry
    #[inline]
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>, kind: RoleKind) -> Self {
        self.entries.insert(role.into(), kind);
        self
    }

    /// Kind of a role identifier
    #[must_use]
    pub fn kind_of(&self, role: &str) -> RoleKind {
        if let Some(kind) = self.entries.get(role) {
            return *kind;
        }
        if role.contains("unit") {
            RoleKind::Unit
        } else {
            RoleKind::Contact
        }
    }

    /// Map a form field id to the role and attribute it edits
    ///
    /// `None` for contact-kind ids that name neither a name nor an email.
    #[must_use]
    pub fn bind_field(&self, field_id: &str) -> Option<FieldBinding> {
        let base = strip_role_suffix(field_id);
        if self.kind_of(base) == RoleKind::Unit {
            return Some(FieldBinding {
                role: base.to_string(),
                slot: FieldSlot::Scalar,
            });
        }
        let slot = if field_id.contains("name") {
            FieldSlot::Name
        } else if field_id.contains("email") {
            FieldSlot::Email
        } else {
            return None;
        };
        Some(FieldBinding {
            role: base.to_string(),
            slot,
        })
    }
}

impl Default for RoleTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Strip one trailing `-name`, then one trailing `-email`
#[must_use]
pub fn strip_role_suffix(field_id: &str) -> &str {
    let base = field_id.strip_suffix("-name").unwrap_or(field_id);
    base.strip_suffix("-email").unwrap_or(base)
}
