//! Form page model
//!
//! A page is a title plus one card per property. Each card shows the
//! property name as its label and holds the editable fields whose ids follow
//! the `{role}`, `{role}-name`, `{role}-email` convention.
//!
//! Pages round-trip through JSON or YAML documents, chosen by extension.

use crate::error::{PageError, TitleError};
use crate::model::StateKey;
use crate::selector::Selector;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One editable element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    /// Element id
    pub id: String,
    /// Current content
    #[serde(default)]
    pub value: String,
    /// Whether the user can edit it; read-only fields are never scraped
    #[serde(default = "editable_default")]
    pub editable: bool,
}

fn editable_default() -> bool {
    true
}

impl FormField {
    /// Editable field with an empty value
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: String::new(),
            editable: true,
        }
    }

    /// With value
    #[inline]
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Mark read-only
    #[inline]
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }
}

/// Container for one property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyCard {
    /// Heading text; may carry surrounding whitespace
    pub label: String,
    /// Fields in document order
    #[serde(default)]
    pub fields: Vec<FormField>,
}

impl PropertyCard {
    /// Card with no fields
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            fields: Vec::new(),
        }
    }

    /// With a field appended
    #[inline]
    #[must_use]
    pub fn with_field(mut self, field: FormField) -> Self {
        self.fields.push(field);
        self
    }

    /// Property name: the trimmed label
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.label.trim()
    }

    /// First field matched by `selector`
    #[must_use]
    pub fn query(&self, selector: &Selector) -> Option<&FormField> {
        let id = selector.target_id()?;
        self.fields.iter().find(|f| f.id == id)
    }

    /// First field matched by `selector`, mutably
    pub fn query_mut(&mut self, selector: &Selector) -> Option<&mut FormField> {
        let id = selector.target_id()?;
        self.fields.iter_mut().find(|f| f.id == id)
    }

    /// Fields the user can edit
    pub fn editable_fields(&self) -> impl Iterator<Item = &FormField> {
        self.fields.iter().filter(|f| f.editable)
    }
}

/// The whole form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormPage {
    /// Document title, `"<purpose>: <State>"`
    pub title: String,
    /// Property cards in document order
    #[serde(default)]
    pub cards: Vec<PropertyCard>,
}

impl FormPage {
    /// Page with no cards
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            cards: Vec::new(),
        }
    }

    /// With a card appended
    #[inline]
    #[must_use]
    pub fn with_card(mut self, card: PropertyCard) -> Self {
        self.cards.push(card);
        self
    }

    /// State key from the title
    ///
    /// # Errors
    /// [`TitleError`] when the title does not name a state
    pub fn state_key(&self) -> Result<StateKey, TitleError> {
        StateKey::from_title(&self.title)
    }

    /// First card whose trimmed label equals `property`
    #[must_use]
    pub fn card(&self, property: &str) -> Option<&PropertyCard> {
        self.cards.iter().find(|c| c.name() == property)
    }

    /// First card whose trimmed label equals `property`, mutably
    pub fn card_mut(&mut self, property: &str) -> Option<&mut PropertyCard> {
        self.cards.iter_mut().find(|c| c.name() == property)
    }

    /// Value of field `id` on the card for `property`
    #[must_use]
    pub fn field_value(&self, property: &str, id: &str) -> Option<&str> {
        self.card(property)?
            .query(&Selector::id(id))
            .map(|f| f.value.as_str())
    }

    /// Read a page document
    ///
    /// # Errors
    /// [`PageError`] on I/O failure, unknown extension or malformed content
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PageError> {
        let path = path.as_ref();
        let format = PageFormat::of(path)?;
        let text = std::fs::read_to_string(path).map_err(|e| PageError::io_error(path, e))?;
        Ok(match format {
            PageFormat::Json => serde_json::from_str(&text)?,
            PageFormat::Yaml => serde_yaml::from_str(&text)?,
        })
    }

    /// Write the page document
    ///
    /// # Errors
    /// [`PageError`] on I/O failure or unknown extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PageError> {
        let path = path.as_ref();
        let text = match PageFormat::of(path)? {
            PageFormat::Json => serde_json::to_string_pretty(self)? + "\n",
            PageFormat::Yaml => serde_yaml::to_string(self)?,
        };
        std::fs::write(path, text).map_err(|e| PageError::io_error(path, e))
    }
}

#[derive(Debug, Clone, Copy)]
enum PageFormat {
    Json,
    Yaml,
}

impl PageFormat {
    fn of(path: &Path) -> Result<Self, PageError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            _ => Err(PageError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}
