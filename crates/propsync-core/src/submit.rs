//! Scraping a page into records and folding save outcomes
//!
//! [`collect`] turns every card into one [`PropertyData`]. After the patches
//! settle, their outcomes are folded into a [`SubmitReport`], which yields
//! the single notification shown for the submit.

use crate::model::{Contact, FieldSlot, PropertyData, RoleTable, RoleValue, StateKey};
use crate::notify::Notification;
use crate::page::FormPage;
use indexmap::IndexMap;
use propsync_store::StoreError;

/// Build one record per card from its editable fields
///
/// Values are trimmed. A later card with the same label replaces an earlier
/// one.
#[must_use]
pub fn collect(page: &FormPage, roles: &RoleTable) -> IndexMap<String, PropertyData> {
    let mut records = IndexMap::new();
    for card in &page.cards {
        let mut data = PropertyData::new();
        for field in card.editable_fields() {
            let Some(binding) = roles.bind_field(&field.id) else {
                tracing::debug!("Field {} maps to no role attribute", field.id);
                continue;
            };
            let value = field.value.trim().to_string();
            match binding.slot {
                FieldSlot::Scalar => {
                    data.insert(binding.role, RoleValue::Scalar(value));
                }
                FieldSlot::Name | FieldSlot::Email => {
                    // Slots come from the base id's kind, so the entry is never a scalar
                    let entry = data
                        .entry(binding.role)
                        .or_insert_with(|| RoleValue::Contact(Contact::default()));
                    if let RoleValue::Contact(contact) = entry {
                        if binding.slot == FieldSlot::Name {
                            contact.name = Some(value);
                        } else {
                            contact.email = Some(value);
                        }
                    }
                }
            }
        }
        records.insert(card.name().to_string(), data);
    }
    records
}

/// Settled save of one property
#[derive(Debug)]
pub struct PropertyOutcome {
    pub property: String,
    pub result: Result<(), StoreError>,
}

impl PropertyOutcome {
    /// Create outcome
    #[must_use]
    pub fn new(property: impl Into<String>, result: Result<(), StoreError>) -> Self {
        Self {
            property: property.into(),
            result,
        }
    }
}

/// Every outcome of one submit
#[derive(Debug)]
pub struct SubmitReport {
    pub state: StateKey,
    pub outcomes: Vec<PropertyOutcome>,
}

impl SubmitReport {
    /// Fold settled outcomes
    #[must_use]
    pub fn new(state: StateKey, outcomes: Vec<PropertyOutcome>) -> Self {
        Self { state, outcomes }
    }

    /// Whether every property was saved
    #[must_use]
    pub fn all_saved(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    /// Failed properties with their errors, in submit order
    pub fn failures(&self) -> impl Iterator<Item = (&str, &StoreError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.property.as_str(), e)))
    }

    /// The one notification for this submit
    #[must_use]
    pub fn notification(&self) -> Notification {
        if self.all_saved() {
            return Notification::success(format!(
                "All property data for {} has been successfully saved!",
                self.state
            ));
        }
        let lines: Vec<String> = self
            .failures()
            .map(|(property, e)| format!("Error saving {property}: {e}"))
            .collect();
        Notification::failure(format!(
            "Some errors occurred while saving:\n{}",
            lines.join("\n")
        ))
    }
}
