//! Populating a page from stored data
//!
//! Every stored property is matched to the card with the same trimmed label.
//! Unit roles fill `#{role}`; contact roles fill `#{role}-name` and
//! `#{role}-email` when the stored attribute is non-empty. Nothing is ever
//! cleared, so applying a later snapshot only overwrites what it carries.

use crate::model::{RoleKind, RoleTable, RoleValue, StateData};
use crate::page::{FormPage, PropertyCard};
use crate::records::DecodeIssue;
use crate::selector::Selector;

/// What one application of stored data did to a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Properties with a matching card
    pub matched: Vec<String>,
    /// Stored properties with no card on the page
    pub missing_cards: Vec<String>,
    /// Fields whose value was set
    pub fields_written: usize,
    /// `property/role` entries whose stored shape does not fit the role kind
    pub mismatched: Vec<String>,
    /// Stored values skipped while decoding the snapshot
    pub issues: Vec<DecodeIssue>,
}

impl LoadReport {
    /// Whether every stored role was decoded with the expected shape
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.mismatched.is_empty() && self.issues.is_empty()
    }

    /// With decode issues of the applied snapshot
    #[inline]
    #[must_use]
    pub fn with_issues(mut self, issues: Vec<DecodeIssue>) -> Self {
        self.issues = issues;
        self
    }
}

/// Write `data` into the matching cards of `page`
pub fn apply_snapshot(page: &mut FormPage, data: &StateData, roles: &RoleTable) -> LoadReport {
    let mut report = LoadReport::default();
    for (property, record) in data {
        let Some(card) = page.card_mut(property) else {
            tracing::debug!("No card for stored property {}", property);
            report.missing_cards.push(property.clone());
            continue;
        };
        for (role, value) in record {
            match (roles.kind_of(role), value) {
                (RoleKind::Unit, RoleValue::Scalar(scalar)) => {
                    report.fields_written += usize::from(fill(card, role, scalar));
                }
                (RoleKind::Contact, RoleValue::Contact(contact)) => {
                    for (suffix, attr) in [("name", &contact.name), ("email", &contact.email)] {
                        if let Some(text) = attr.as_deref().filter(|t| !t.is_empty()) {
                            let id = format!("{role}-{suffix}");
                            report.fields_written += usize::from(fill(card, &id, text));
                        }
                    }
                }
                (kind, value) => {
                    tracing::warn!(
                        "Stored {:?} value for {:?} role {}/{} ignored",
                        value.kind(),
                        kind,
                        property,
                        role
                    );
                    report.mismatched.push(format!("{property}/{role}"));
                }
            }
        }
        report.matched.push(property.clone());
    }
    report
}

/// Set field `id` on `card`; false when the card has no such field
fn fill(card: &mut PropertyCard, id: &str, value: &str) -> bool {
    match card.query_mut(&Selector::id(id)) {
        Some(field) => {
            tracing::debug!("Populating {}", id);
            field.value = value.to_string();
            true
        }
        None => false,
    }
}
