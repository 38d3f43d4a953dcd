//! Page fixtures shared by the flow tests

#![allow(dead_code)]

use propsync_core::{BannerBoard, FormField, FormPage, FormSync, PropertyCard, PropertyRecords};
use propsync_test_utils::ScriptedStore;
use std::sync::Arc;

/// Delaware form: two stored properties and one with no stored data
pub fn delaware_page() -> FormPage {
    FormPage::new("Property Contacts: Delaware")
        .with_card(
            PropertyCard::new("\n  Westover Pointe  ")
                .with_field(FormField::new("accountant-name"))
                .with_field(FormField::new("accountant-email"))
                .with_field(FormField::new("manager-name"))
                .with_field(FormField::new("manager-email"))
                .with_field(FormField::new("unit-101")),
        )
        .with_card(
            PropertyCard::new("Harbor View")
                .with_field(FormField::new("manager-name"))
                .with_field(FormField::new("manager-email"))
                .with_field(FormField::new("7-unit")),
        )
        .with_card(
            PropertyCard::new("New Listing")
                .with_field(FormField::new("accountant-name"))
                .with_field(FormField::new("accountant-email")),
        )
}

/// Controller over a shared store with a persistent banner
pub fn controller(store: Arc<ScriptedStore>) -> (FormSync<Arc<ScriptedStore>>, BannerBoard) {
    controller_with_board(store, BannerBoard::persistent())
}

pub fn controller_with_board(
    store: Arc<ScriptedStore>,
    board: BannerBoard,
) -> (FormSync<Arc<ScriptedStore>>, BannerBoard) {
    let sync = FormSync::new(PropertyRecords::new(store), Arc::new(board.clone()));
    (sync, board)
}

/// Set field `id` of the card for `property`
pub fn edit(page: &mut FormPage, property: &str, id: &str, value: &str) {
    let card = page.card_mut(property).expect("card exists");
    let field = card
        .fields
        .iter_mut()
        .find(|f| f.id == id)
        .expect("field exists");
    field.value = value.to_string();
}
