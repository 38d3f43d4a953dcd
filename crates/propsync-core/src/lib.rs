//! propsync core - keeps contact forms and stored property records in step
//!
//! The form page shows one card per property of a state. This crate:
//! - Derives the state from the page title
//! - Populates cards from `properties/{state}` (once or live)
//! - Scrapes cards into per-property records on submit
//! - Merge-patches every property concurrently and folds the outcomes
//! - Shows exactly one notification per submit
//!
//! # Example
//!
//! ```rust,ignore
//! use propsync_core::prelude::*;
//! use propsync_store::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let board = BannerBoard::default();
//! let sync = FormSync::new(PropertyRecords::new(MemoryStore::new()), Arc::new(board.clone()));
//!
//! let mut page = FormPage::load("delaware.yaml")?;
//! sync.load_once(&mut page).await?;
//! let report = sync.submit(&page).await?;
//! println!("{}", report.notification().message);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod load;
pub mod model;
pub mod notify;
pub mod page;
pub mod records;
pub mod selector;
pub mod submit;
pub mod sync;

pub use config::{BannerConfig, RolesConfig, SyncConfig, ENV_AUTH_TOKEN, ENV_DATABASE_URL};
pub use error::{ConfigError, PageError, SyncError, SyncResult, TitleError};
pub use load::{apply_snapshot, LoadReport};
pub use model::{
    encode_property, Contact, FieldBinding, FieldSlot, PropertyData, RoleKind, RoleTable,
    RoleValue, StateData, StateKey,
};
pub use notify::{BannerBoard, Notification, NotificationKind, Notifier};
pub use page::{FormField, FormPage, PropertyCard};
pub use records::{
    AllSnapshot, AllStates, DecodeIssue, PropertyRecords, Snapshot, StateSnapshot,
};
pub use selector::Selector;
pub use submit::{collect, PropertyOutcome, SubmitReport};
pub use sync::FormSync;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a form page
    pub use crate::{
        BannerBoard, FormPage, FormSync, Notifier, PropertyData, PropertyRecords, RoleTable,
        RoleValue, StateKey, SubmitReport, SyncConfig,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
