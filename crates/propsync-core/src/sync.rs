//! Form sync controller
//!
//! Ties the page, the records facade and the notifier together:
//! - `load_once`: read the page's state once and populate its cards
//! - `watch`: re-populate the page on every stored change
//! - `submit`: scrape the page, patch every property concurrently, then
//!   show exactly one notification

use crate::error::{SyncError, SyncResult};
use crate::load::{apply_snapshot, LoadReport};
use crate::model::RoleTable;
use crate::notify::Notifier;
use crate::page::FormPage;
use crate::records::PropertyRecords;
use crate::submit::{collect, PropertyOutcome, SubmitReport};
use futures::future::join_all;
use futures::StreamExt;
use propsync_store::RemoteStore;
use std::ops::ControlFlow;
use std::sync::Arc;

/// Controller for one form page at a time
pub struct FormSync<S> {
    records: PropertyRecords<S>,
    roles: RoleTable,
    notifier: Arc<dyn Notifier>,
}

impl<S: RemoteStore> FormSync<S> {
    /// Controller with the standard role table
    #[must_use]
    pub fn new(records: PropertyRecords<S>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            records,
            roles: RoleTable::standard(),
            notifier,
        }
    }

    /// With role table
    #[inline]
    #[must_use]
    pub fn with_roles(mut self, roles: RoleTable) -> Self {
        self.roles = roles;
        self
    }

    /// Records facade
    #[inline]
    #[must_use]
    pub fn records(&self) -> &PropertyRecords<S> {
        &self.records
    }

    /// Role table in use
    #[inline]
    #[must_use]
    pub fn roles(&self) -> &RoleTable {
        &self.roles
    }

    /// Populate `page` from the stored data of its state, once
    ///
    /// # Errors
    /// [`SyncError::Title`] when the title names no state,
    /// [`SyncError::Store`] when the read fails
    pub async fn load_once(&self, page: &mut FormPage) -> SyncResult<LoadReport> {
        let state = page.state_key()?;
        let snapshot = self.records.property_data_by_state(&state).await?;
        let report =
            apply_snapshot(page, &snapshot.data, &self.roles).with_issues(snapshot.issues);
        tracing::info!(
            "Loaded {} of {} stored properties for {}",
            report.matched.len(),
            snapshot.data.len(),
            state
        );
        Ok(report)
    }

    /// Populate `page` on every change to its state
    ///
    /// `on_snapshot` sees the page after each application, or the read error
    /// that interrupted the subscription. Returns when the subscription ends
    /// or `on_snapshot` breaks.
    ///
    /// # Errors
    /// [`SyncError::Title`] when the title names no state,
    /// [`SyncError::Store`] when the subscription cannot be opened
    pub async fn watch<F>(&self, page: &mut FormPage, mut on_snapshot: F) -> SyncResult<()>
    where
        F: FnMut(&FormPage, SyncResult<LoadReport>) -> ControlFlow<()>,
    {
        let state = page.state_key()?;
        let mut snapshots = self.records.watch_state(&state).await?;
        tracing::info!("Watching property data for {}", state);

        while let Some(item) = snapshots.next().await {
            let outcome = match item {
                Ok(snapshot) => {
                    let report = apply_snapshot(page, &snapshot.data, &self.roles)
                        .with_issues(snapshot.issues);
                    tracing::debug!("Re-rendered {} properties for {}", report.matched.len(), state);
                    Ok(report)
                }
                Err(e) => {
                    tracing::error!("Error getting property data for {}: {}", state, e);
                    Err(SyncError::from(e))
                }
            };
            if on_snapshot(page, outcome).is_break() {
                break;
            }
        }
        Ok(())
    }

    /// Save every card of `page` and show one notification
    ///
    /// Each property is merge-patched independently and concurrently; a
    /// failure is recorded in the report and never stops the others.
    ///
    /// # Errors
    /// [`SyncError::Title`] when the title names no state; nothing is written
    pub async fn submit(&self, page: &FormPage) -> SyncResult<SubmitReport> {
        let state = page.state_key()?;
        let payloads = collect(page, &self.roles);
        tracing::info!("Saving {} properties for {}", payloads.len(), state);

        let saves = payloads.iter().map(|(property, data)| {
            let state = &state;
            async move {
                let result = self.records.update_property_data(state, property, data).await;
                PropertyOutcome::new(property.as_str(), result)
            }
        });
        let outcomes = join_all(saves).await;

        let report = SubmitReport::new(state, outcomes);
        self.notifier.show(report.notification());
        Ok(report)
    }
}

impl<S> std::fmt::Debug for FormSync<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormSync")
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}
