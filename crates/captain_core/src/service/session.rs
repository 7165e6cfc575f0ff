//! Session wiring for the profile-filtered record variant.
//!
//! # Responsibility
//! - Own the viewer profile and persist it through preferences.
//! - Feed store snapshots into the workflow and the filtered projection.
//!
//! # Invariants
//! - The viewer profile is read once at construction and written on every
//!   accepted change.
//! - The projection is recomputed on every applied snapshot and every
//!   accepted profile change.
//! - Workflow and projection always see the same snapshot.

use crate::model::profile::Profile;
use crate::model::record::Profiled;
use crate::repo::preference_repo::PreferenceStore;
use crate::repo::record_repo::SqlRecord;
use crate::service::projection::FilteredProjection;
use crate::service::workflow::ActionWorkflow;
use crate::store::{RecordSnapshot, RecordStore, StoreResult, Subscription};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;

/// Preference key holding the viewer profile code.
pub const PROFILE_PREFERENCE_KEY: &str = "Profile";

/// Workflow, projection and viewer profile over one store.
pub struct ProfiledSession<E: SqlRecord + Profiled, P: PreferenceStore> {
    workflow: ActionWorkflow<E>,
    projection: FilteredProjection<E>,
    subscription: Subscription<E>,
    viewer: Profile,
    preferences: P,
    all: Option<RecordSnapshot<E>>,
}

impl<E: SqlRecord + Profiled, P: PreferenceStore> ProfiledSession<E, P> {
    /// Opens a session with the system clock and an entropy-seeded picker.
    pub fn open(store: Arc<RecordStore<E>>, preferences: P) -> StoreResult<Self> {
        Self::with_parts(ActionWorkflow::new(store), FilteredProjection::new(), preferences)
    }

    /// Opens a session from prepared parts.
    pub fn with_parts(
        workflow: ActionWorkflow<E>,
        projection: FilteredProjection<E>,
        preferences: P,
    ) -> StoreResult<Self> {
        let stored = preferences
            .get(PROFILE_PREFERENCE_KEY)
            .unwrap_or_else(|err| {
                warn!("event=session_open module=session status=degraded error_code=preference_read_failed error={err}");
                None
            });
        let decoded = Profile::decode(stored.as_deref());
        if decoded.used_default && stored.is_some() {
            warn!("event=session_open module=session status=degraded error_code=stored_profile_invalid");
        }

        let subscription = workflow.store().subscribe()?;
        info!(
            "event=session_open module=session status=ok table={} default_profile={}",
            E::TABLE,
            decoded.used_default
        );

        Ok(Self {
            workflow,
            projection,
            subscription,
            viewer: decoded.profile,
            preferences,
            all: None,
        })
    }

    /// Applies the most recent queued snapshot. Returns whether one arrived.
    pub fn sync(&mut self) -> bool {
        match self.subscription.try_latest() {
            Some(snapshot) => {
                self.apply(snapshot);
                true
            }
            None => false,
        }
    }

    /// Waits up to `timeout` for a snapshot, then applies the newest one.
    pub fn wait_for_update(&mut self, timeout: Duration) -> bool {
        let Some(first) = self.subscription.recv_timeout(timeout) else {
            return false;
        };
        let latest = self.subscription.try_latest().unwrap_or(first);
        self.apply(latest);
        true
    }

    /// Replaces the viewer profile from a profile code.
    ///
    /// Invalid codes are refused and leave the session untouched. The
    /// preference always stores the canonical encoding.
    pub fn set_profile(&mut self, encoded: &str) -> bool {
        if !self.viewer.feed_from_str(encoded) {
            debug!("event=profile_change module=session status=rejected");
            return false;
        }

        let canonical = self.viewer.encode();
        if let Err(err) = self.preferences.set(PROFILE_PREFERENCE_KEY, &canonical) {
            error!("event=profile_change module=session status=error error_code=preference_write_failed error={err}");
        }
        if let Some(all) = self.all.clone() {
            self.projection.recompute(&all, &self.viewer);
        }
        true
    }

    pub fn profile(&self) -> &Profile {
        &self.viewer
    }

    /// The full record set from the last applied snapshot.
    pub fn all_records(&self) -> Option<&[E]> {
        self.all.as_deref().map(Vec::as_slice)
    }

    pub fn projection(&self) -> &FilteredProjection<E> {
        &self.projection
    }

    pub fn projection_mut(&mut self) -> &mut FilteredProjection<E> {
        &mut self.projection
    }

    pub fn workflow(&self) -> &ActionWorkflow<E> {
        &self.workflow
    }

    pub fn workflow_mut(&mut self) -> &mut ActionWorkflow<E> {
        &mut self.workflow
    }

    pub fn preferences(&self) -> &P {
        &self.preferences
    }

    fn apply(&mut self, snapshot: RecordSnapshot<E>) {
        self.projection.recompute(&snapshot, &self.viewer);
        self.workflow.observe(Arc::clone(&snapshot));
        self.all = Some(snapshot);
    }
}
