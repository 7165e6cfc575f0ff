//! Profile-filtered projection of the record set.
//!
//! # Responsibility
//! - Derive the records compatible with the viewer profile.
//! - Maintain the pending-names pool drained by random picks.
//!
//! # Invariants
//! - `recompute` replaces the projection wholesale; it is never patched.
//! - After `recompute` or `reset_pending_names`, the pool holds exactly the
//!   projection's names in projection order.
//! - The pool only shrinks between resets.

use crate::model::profile::Profile;
use crate::model::record::Profiled;
use log::{debug, error};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Records matching the viewer profile plus a consumable name pool.
pub struct FilteredProjection<E> {
    records: Vec<E>,
    pending_names: Vec<String>,
    rng: StdRng,
}

impl<E: Profiled> Default for FilteredProjection<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Profiled> FilteredProjection<E> {
    /// Empty projection with an entropy-seeded picker.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Empty projection with a deterministic picker.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            records: Vec::new(),
            pending_names: Vec::new(),
            rng,
        }
    }

    /// Rebuilds the projection from `all` and resets the pool.
    pub fn recompute(&mut self, all: &[E], viewer: &Profile) {
        self.records = all
            .iter()
            .filter(|record| viewer.matches(&record.profile()))
            .cloned()
            .collect();
        self.reset_pending_names();
        debug!(
            "event=projection_recompute module=projection status=ok total={} matching={}",
            all.len(),
            self.records.len()
        );
    }

    /// Removes and returns a uniformly random pending name.
    ///
    /// Returns `None` once the pool is drained.
    pub fn consume_random_pending_name(&mut self) -> Option<String> {
        if self.pending_names.is_empty() {
            debug!("event=pending_name_consume module=projection status=empty");
            return None;
        }
        let position = self.rng.gen_range(0..self.pending_names.len());
        Some(self.pending_names.remove(position))
    }

    /// Removes and returns the pending name at `position`.
    pub fn pop_pending_name(&mut self, position: usize) -> Option<String> {
        if position >= self.pending_names.len() {
            error!(
                "event=pending_name_pop module=projection status=error error_code=out_of_range position={position} pending={}",
                self.pending_names.len()
            );
            return None;
        }
        Some(self.pending_names.remove(position))
    }

    /// Refills the pool from the current projection.
    pub fn reset_pending_names(&mut self) {
        self.pending_names = self
            .records
            .iter()
            .map(|record| record.name().to_string())
            .collect();
    }

    pub fn records(&self) -> &[E] {
        &self.records
    }

    pub fn pending_names(&self) -> &[String] {
        &self.pending_names
    }

    pub fn pending_len(&self) -> usize {
        self.pending_names.len()
    }
}
