//! Core domain logic for Captain record keeping.
//! This crate is the single source of truth for profile matching, record
//! storage and the action/undo workflow.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::profile::{DecodedProfile, Partition, Profile, PROFILE_LEN};
pub use model::record::{
    Item, Profiled, ProtectMode, Record, RecordId, RecordValidationError, Stuck, Stueck,
};
pub use repo::preference_repo::{PreferenceStore, SqlitePreferenceStore};
pub use repo::record_repo::{
    RecordRepository, RepoError, RepoResult, SqlRecord, SqliteRecordRepository,
};
pub use service::import::{import_feed, FeedRecord, ImportError, ImportReport};
pub use service::projection::FilteredProjection;
pub use service::session::{ProfiledSession, PROFILE_PREFERENCE_KEY};
pub use service::workflow::{
    ActionMode, ActionWorkflow, BusinessCheck, DayClock, FixedClock, PendingAction, SystemClock,
    WorkflowError, WorkflowState,
};
pub use store::{MutationReceipt, RecordSnapshot, RecordStore, StoreError, StoreResult, Subscription};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
