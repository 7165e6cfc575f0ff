//! Action workflow: pending operation, business gate, commit and undo.
//!
//! # Responsibility
//! - Track which operation is pending and on which record.
//! - Evaluate business rules before a caller commits.
//! - Apply the pending operation to the record store and restore deletes.
//!
//! # Invariants
//! - The action tag and the target record live in one `PendingAction` value
//!   that every transition replaces as a whole.
//! - Insert and update stamp today's day on the target; delete does not.
//! - Undo re-inserts the deleted record unchanged: same id, same day.
//! - Only persisted records (non-zero id) can be deleted and restored.
//! - `check_business_logic` never mutates state.

use crate::model::profile::Profile;
use crate::model::record::{RecordId, UPDATE_DAY_FORMAT};
use crate::repo::record_repo::SqlRecord;
use crate::service::name_check::{name_collides_on_insert, name_collides_on_update};
use crate::store::{MutationReceipt, RecordSnapshot, RecordStore};
use chrono::{Local, NaiveDate};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Operation kind carried by a pending action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionMode {
    Insert,
    Update,
    Delete,
}

impl ActionMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Observable workflow state, derived from the pending action tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    PendingInsert,
    PendingUpdate,
    PendingDelete,
}

/// Result of the pre-commit business gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusinessCheck {
    Ok,
    NoRecord,
    NoName,
    NameExists,
    InvalidProfile,
}

/// Pending operation and its target, replaced as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction<E> {
    pub mode: Option<ActionMode>,
    pub target: Option<E>,
}

impl<E> Default for PendingAction<E> {
    fn default() -> Self {
        Self {
            mode: None,
            target: None,
        }
    }
}

/// Errors returned when a commit or undo cannot be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    NoPendingAction,
    NoTarget,
    /// Normal inserts leave id assignment to the store.
    NonZeroId(RecordId),
    /// Delete targets must come from the store.
    NotPersisted,
    NothingToUndo,
}

impl Display for WorkflowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoPendingAction => write!(f, "no pending action selected"),
            Self::NoTarget => write!(f, "no target record selected"),
            Self::NonZeroId(id) => write!(f, "insert target already has id {id}"),
            Self::NotPersisted => write!(f, "delete target was never persisted"),
            Self::NothingToUndo => write!(f, "no deleted record to restore"),
        }
    }
}

impl Error for WorkflowError {}

/// Source of the calendar day stamped on inserts and updates.
pub trait DayClock: Send {
    fn today(&self) -> NaiveDate;
}

/// Local system calendar.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl DayClock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Always reports the same day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl DayClock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Formats a day as stored in `update_day` (`dd-MM-yyyy`).
pub fn format_update_day(day: NaiveDate) -> String {
    day.format(UPDATE_DAY_FORMAT).to_string()
}

/// Single-owner state machine over one record store.
pub struct ActionWorkflow<E: SqlRecord> {
    store: Arc<RecordStore<E>>,
    clock: Box<dyn DayClock>,
    pending: PendingAction<E>,
    observed: Option<RecordSnapshot<E>>,
    last_deleted: Option<E>,
}

impl<E: SqlRecord> ActionWorkflow<E> {
    pub fn new(store: Arc<RecordStore<E>>) -> Self {
        Self::with_clock(store, SystemClock)
    }

    pub fn with_clock(store: Arc<RecordStore<E>>, clock: impl DayClock + 'static) -> Self {
        Self {
            store,
            clock: Box::new(clock),
            pending: PendingAction::default(),
            observed: None,
            last_deleted: None,
        }
    }

    /// Sets action and target in one step.
    pub fn begin(&mut self, mode: ActionMode, target: Option<E>) {
        self.pending = PendingAction {
            mode: Some(mode),
            target,
        };
    }

    /// Sets the action tag, keeping the current target.
    pub fn select_action(&mut self, mode: ActionMode) {
        let target = self.pending.target.take();
        self.pending = PendingAction {
            mode: Some(mode),
            target,
        };
    }

    /// Sets the target, keeping the current action tag.
    pub fn select_target(&mut self, target: Option<E>) {
        self.pending = PendingAction {
            mode: self.pending.mode,
            target,
        };
    }

    /// Clears action and target.
    pub fn reset(&mut self) {
        self.pending = PendingAction::default();
    }

    pub fn state(&self) -> WorkflowState {
        match self.pending.mode {
            None => WorkflowState::Idle,
            Some(ActionMode::Insert) => WorkflowState::PendingInsert,
            Some(ActionMode::Update) => WorkflowState::PendingUpdate,
            Some(ActionMode::Delete) => WorkflowState::PendingDelete,
        }
    }

    pub fn pending_action(&self) -> &PendingAction<E> {
        &self.pending
    }

    pub fn target(&self) -> Option<&E> {
        self.pending.target.as_ref()
    }

    /// Record removed by the last delete commit, if not restored yet.
    pub fn last_deleted(&self) -> Option<&E> {
        self.last_deleted.as_ref()
    }

    pub fn store(&self) -> &Arc<RecordStore<E>> {
        &self.store
    }

    /// Copies user-editable fields of `input` onto the target.
    ///
    /// Returns `false` (and logs) when no target is selected.
    pub fn fill_user_fields(&mut self, input: &E) -> bool {
        match self.pending.target.as_mut() {
            Some(target) => {
                target.fill_user_fields(input);
                true
            }
            None => {
                error!(
                    "event=workflow_fill module=workflow status=error error_code=no_target table={}",
                    E::TABLE
                );
                false
            }
        }
    }

    /// Replaces the record set used by the uniqueness check.
    pub fn observe(&mut self, snapshot: RecordSnapshot<E>) {
        self.observed = Some(snapshot);
    }

    pub fn observed(&self) -> Option<&[E]> {
        self.observed.as_deref().map(Vec::as_slice)
    }

    /// Evaluates business rules for `candidate` under `mode`.
    ///
    /// For updates, call before `fill_user_fields`: the target's name at that
    /// point is the current name the candidate is compared against.
    pub fn check_business_logic(&self, candidate: Option<&E>, mode: ActionMode) -> BusinessCheck {
        let Some(candidate) = candidate else {
            return BusinessCheck::NoRecord;
        };
        let observed = self.observed();

        match mode {
            ActionMode::Insert => {
                if candidate.name().is_empty() {
                    return BusinessCheck::NoName;
                }
                if name_collides_on_insert(observed, candidate.name()) {
                    return BusinessCheck::NameExists;
                }
            }
            ActionMode::Update => {
                let collides = match self.target() {
                    Some(target) => {
                        name_collides_on_update(observed, target.name(), candidate.name())
                    }
                    None => name_collides_on_insert(observed, candidate.name()),
                };
                if collides {
                    return BusinessCheck::NameExists;
                }
            }
            ActionMode::Delete => {}
        }

        if candidate
            .profile_code()
            .is_some_and(|code| !Profile::validate(code))
        {
            return BusinessCheck::InvalidProfile;
        }

        BusinessCheck::Ok
    }

    /// Submits the pending action to the store.
    pub fn commit(&mut self) -> Result<MutationReceipt, WorkflowError> {
        let mode = self.pending.mode.ok_or(WorkflowError::NoPendingAction)?;
        let today = format_update_day(self.clock.today());
        let target = self
            .pending
            .target
            .as_mut()
            .ok_or(WorkflowError::NoTarget)?;

        let receipt = match mode {
            ActionMode::Insert => {
                if target.id() != 0 {
                    return Err(WorkflowError::NonZeroId(target.id()));
                }
                target.set_update_day(today);
                self.store.insert(target.clone())
            }
            ActionMode::Update => {
                target.set_update_day(today);
                self.store.update(target.clone())
            }
            ActionMode::Delete => {
                if target.id() == 0 {
                    return Err(WorkflowError::NotPersisted);
                }
                let receipt = self.store.delete(target.id());
                self.last_deleted = Some(target.clone());
                receipt
            }
        };

        info!(
            "event=workflow_commit module=workflow status=submitted action={} table={} id={}",
            mode.as_str(),
            E::TABLE,
            target.id()
        );
        Ok(receipt)
    }

    /// Restores the last deleted record with its original id and day.
    pub fn undo_delete(&mut self) -> Result<MutationReceipt, WorkflowError> {
        let record = self
            .last_deleted
            .take()
            .ok_or(WorkflowError::NothingToUndo)?;
        info!(
            "event=workflow_undo module=workflow status=submitted table={} id={}",
            E::TABLE,
            record.id()
        );
        Ok(self.store.insert(record))
    }
}
