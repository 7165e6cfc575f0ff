//! Record store with serialized background mutations.
//!
//! # Responsibility
//! - Own one SQLite connection per record variant on a dedicated worker.
//! - Apply insert/update/delete requests in submission order.
//! - Publish the full record set to subscribers after every mutation.
//!
//! # Invariants
//! - Only the worker thread touches the store connection.
//! - Snapshots are delivered in mutation order, each one complete.
//! - A mutation's snapshot is published before its receipt resolves.
//! - Failed mutations leave the set unchanged and publish nothing.

use crate::model::record::RecordId;
use crate::repo::record_repo::{RecordRepository, RepoError, SqlRecord, SqliteRecordRepository};
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Full record set as observed after one mutation.
pub type RecordSnapshot<E> = Arc<Vec<E>>;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level failures.
#[derive(Debug)]
pub enum StoreError {
    /// The repository rejected or failed the request.
    Repo(RepoError),
    /// The worker is gone and can no longer answer.
    Closed,
    /// The worker thread could not be started.
    Spawn(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Closed => write!(f, "record store worker is closed"),
            Self::Spawn(message) => write!(f, "failed to start record store worker: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Closed | Self::Spawn(_) => None,
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Pending outcome of one submitted mutation.
///
/// Dropping the receipt does not cancel the mutation.
#[derive(Debug)]
pub struct MutationReceipt {
    outcome: Receiver<StoreResult<RecordId>>,
}

impl MutationReceipt {
    fn closed() -> Self {
        let (reply, outcome) = mpsc::channel();
        let _ = reply.send(Err(StoreError::Closed));
        Self { outcome }
    }

    /// Blocks until the worker applied the mutation.
    ///
    /// Resolves to the id of the affected record.
    pub fn wait(self) -> StoreResult<RecordId> {
        self.outcome.recv().map_err(|_| StoreError::Closed)?
    }

    /// Returns the outcome if the worker already answered.
    pub fn try_outcome(&self) -> Option<StoreResult<RecordId>> {
        self.outcome.try_recv().ok()
    }
}

/// Observer handle receiving one snapshot per mutation.
///
/// The first snapshot is the set as it was when the subscription started.
pub struct Subscription<E> {
    updates: Receiver<RecordSnapshot<E>>,
}

impl<E> Subscription<E> {
    /// Drains queued snapshots and keeps the most recent one.
    pub fn try_latest(&self) -> Option<RecordSnapshot<E>> {
        self.updates.try_iter().last()
    }

    /// Drains queued snapshots in delivery order.
    pub fn drain(&self) -> Vec<RecordSnapshot<E>> {
        self.updates.try_iter().collect()
    }

    /// Waits up to `timeout` for the next snapshot.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<RecordSnapshot<E>> {
        match self.updates.recv_timeout(timeout) {
            Ok(snapshot) => Some(snapshot),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

enum StoreCommand<E> {
    Insert {
        record: E,
        reply: Sender<StoreResult<RecordId>>,
    },
    Update {
        record: E,
        reply: Sender<StoreResult<RecordId>>,
    },
    Delete {
        id: RecordId,
        reply: Sender<StoreResult<RecordId>>,
    },
    FindByName {
        name: String,
        reply: Sender<StoreResult<Vec<E>>>,
    },
    ListAll {
        reply: Sender<StoreResult<Vec<E>>>,
    },
    Subscribe {
        subscriber: Sender<RecordSnapshot<E>>,
    },
    Shutdown,
}

/// Authoritative record set for one variant.
///
/// Construct one per variant and share it (`Arc`) with the components that
/// need it.
pub struct RecordStore<E: SqlRecord> {
    commands: Sender<StoreCommand<E>>,
    worker: Option<JoinHandle<()>>,
}

impl<E: SqlRecord> RecordStore<E> {
    /// Moves `conn` onto a new worker thread.
    ///
    /// `conn` must already be migrated (see [`crate::db::open_db`]).
    pub fn spawn(conn: Connection) -> StoreResult<Self> {
        let (commands, receiver) = mpsc::channel();
        let worker = thread::Builder::new()
            .name(format!("captain-store-{}", E::TABLE))
            .spawn(move || store_worker_loop::<E>(&conn, &receiver))
            .map_err(|err| StoreError::Spawn(err.to_string()))?;

        info!(
            "event=store_start module=store status=ok table={}",
            E::TABLE
        );
        Ok(Self {
            commands,
            worker: Some(worker),
        })
    }

    /// Submits an insert. `id == 0` gets a fresh id; any other id is restored.
    pub fn insert(&self, record: E) -> MutationReceipt {
        self.submit(|reply| StoreCommand::Insert { record, reply })
    }

    /// Submits an update of an existing record.
    pub fn update(&self, record: E) -> MutationReceipt {
        self.submit(|reply| StoreCommand::Update { record, reply })
    }

    /// Submits a delete. Absent ids still resolve successfully.
    pub fn delete(&self, id: RecordId) -> MutationReceipt {
        self.submit(|reply| StoreCommand::Delete { id, reply })
    }

    /// All records named exactly `name`, behind any queued mutation.
    pub fn find_by_name(&self, name: &str) -> StoreResult<Vec<E>> {
        self.request(|reply| StoreCommand::FindByName {
            name: name.to_string(),
            reply,
        })
    }

    /// The current record set, behind any queued mutation.
    pub fn list_all(&self) -> StoreResult<Vec<E>> {
        self.request(|reply| StoreCommand::ListAll { reply })
    }

    /// Registers a new observer.
    pub fn subscribe(&self) -> StoreResult<Subscription<E>> {
        let (subscriber, updates) = mpsc::channel();
        self.commands
            .send(StoreCommand::Subscribe { subscriber })
            .map_err(|_| StoreError::Closed)?;
        Ok(Subscription { updates })
    }

    fn submit(
        &self,
        command: impl FnOnce(Sender<StoreResult<RecordId>>) -> StoreCommand<E>,
    ) -> MutationReceipt {
        let (reply, outcome) = mpsc::channel();
        if self.commands.send(command(reply)).is_err() {
            warn!(
                "event=store_submit module=store status=error table={} error_code=store_closed",
                E::TABLE
            );
            return MutationReceipt::closed();
        }
        MutationReceipt { outcome }
    }

    fn request<T>(
        &self,
        command: impl FnOnce(Sender<StoreResult<T>>) -> StoreCommand<E>,
    ) -> StoreResult<T> {
        let (reply, outcome) = mpsc::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| StoreError::Closed)?;
        outcome.recv().map_err(|_| StoreError::Closed)?
    }
}

impl<E: SqlRecord> Drop for RecordStore<E> {
    fn drop(&mut self) {
        let _ = self.commands.send(StoreCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!(
                    "event=store_stop module=store status=error table={} error_code=worker_panicked",
                    E::TABLE
                );
            }
        }
    }
}

fn store_worker_loop<E: SqlRecord>(conn: &Connection, commands: &Receiver<StoreCommand<E>>) {
    let repo = SqliteRecordRepository::<E>::new(conn);
    let mut subscribers: Vec<Sender<RecordSnapshot<E>>> = Vec::new();

    while let Ok(command) = commands.recv() {
        match command {
            StoreCommand::Insert { record, reply } => {
                let outcome = repo.insert_record(&record).map_err(StoreError::from);
                finish_mutation(&repo, &mut subscribers, "insert", outcome, &reply);
            }
            StoreCommand::Update { record, reply } => {
                let outcome = repo
                    .update_record(&record)
                    .map(|()| record.id())
                    .map_err(StoreError::from);
                finish_mutation(&repo, &mut subscribers, "update", outcome, &reply);
            }
            StoreCommand::Delete { id, reply } => {
                let outcome = repo
                    .delete_record(id)
                    .map(|removed| {
                        if !removed {
                            debug!(
                                "event=record_delete module=store status=noop table={} id={id}",
                                E::TABLE
                            );
                        }
                        id
                    })
                    .map_err(StoreError::from);
                finish_mutation(&repo, &mut subscribers, "delete", outcome, &reply);
            }
            StoreCommand::FindByName { name, reply } => {
                let _ = reply.send(repo.find_by_name(&name).map_err(StoreError::from));
            }
            StoreCommand::ListAll { reply } => {
                let _ = reply.send(repo.list_records().map_err(StoreError::from));
            }
            StoreCommand::Subscribe { subscriber } => match repo.list_records() {
                Ok(records) => {
                    if subscriber.send(Arc::new(records)).is_ok() {
                        subscribers.push(subscriber);
                    }
                }
                Err(err) => error!(
                    "event=store_subscribe module=store status=error table={} error={err}",
                    E::TABLE
                ),
            },
            StoreCommand::Shutdown => break,
        }
    }

    info!("event=store_stop module=store status=ok table={}", E::TABLE);
}

fn finish_mutation<E: SqlRecord>(
    repo: &SqliteRecordRepository<'_, E>,
    subscribers: &mut Vec<Sender<RecordSnapshot<E>>>,
    operation: &'static str,
    outcome: StoreResult<RecordId>,
    reply: &Sender<StoreResult<RecordId>>,
) {
    match &outcome {
        Ok(id) => {
            debug!(
                "event=record_{operation} module=store status=ok table={} id={id}",
                E::TABLE
            );
            publish(repo, subscribers);
        }
        Err(err) => warn!(
            "event=record_{operation} module=store status=error table={} error={err}",
            E::TABLE
        ),
    }
    let _ = reply.send(outcome);
}

fn publish<E: SqlRecord>(
    repo: &SqliteRecordRepository<'_, E>,
    subscribers: &mut Vec<Sender<RecordSnapshot<E>>>,
) {
    let records = match repo.list_records() {
        Ok(records) => records,
        Err(err) => {
            error!(
                "event=store_publish module=store status=error table={} error={err}",
                E::TABLE
            );
            return;
        }
    };

    let snapshot = Arc::new(records);
    subscribers.retain(|subscriber| subscriber.send(Arc::clone(&snapshot)).is_ok());
    debug!(
        "event=store_publish module=store status=ok table={} records={} subscribers={}",
        E::TABLE,
        snapshot.len(),
        subscribers.len()
    );
}
