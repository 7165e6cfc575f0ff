//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define data access contracts for records and preferences.
//! - Isolate SQLite query details from store and workflow orchestration.
//!
//! # Invariants
//! - Record writes enforce `Record::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `DuplicateId`) in
//!   addition to DB transport errors.

pub mod preference_repo;
pub mod record_repo;
