//! Domain model for records and profile filtering.
//!
//! # Responsibility
//! - Define the persisted record variants and their shared contract.
//! - Define the profile flag vector and its compatibility rule.
//!
//! # Invariants
//! - Record identity is a store-assigned integer, zero until persisted.
//! - Every `Profile` value satisfies the per-partition validity rule.

pub mod profile;
pub mod record;
