//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into workflow-level APIs.
//! - Keep presentation callers decoupled from storage details.

pub mod import;
pub mod name_check;
pub mod projection;
pub mod session;
pub mod workflow;
