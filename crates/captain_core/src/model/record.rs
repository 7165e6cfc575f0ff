//! Record domain models.
//!
//! # Responsibility
//! - Define the three persisted record variants (`Item`, `Stuck`, `Stueck`).
//! - Expose the shared `Record` contract used by store, workflow and checks.
//!
//! # Invariants
//! - `id == 0` means "not persisted yet"; the store assigns ids on insert.
//! - `update_day` is stamped by the workflow, never by user input.
//! - `fill_user_fields` never touches `id` or `update_day`.

use crate::model::profile::Profile;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-owned integer identity. Zero before first persistence.
pub type RecordId = i64;

/// Calendar day format used by `update_day` (`dd-MM-yyyy`).
pub const UPDATE_DAY_FORMAT: &str = "%d-%m-%Y";

/// Validation failures for record payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValidationError {
    EmptyName,
}

impl Display for RecordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "record name cannot be empty"),
        }
    }
}

impl Error for RecordValidationError {}

/// Contract shared by every record variant.
pub trait Record: Clone + Send + Sync + 'static {
    fn id(&self) -> RecordId;
    fn set_id(&mut self, id: RecordId);
    fn name(&self) -> &str;
    fn update_day(&self) -> &str;
    fn set_update_day(&mut self, day: String);

    /// Copies the user-editable fields of `input` onto `self`.
    fn fill_user_fields(&mut self, input: &Self);

    /// Canonical profile code for the profile-bearing variant.
    ///
    /// Variants returning `Some` get their code checked by the business gate.
    fn profile_code(&self) -> Option<&str> {
        None
    }

    /// Checks payload invariants enforced before persistence.
    fn validate(&self) -> Result<(), RecordValidationError> {
        if self.name().is_empty() {
            return Err(RecordValidationError::EmptyName);
        }
        Ok(())
    }
}

/// Records that can be filtered by the viewer profile.
pub trait Profiled: Record {
    fn profile(&self) -> Profile;
}

/// Fingerprint protection mode of an [`Item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectMode {
    FingerprintProtected,
    NotFingerprintProtected,
}

impl ProtectMode {
    /// Stable integer code persisted in `items.protect_mode`.
    pub fn code(self) -> i64 {
        match self {
            Self::FingerprintProtected => 201,
            Self::NotFingerprintProtected => 202,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            201 => Some(Self::FingerprintProtected),
            202 => Some(Self::NotFingerprintProtected),
            _ => None,
        }
    }
}

/// A named value (key, code, password) with free comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: RecordId,
    pub name: String,
    /// The secret or code the item stands for.
    pub value: String,
    pub category: String,
    /// Additional description such as a username or client id.
    pub comments: String,
    pub update_day: String,
    pub protect_mode: ProtectMode,
}

impl Item {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        category: impl Into<String>,
        comments: impl Into<String>,
        protect_mode: ProtectMode,
    ) -> Self {
        Self {
            id: 0,
            name: name.into(),
            value: value.into(),
            category: category.into(),
            comments: comments.into(),
            update_day: String::new(),
            protect_mode,
        }
    }
}

impl Record for Item {
    fn id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn update_day(&self) -> &str {
        &self.update_day
    }

    fn set_update_day(&mut self, day: String) {
        self.update_day = day;
    }

    fn fill_user_fields(&mut self, input: &Self) {
        self.name = input.name.clone();
        self.value = input.value.clone();
        self.category = input.category.clone();
        self.comments = input.comments.clone();
        self.protect_mode = input.protect_mode;
    }
}

/// A named record with an unvalidated boolean-fields string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stuck {
    pub id: RecordId,
    pub name: String,
    pub update_day: String,
    pub bool_fields: String,
}

impl Stuck {
    pub fn new(name: impl Into<String>, bool_fields: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            update_day: String::new(),
            bool_fields: bool_fields.into(),
        }
    }
}

impl Record for Stuck {
    fn id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn update_day(&self) -> &str {
        &self.update_day
    }

    fn set_update_day(&mut self, day: String) {
        self.update_day = day;
    }

    fn fill_user_fields(&mut self, input: &Self) {
        self.name = input.name.clone();
        self.bool_fields = input.bool_fields.clone();
    }
}

/// A named record tagged with a canonical profile code.
///
/// The code is kept as text so an invalid code typed by a user can still be
/// reported by the business gate instead of being silently replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stueck {
    pub id: RecordId,
    pub name: String,
    pub update_day: String,
    pub bool_fields: String,
}

impl Stueck {
    pub fn new(name: impl Into<String>, bool_fields: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            update_day: String::new(),
            bool_fields: bool_fields.into(),
        }
    }

    pub fn with_profile(name: impl Into<String>, profile: &Profile) -> Self {
        Self::new(name, profile.encode())
    }
}

impl Record for Stueck {
    fn id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn update_day(&self) -> &str {
        &self.update_day
    }

    fn set_update_day(&mut self, day: String) {
        self.update_day = day;
    }

    fn fill_user_fields(&mut self, input: &Self) {
        self.name = input.name.clone();
        self.bool_fields = input.bool_fields.clone();
    }

    fn profile_code(&self) -> Option<&str> {
        Some(&self.bool_fields)
    }
}

impl Profiled for Stueck {
    /// Decoded profile; a malformed stored code reads as the default.
    fn profile(&self) -> Profile {
        Profile::decode(Some(self.bool_fields.as_str())).profile
    }
}
