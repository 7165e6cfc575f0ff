//! Profile compatibility model.
//!
//! # Responsibility
//! - Define the fixed-shape, partitioned flag vector used to tag records and
//!   to express the viewer filter.
//! - Provide the canonical text codec and the pairwise compatibility rule.
//!
//! # Invariants
//! - A profile always holds exactly `PROFILE_LEN` flags.
//! - Every `Profile` value is valid: each partition has at least one set flag.
//! - Decoding never fails; malformed input falls back to the all-true default.
//! - The canonical code uses `SET_MARKER` / `CLEAR_MARKER` only.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::ops::Range;

/// Total number of flags in a profile.
pub const PROFILE_LEN: usize = 13;

/// Canonical marker for a set flag.
pub const SET_MARKER: char = 'X';

/// Canonical marker for a clear flag.
pub const CLEAR_MARKER: char = ' ';

const NATURE_FLAGS: Range<usize> = 0..3;
const STYLE_FLAGS: Range<usize> = 3..6;
const CRITERIA_FLAGS: Range<usize> = 6..PROFILE_LEN;

/// One of the three contiguous flag groups of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// Semantic domain of the record.
    Nature,
    /// Language style of the record.
    Style,
    /// Audience criteria.
    Criteria,
}

impl Partition {
    /// All partitions in storage order.
    pub const ALL: [Partition; 3] = [Self::Nature, Self::Style, Self::Criteria];

    /// Flag offsets covered by this partition.
    pub fn range(self) -> Range<usize> {
        match self {
            Self::Nature => NATURE_FLAGS,
            Self::Style => STYLE_FLAGS,
            Self::Criteria => CRITERIA_FLAGS,
        }
    }
}

/// Partitioned flag vector shared by records and the viewer filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct Profile {
    flags: [bool; PROFILE_LEN],
}

/// Outcome of [`Profile::decode`].
///
/// `used_default` is `true` when the input was missing or malformed and the
/// all-true default was substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedProfile {
    pub profile: Profile,
    pub used_default: bool,
}

impl Default for Profile {
    /// All usages allowed.
    fn default() -> Self {
        Self {
            flags: [true; PROFILE_LEN],
        }
    }
}

impl Profile {
    /// Builds a profile from raw flags, or `None` when a partition is empty.
    pub fn from_flags(flags: [bool; PROFILE_LEN]) -> Option<Self> {
        if flags_are_valid(&flags) {
            Some(Self { flags })
        } else {
            None
        }
    }

    /// Checks whether `encoded` is a valid canonical profile code.
    ///
    /// Codes that are not exactly `PROFILE_LEN` characters long are rejected.
    pub fn validate(encoded: &str) -> bool {
        parse_flags(encoded).is_some_and(|flags| flags_are_valid(&flags))
    }

    /// Decodes a canonical code, degrading to the default profile.
    pub fn decode(encoded: Option<&str>) -> DecodedProfile {
        match encoded.and_then(parse_flags) {
            Some(flags) if flags_are_valid(&flags) => DecodedProfile {
                profile: Self { flags },
                used_default: false,
            },
            _ => DecodedProfile {
                profile: Self::default(),
                used_default: true,
            },
        }
    }

    /// Returns the canonical `PROFILE_LEN`-character code.
    pub fn encode(&self) -> String {
        self.flags
            .iter()
            .map(|flag| if *flag { SET_MARKER } else { CLEAR_MARKER })
            .collect()
    }

    /// Replaces every flag from a canonical code.
    ///
    /// Returns `false` and leaves the profile untouched when `encoded` is not
    /// a valid code.
    pub fn feed_from_str(&mut self, encoded: &str) -> bool {
        match parse_flags(encoded) {
            Some(flags) if flags_are_valid(&flags) => {
                self.flags = flags;
                true
            }
            _ => false,
        }
    }

    /// Raw flag read. Out-of-range indexes read as clear.
    pub fn is_enabled(&self, index: usize) -> bool {
        self.flags.get(index).copied().unwrap_or(false)
    }

    /// Returns the flags of one partition.
    pub fn partition(&self, partition: Partition) -> &[bool] {
        &self.flags[partition.range()]
    }

    /// Two profiles match when they share a set flag in every partition.
    pub fn matches(&self, other: &Profile) -> bool {
        Partition::ALL.iter().all(|partition| {
            partition
                .range()
                .any(|index| self.flags[index] && other.flags[index])
        })
    }
}

impl Display for Profile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

impl From<Profile> for String {
    fn from(value: Profile) -> Self {
        value.encode()
    }
}

impl From<String> for Profile {
    fn from(value: String) -> Self {
        Profile::decode(Some(value.as_str())).profile
    }
}

fn parse_flags(encoded: &str) -> Option<[bool; PROFILE_LEN]> {
    let mut flags = [false; PROFILE_LEN];
    let mut count = 0;
    for ch in encoded.chars() {
        if count == PROFILE_LEN {
            return None;
        }
        flags[count] = ch == SET_MARKER;
        count += 1;
    }
    (count == PROFILE_LEN).then_some(flags)
}

fn flags_are_valid(flags: &[bool; PROFILE_LEN]) -> bool {
    Partition::ALL
        .iter()
        .all(|partition| flags[partition.range()].iter().any(|flag| *flag))
}
