//! Bulk import of line-oriented record feeds.
//!
//! # Responsibility
//! - Decode ISO-8859-1 feed lines into records.
//! - Translate the feed's profile markers into the canonical encoding.
//! - Route every record through the workflow's business gate and commit.
//!
//! # Invariants
//! - Lines of `PROFILE_LEN` characters or fewer are skipped.
//! - The feed code is translated explicitly; it never reaches storage raw.
//! - A name already used earlier in the same feed is rejected.
//! - The workflow is left idle after an import.

use crate::model::profile::{CLEAR_MARKER, PROFILE_LEN, SET_MARKER};
use crate::model::record::{Record, Stueck};
use crate::repo::record_repo::SqlRecord;
use crate::service::workflow::{ActionMode, ActionWorkflow, BusinessCheck};
use log::{info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::BufRead;

/// Feed marker for a set flag.
pub const FEED_SET_MARKER: char = 'X';

/// Feed marker for a clear flag. Any character other than
/// [`FEED_SET_MARKER`] reads as clear.
pub const FEED_CLEAR_MARKER: char = 'Y';

/// Records that can be built from one feed line.
pub trait FeedRecord: Record {
    fn from_feed(name: String, profile_code: String) -> Self;
}

impl FeedRecord for Stueck {
    fn from_feed(name: String, profile_code: String) -> Self {
        Stueck::new(name, profile_code)
    }
}

/// One parsed feed line, already in canonical encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedLine {
    pub profile_code: String,
    pub name: String,
}

/// Counters reported by [`import_feed`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Records the store confirmed.
    pub inserted: usize,
    /// Lines too short to carry a record.
    pub skipped: usize,
    /// Records refused by the business gate or by the store.
    pub rejected: usize,
}

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read import feed: {err}"),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Decodes ISO-8859-1 bytes; every byte maps to the same code point.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| char::from(*byte)).collect()
}

/// Translates a feed profile code into the canonical encoding.
///
/// The result only contains `SET_MARKER` and `CLEAR_MARKER`.
pub fn to_canonical_code(feed_code: &str) -> String {
    feed_code
        .chars()
        .map(|ch| {
            if ch == FEED_SET_MARKER {
                SET_MARKER
            } else {
                CLEAR_MARKER
            }
        })
        .collect()
}

/// Splits one decoded line into profile code and name.
pub fn parse_feed_line(line: &str) -> Option<FeedLine> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.chars().count() <= PROFILE_LEN {
        return None;
    }
    let split_at = line
        .char_indices()
        .nth(PROFILE_LEN)
        .map_or(line.len(), |(offset, _)| offset);
    let (feed_code, name) = line.split_at(split_at);

    Some(FeedLine {
        profile_code: to_canonical_code(feed_code),
        name: name.to_string(),
    })
}

/// Imports every record line of `reader` through `workflow`.
///
/// Any pending action on `workflow` is replaced.
pub fn import_feed<E, R>(workflow: &mut ActionWorkflow<E>, reader: R) -> Result<ImportReport, ImportError>
where
    E: SqlRecord + FeedRecord,
    R: BufRead,
{
    let mut report = ImportReport::default();
    let mut seen_names = HashSet::new();
    let mut receipts = Vec::new();

    for raw_line in reader.split(b'\n') {
        let Some(line) = parse_feed_line(&decode_latin1(&raw_line?)) else {
            report.skipped += 1;
            continue;
        };

        let record = E::from_feed(line.name, line.profile_code);
        let check = workflow.check_business_logic(Some(&record), ActionMode::Insert);
        if check != BusinessCheck::Ok || !seen_names.insert(record.name().to_string()) {
            warn!(
                "event=feed_import_line module=import status=rejected table={} check={check:?}",
                E::TABLE
            );
            report.rejected += 1;
            continue;
        }

        workflow.begin(ActionMode::Insert, Some(record));
        match workflow.commit() {
            Ok(receipt) => receipts.push(receipt),
            Err(err) => {
                warn!(
                    "event=feed_import_line module=import status=error table={} error={err}",
                    E::TABLE
                );
                report.rejected += 1;
            }
        }
    }
    workflow.reset();

    for receipt in receipts {
        match receipt.wait() {
            Ok(_) => report.inserted += 1,
            Err(err) => {
                warn!(
                    "event=feed_import_line module=import status=error table={} error={err}",
                    E::TABLE
                );
                report.rejected += 1;
            }
        }
    }

    info!(
        "event=feed_import module=import status=ok table={} inserted={} skipped={} rejected={}",
        E::TABLE,
        report.inserted,
        report.skipped,
        report.rejected
    );
    Ok(report)
}
