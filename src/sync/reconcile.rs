//! Playlist reconciliation
//!
//! Pure classification of a provider resolution against the content store.
//! Read-only: never mutates the ledger, never enqueues fetches.

use std::collections::{BTreeSet, HashSet};

use crate::remote::Resolution;

/// The five counts reported for a playlist.
///
/// `present + missing + lost_recoverable + lost_unrecoverable == total` for
/// any input. `missing` is defined over the found set only; an id the
/// provider reports as both found and failed counts as found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    pub total: usize,
    pub present: usize,
    pub missing: usize,
    /// Upstream removed it but we already hold a copy
    pub lost_recoverable: usize,
    /// Upstream gone and never captured locally
    pub lost_unrecoverable: usize,
}

/// Deduplicated found ids, preserving playlist order
fn found_ids(resolution: &Resolution) -> Vec<&str> {
    let mut seen = HashSet::new();
    resolution
        .found_ids()
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Failed ids with found taking precedence on overlap, deduplicated
fn failed_ids<'a>(resolution: &'a Resolution, found: &[&str]) -> Vec<&'a str> {
    let found: HashSet<&str> = found.iter().copied().collect();
    let mut seen = HashSet::new();
    resolution
        .failed
        .iter()
        .map(String::as_str)
        .filter(|id| !found.contains(id))
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Classify a playlist resolution against the set of stored ids
pub fn classify(resolution: &Resolution, present_ids: &BTreeSet<String>) -> Classification {
    let found = found_ids(resolution);
    let failed = failed_ids(resolution, &found);

    let present = found
        .iter()
        .filter(|id| present_ids.contains(**id))
        .count();
    let lost_recoverable = failed
        .iter()
        .filter(|id| present_ids.contains(**id))
        .count();

    Classification {
        total: found.len() + failed.len(),
        present,
        missing: found.len() - present,
        lost_recoverable,
        lost_unrecoverable: failed.len() - lost_recoverable,
    }
}

/// Ids that need fetching: found minus present, order-preserving, no
/// duplicates
pub fn worklist(resolution: &Resolution, present_ids: &BTreeSet<String>) -> Vec<String> {
    found_ids(resolution)
        .into_iter()
        .filter(|id| !present_ids.contains(*id))
        .map(String::from)
        .collect()
}
