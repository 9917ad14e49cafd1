//! Snapshot Differ
//!
//! Compares two snapshots of the same tree taken at different times and
//! produces two tables keyed by identifier: paths whose occurrence count
//! decreased (removed) and paths whose count increased (added). Content
//! present with equal path multisets in both snapshots produces no entry.

use crate::identity::Identifier;
use crate::snapshot::Snapshot;
use std::collections::HashMap;

/// Per-identifier excess paths between a baseline and a current snapshot.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DiffTables {
    /// Paths present in the baseline but unmatched in the current snapshot.
    pub removed: HashMap<Identifier, Vec<String>>,
    /// Paths present in the current snapshot but unmatched in the baseline.
    pub added: HashMap<Identifier, Vec<String>>,
}

impl DiffTables {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// Compute the removed/added tables between two snapshots.
///
/// Differences are multiset differences: each path in one group cancels at
/// most one equal path in the other. Which duplicate cancels which is
/// arbitrary, since all paths in a group hold identical content.
pub fn diff(baseline: &Snapshot, current: &Snapshot) -> DiffTables {
    let mut tables = DiffTables::default();

    for (id, baseline_paths) in baseline.groups() {
        match current.groups().get(id) {
            Some(current_paths) => {
                let excess = multiset_difference(baseline_paths, current_paths);
                if !excess.is_empty() {
                    tables.removed.insert(id.clone(), excess);
                }
            }
            None => {
                tables.removed.insert(id.clone(), baseline_paths.clone());
            }
        }
    }

    for (id, current_paths) in current.groups() {
        match baseline.groups().get(id) {
            Some(baseline_paths) => {
                let excess = multiset_difference(current_paths, baseline_paths);
                if !excess.is_empty() {
                    tables.added.insert(id.clone(), excess);
                }
            }
            None => {
                tables.added.insert(id.clone(), current_paths.clone());
            }
        }
    }

    tables
}

/// `keep − drop` as multisets: remove one occurrence from `keep` for each
/// matching path in `drop`, preserving the relative order of what remains.
fn multiset_difference(keep: &[String], drop: &[String]) -> Vec<String> {
    let mut remainder: Vec<String> = keep.to_vec();
    for path in drop {
        if let Some(pos) = remainder.iter().position(|p| p == path) {
            remainder.remove(pos);
        }
    }
    remainder
}
