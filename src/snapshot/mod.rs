//! Directory Snapshots
//!
//! A snapshot groups every regular file under a root by its content
//! identifier at one point in time. Snapshots are immutable once built;
//! logical equality is order-independent per group but count-sensitive
//! (multiset equality), since duplicate-content files may be discovered in
//! different orders across otherwise-equal builds.

pub mod builder;
pub mod store;

use crate::error::SnapshotError;
use crate::identity::{Identifier, Strategy};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The state of one directory tree: relative paths grouped by identifier.
#[derive(Debug, Clone)]
pub struct Snapshot {
    root: PathBuf,
    strategy: Strategy,
    groups: HashMap<Identifier, Vec<String>>,
}

impl Snapshot {
    pub fn new(root: PathBuf, strategy: Strategy) -> Self {
        Snapshot {
            root,
            strategy,
            groups: HashMap::new(),
        }
    }

    /// The tree root this snapshot was built from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The identity strategy the snapshot was built with.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn groups(&self) -> &HashMap<Identifier, Vec<String>> {
        &self.groups
    }

    /// Number of distinct identifiers.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Append a relative path to the group for `id`, creating the group if
    /// absent. Discovery order within a group is preserved.
    pub fn insert(&mut self, id: Identifier, relative_path: String) {
        self.groups.entry(id).or_default().push(relative_path);
    }

    /// All (size, modified) pairs carried by hybrid identifiers in this
    /// snapshot. Used by the builder's deferred digest resolution.
    pub(crate) fn hybrid_partial_keys(&self) -> Vec<(u64, u64)> {
        self.groups.keys().filter_map(|id| id.partial_key()).collect()
    }

    /// Return a snapshot in which every hybrid identifier carries a digest,
    /// hashing files as needed. Groups whose digests turn out equal are
    /// merged. A snapshot must be fully resolved before it is persisted.
    pub fn resolve_all(&self) -> Result<Snapshot, SnapshotError> {
        if !self.groups.keys().any(|id| id.is_unresolved()) {
            return Ok(self.clone());
        }
        let mut resolved = Snapshot::new(self.root.clone(), self.strategy);
        for (id, paths) in &self.groups {
            let id = if id.is_unresolved() {
                // Every path in a group holds identical content; hash the
                // first one.
                match paths.first() {
                    Some(rel) => id.resolved(&self.root.join(rel))?,
                    None => id.clone(),
                }
            } else {
                id.clone()
            };
            for path in paths {
                resolved.insert(id.clone(), path.clone());
            }
        }
        Ok(resolved)
    }
}

/// Multiset equality: same identifier set, and per identifier the same
/// relative paths with the same duplicate counts, in any order.
impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        if self.groups.len() != other.groups.len() {
            return false;
        }
        self.groups.iter().all(|(id, paths)| {
            other
                .groups
                .get(id)
                .is_some_and(|other_paths| multiset_eq(paths, other_paths))
        })
    }
}

impl Eq for Snapshot {}

/// True iff the two path lists are equal as multisets.
pub fn multiset_eq(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut counts: HashMap<&str, isize> = HashMap::new();
    for path in a {
        *counts.entry(path.as_str()).or_insert(0) += 1;
    }
    for path in b {
        match counts.get_mut(path.as_str()) {
            Some(count) if *count > 0 => *count -= 1,
            _ => return false,
        }
    }
    true
}
