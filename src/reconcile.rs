//! Reconciler
//!
//! Turns the removed/added tables into an ordered list of move, copy and
//! delete operations against a target tree. Within an identifier group,
//! surplus old locations are deleted, surplus new locations are filled by
//! copying from a surviving representative, and the rest are paired
//! positionally into moves. Content with no old counterpart is copied in
//! from the source tree.
//!
//! Operations for one group are emitted contiguously, with a group's
//! deletes and copies ahead of its moves so the copy representative is
//! still in place when it is read. Across groups the order is sorted by
//! identifier rendering, purely for reproducibility; the algorithm does not
//! detect chains where one group's destination is another group's source.
//! Directory cleanup checks only each operation's immediate source parent;
//! grandparents left empty stay behind.

use crate::diff::DiffTables;
use crate::snapshot::Snapshot;
use std::collections::BTreeSet;
use std::fmt;

/// Where a copy reads its bytes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOrigin {
    /// A target-relative path that already holds the content.
    Target(String),
    /// A source-relative path; the content is new to the target.
    Source(String),
}

/// One elementary filesystem operation, in target-relative terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Move { src: String, dst: String },
    Copy { origin: CopyOrigin, dst: String },
    Delete { path: String },
    /// Remove the directory if it exists and is empty. Emitted after the
    /// moves/deletes that may have emptied it.
    CleanupDir { path: String },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Move { src, dst } => write!(f, "move {} to {}", src, dst),
            Operation::Copy {
                origin: CopyOrigin::Target(src),
                dst,
            } => write!(f, "copy {} to {}", src, dst),
            Operation::Copy {
                origin: CopyOrigin::Source(src),
                dst,
            } => write!(f, "copy {} from source to {}", src, dst),
            Operation::Delete { path } => write!(f, "delete {}", path),
            Operation::CleanupDir { path } => write!(f, "remove directory {} if empty", path),
        }
    }
}

/// Plan the operations that bring the target tree from the baseline state
/// to the current state. Consumes the tables.
///
/// `baseline` is consulted for identifiers that appear only in the added
/// table: when the content already sat fully matched in the baseline (a
/// duplication of an untouched file), the copy reads from that target
/// location instead of reaching back into the source tree.
pub fn reconcile(tables: DiffTables, baseline: &Snapshot) -> Vec<Operation> {
    let DiffTables {
        mut removed,
        mut added,
    } = tables;
    let mut ops = Vec::new();

    let mut removed_ids: Vec<_> = removed.keys().cloned().collect();
    removed_ids.sort_by_key(|id| id.to_string());

    for id in removed_ids {
        let old_paths = match removed.remove(&id) {
            Some(paths) => paths,
            None => continue,
        };
        match added.remove(&id) {
            Some(new_paths) => emit_group(&mut ops, &old_paths, &new_paths),
            None => {
                // Content disappeared entirely.
                for path in &old_paths {
                    ops.push(Operation::Delete { path: path.clone() });
                }
                emit_cleanups(&mut ops, &old_paths);
            }
        }
    }

    // Identifiers only in the added table. If the baseline already held
    // this content, it is still sitting untouched in the target (nothing
    // landed in the removed table for it), so duplicate locally; content
    // genuinely new to the tree is copied in from the (post-change)
    // source tree.
    let mut added_groups: Vec<_> = added.drain().collect();
    added_groups.sort_by_key(|(id, _)| id.to_string());
    for (id, new_paths) in added_groups {
        let local = baseline
            .groups()
            .get(&id)
            .and_then(|paths| paths.first())
            .cloned();
        for path in new_paths {
            let origin = match &local {
                Some(existing) => CopyOrigin::Target(existing.clone()),
                None => CopyOrigin::Source(path.clone()),
            };
            ops.push(Operation::Copy { origin, dst: path });
        }
    }

    ops
}

/// Emit the operations for one identifier present on both sides.
fn emit_group(ops: &mut Vec<Operation>, old_paths: &[String], new_paths: &[String]) {
    let paired = old_paths.len().min(new_paths.len());

    // Surplus old locations: the content survives elsewhere, delete them.
    for path in &old_paths[paired..] {
        ops.push(Operation::Delete { path: path.clone() });
    }

    // Surplus new locations: fill from the first old location, which is
    // still in place because its move is emitted afterwards.
    for dst in &new_paths[paired..] {
        ops.push(Operation::Copy {
            origin: CopyOrigin::Target(old_paths[0].clone()),
            dst: dst.clone(),
        });
    }

    for i in 0..paired {
        ops.push(Operation::Move {
            src: old_paths[i].clone(),
            dst: new_paths[i].clone(),
        });
    }

    emit_cleanups(ops, old_paths);
}

/// Queue an emptiness check for the immediate parent of every vacated
/// path. The tree root (empty parent) is never cleaned up.
fn emit_cleanups(ops: &mut Vec<Operation>, vacated: &[String]) {
    let parents: BTreeSet<String> = vacated
        .iter()
        .filter_map(|path| parent_of(path))
        .collect();
    for path in parents {
        ops.push(Operation::CleanupDir { path });
    }
}

fn parent_of(path: &str) -> Option<String> {
    path.rsplit_once('/').map(|(parent, _)| parent.to_string())
}
