//! Snapshot Builder
//!
//! Walks a directory tree in a fixed lexicographic order and groups every
//! regular file by its identifier. The walk must be deterministic so that
//! repeated builds of an unmodified tree produce equal snapshots, which the
//! pipeline relies on for its "nothing changed" fast path.
//!
//! Build policy for per-file read errors: abort the whole build on the
//! first failure. Partial snapshots are never exposed, since a missing file
//! would silently change downstream set membership.

use crate::error::SnapshotError;
use crate::identity::{identify, Identifier, Strategy};
use crate::snapshot::Snapshot;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// When hybrid digests are computed.
#[derive(Debug, Clone, Copy)]
pub enum DigestPolicy<'a> {
    /// Hash every file during the walk. Used for the baseline-defining
    /// walk and for target verification, which must be self-consistent
    /// immediately.
    Eager,
    /// Hash only files whose (size, modified) pair collides with another
    /// file in this walk or with a hybrid identifier in one of the
    /// reference snapshots. Those are exactly the identifiers an equality
    /// check could go on to demand a digest for; everything else can only
    /// ever compare unequal on size/mtime alone.
    Deferred { references: &'a [&'a Snapshot] },
}

/// Build a snapshot of every regular file under `root`.
///
/// Directories are traversed, not recorded. Relative paths are
/// forward-slash normalized so snapshots compare across platforms.
pub fn build(
    root: &Path,
    strategy: Strategy,
    policy: DigestPolicy<'_>,
) -> Result<Snapshot, SnapshotError> {
    if !root.is_dir() {
        return Err(SnapshotError::NotADirectory(root.to_path_buf()));
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = relative_path(root, entry.path())?;
        let mut id = identify(entry.path(), strategy)?;
        if matches!(policy, DigestPolicy::Eager) {
            id = id.resolved(entry.path())?;
        }
        entries.push((rel, id));
    }

    if let DigestPolicy::Deferred { references } = policy {
        resolve_collisions(root, &mut entries, references)?;
    }

    let mut snapshot = Snapshot::new(root.to_path_buf(), strategy);
    for (rel, id) in entries {
        snapshot.insert(id, rel);
    }
    debug!(
        root = %root.display(),
        groups = snapshot.len(),
        "snapshot built"
    );
    Ok(snapshot)
}

/// Resolve digests for every entry whose (size, modified) pair is shared by
/// another entry in this walk or by a hybrid identifier in a reference
/// snapshot. Entries left unresolved have a unique partial key and can
/// never compare equal to anything.
fn resolve_collisions(
    root: &Path,
    entries: &mut [(String, Identifier)],
    references: &[&Snapshot],
) -> Result<(), SnapshotError> {
    let mut walk_counts: HashMap<(u64, u64), usize> = HashMap::new();
    for (_, id) in entries.iter() {
        if let Some(key) = id.partial_key() {
            *walk_counts.entry(key).or_insert(0) += 1;
        }
    }
    let reference_keys: HashSet<(u64, u64)> = references
        .iter()
        .flat_map(|snap| snap.hybrid_partial_keys())
        .collect();

    for (rel, id) in entries.iter_mut() {
        let Some(key) = id.partial_key() else {
            continue;
        };
        if walk_counts.get(&key).copied().unwrap_or(0) > 1 || reference_keys.contains(&key) {
            *id = id.resolved(&root.join(rel.as_str()))?;
        }
    }
    Ok(())
}

fn relative_path(root: &Path, path: &Path) -> Result<String, SnapshotError> {
    let rel = path
        .strip_prefix(root)
        .map_err(|e| SnapshotError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e),
        })?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identifier;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_build_rejects_missing_root() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        let err = build(&missing, Strategy::Checksums, DigestPolicy::Eager).unwrap_err();
        assert!(matches!(err, SnapshotError::NotADirectory(_)));
    }

    #[test]
    fn test_build_groups_duplicates_and_normalizes_paths() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.txt", "same");
        write(temp.path(), "sub/b.txt", "same");
        write(temp.path(), "sub/c.txt", "other");

        let snap = build(temp.path(), Strategy::Checksums, DigestPolicy::Eager).unwrap();
        assert_eq!(snap.len(), 2);
        let dup_group = snap
            .groups()
            .values()
            .find(|paths| paths.len() == 2)
            .expect("duplicate-content group");
        assert!(dup_group.contains(&"a.txt".to_string()));
        assert!(dup_group.contains(&"sub/b.txt".to_string()));
    }

    #[test]
    fn test_build_is_reproducible() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.txt", "one");
        write(temp.path(), "x/b.txt", "two");
        write(temp.path(), "x/y/c.txt", "three");

        let first = build(temp.path(), Strategy::Checksums, DigestPolicy::Eager).unwrap();
        let second = build(temp.path(), Strategy::Checksums, DigestPolicy::Eager).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_eager_hybrid_is_fully_resolved() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.txt", "payload");
        let snap = build(
            temp.path(),
            Strategy::ChecksumsAndDateAndSize,
            DigestPolicy::Eager,
        )
        .unwrap();
        assert!(snap.groups().keys().all(|id| !id.is_unresolved()));
    }

    #[test]
    fn test_deferred_hybrid_resolves_same_size_collisions() {
        let temp = TempDir::new().unwrap();
        // Same byte length: the partial keys can collide, so both files
        // must end up with digests that keep them apart.
        write(temp.path(), "a.txt", "aaaa");
        write(temp.path(), "b.txt", "bbbb");

        let snap = build(
            temp.path(),
            Strategy::ChecksumsAndDateAndSize,
            DigestPolicy::Deferred { references: &[] },
        )
        .unwrap();
        // Whatever the mtime granularity did, the two files must not have
        // been merged into one group: if their partial keys collided, both
        // were hashed apart; if not, their keys already differ.
        assert_eq!(snap.len(), 2);
        for id in snap.groups().keys() {
            assert!(matches!(id, Identifier::Hybrid { .. }));
        }
    }

    #[test]
    fn test_deferred_resolves_against_reference_snapshot() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.txt", "payload");

        let baseline = build(
            temp.path(),
            Strategy::ChecksumsAndDateAndSize,
            DigestPolicy::Eager,
        )
        .unwrap();
        let current = build(
            temp.path(),
            Strategy::ChecksumsAndDateAndSize,
            DigestPolicy::Deferred {
                references: &[&baseline],
            },
        )
        .unwrap();
        // The unchanged file collides with the baseline identifier, gets
        // resolved, and the snapshots compare equal.
        assert_eq!(baseline, current);
    }

    #[test]
    fn test_resolve_all_round_trip() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.txt", "payload");
        let snap = build(
            temp.path(),
            Strategy::ChecksumsAndDateAndSize,
            DigestPolicy::Deferred { references: &[] },
        )
        .unwrap();
        let resolved = snap.resolve_all().unwrap();
        assert!(resolved.groups().keys().all(|id| !id.is_unresolved()));
        let eager = build(
            temp.path(),
            Strategy::ChecksumsAndDateAndSize,
            DigestPolicy::Eager,
        )
        .unwrap();
        assert_eq!(resolved, eager);
    }
}
