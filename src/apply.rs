//! Operation Applier
//!
//! Executes planned operations against the target tree. Application is
//! best-effort: every operation logs its action before executing, and a
//! failure is recorded and logged but does not halt the remaining
//! sequence. The caller decides what to do with the report.

use crate::reconcile::{CopyOrigin, Operation};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Outcome of applying one operation sequence.
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Operations attempted (cleanup checks included).
    pub attempted: usize,
    /// Operations that failed, with the error text.
    pub failures: Vec<(Operation, String)>,
}

impl ApplyReport {
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Apply every operation against `target_root`, reading source-origin
/// copies from `source_root`.
pub fn apply(ops: &[Operation], target_root: &Path, source_root: &Path) -> ApplyReport {
    let mut report = ApplyReport::default();
    for op in ops {
        report.attempted += 1;
        info!(target_root = %target_root.display(), "{}", op);
        if let Err(err) = apply_one(op, target_root, source_root) {
            warn!("{} failed: {}", op, err);
            report.failures.push((op.clone(), err.to_string()));
        }
    }
    report
}

fn apply_one(op: &Operation, target_root: &Path, source_root: &Path) -> io::Result<()> {
    match op {
        Operation::Move { src, dst } => {
            let from = resolve(target_root, src);
            let to = resolve(target_root, dst);
            ensure_parent(&to)?;
            fs::rename(from, to)
        }
        Operation::Copy { origin, dst } => {
            let from = match origin {
                CopyOrigin::Target(src) => resolve(target_root, src),
                CopyOrigin::Source(src) => resolve(source_root, src),
            };
            let to = resolve(target_root, dst);
            ensure_parent(&to)?;
            // Bytes only; metadata is not carried over.
            fs::copy(from, to).map(|_| ())
        }
        Operation::Delete { path } => {
            let file = resolve(target_root, path);
            if file.exists() {
                fs::remove_file(file)
            } else {
                // Missing delete targets are a warning, not a failure.
                warn!("nothing to delete at {}", file.display());
                Ok(())
            }
        }
        Operation::CleanupDir { path } => {
            let dir = resolve(target_root, path);
            if dir.is_dir() && dir.read_dir()?.next().is_none() {
                fs::remove_dir(dir)
            } else {
                debug!("{} not empty or already gone, keeping", dir.display());
                Ok(())
            }
        }
    }
}

fn resolve(root: &Path, relative: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for part in relative.split('/') {
        path.push(part);
    }
    path
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn test_move_creates_destination_parents() {
        let target = TempDir::new().unwrap();
        let source = TempDir::new().unwrap();
        write(target.path(), "a.txt", "data");

        let ops = vec![Operation::Move {
            src: "a.txt".to_string(),
            dst: "deep/sub/a.txt".to_string(),
        }];
        let report = apply(&ops, target.path(), source.path());
        assert!(report.all_succeeded());
        assert!(!target.path().join("a.txt").exists());
        assert_eq!(
            fs::read_to_string(target.path().join("deep/sub/a.txt")).unwrap(),
            "data"
        );
    }

    #[test]
    fn test_copy_from_target_duplicates_bytes() {
        let target = TempDir::new().unwrap();
        let source = TempDir::new().unwrap();
        write(target.path(), "a.txt", "data");

        let ops = vec![Operation::Copy {
            origin: CopyOrigin::Target("a.txt".to_string()),
            dst: "copy.txt".to_string(),
        }];
        let report = apply(&ops, target.path(), source.path());
        assert!(report.all_succeeded());
        assert_eq!(
            fs::read_to_string(target.path().join("copy.txt")).unwrap(),
            "data"
        );
        assert!(target.path().join("a.txt").exists());
    }

    #[test]
    fn test_copy_from_source_brings_new_content() {
        let target = TempDir::new().unwrap();
        let source = TempDir::new().unwrap();
        write(source.path(), "sub/new.txt", "fresh");

        let ops = vec![Operation::Copy {
            origin: CopyOrigin::Source("sub/new.txt".to_string()),
            dst: "sub/new.txt".to_string(),
        }];
        let report = apply(&ops, target.path(), source.path());
        assert!(report.all_succeeded());
        assert_eq!(
            fs::read_to_string(target.path().join("sub/new.txt")).unwrap(),
            "fresh"
        );
    }

    #[test]
    fn test_delete_missing_file_is_not_a_failure() {
        let target = TempDir::new().unwrap();
        let source = TempDir::new().unwrap();
        let ops = vec![Operation::Delete {
            path: "gone.txt".to_string(),
        }];
        let report = apply(&ops, target.path(), source.path());
        assert!(report.all_succeeded());
        assert_eq!(report.attempted, 1);
    }

    #[test]
    fn test_cleanup_removes_only_empty_directories() {
        let target = TempDir::new().unwrap();
        let source = TempDir::new().unwrap();
        fs::create_dir_all(target.path().join("empty")).unwrap();
        write(target.path(), "full/keep.txt", "data");

        let ops = vec![
            Operation::CleanupDir {
                path: "empty".to_string(),
            },
            Operation::CleanupDir {
                path: "full".to_string(),
            },
            Operation::CleanupDir {
                path: "never-existed".to_string(),
            },
        ];
        let report = apply(&ops, target.path(), source.path());
        assert!(report.all_succeeded());
        assert!(!target.path().join("empty").exists());
        assert!(target.path().join("full/keep.txt").exists());
    }

    #[test]
    fn test_failure_does_not_halt_the_sequence() {
        let target = TempDir::new().unwrap();
        let source = TempDir::new().unwrap();
        write(target.path(), "a.txt", "data");

        let ops = vec![
            Operation::Move {
                src: "missing.txt".to_string(),
                dst: "elsewhere.txt".to_string(),
            },
            Operation::Move {
                src: "a.txt".to_string(),
                dst: "b.txt".to_string(),
            },
        ];
        let report = apply(&ops, target.path(), source.path());
        assert_eq!(report.attempted, 2);
        assert_eq!(report.failures.len(), 1);
        assert!(target.path().join("b.txt").exists());
    }
}
