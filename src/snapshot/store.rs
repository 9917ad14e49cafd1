//! Snapshot Store
//!
//! Persists exactly one snapshot between invocations as a versioned JSON
//! document. The format is an explicit contract, not a runtime artifact:
//! groups are flattened into records so identifiers never have to serve as
//! JSON object keys, and unknown versions are rejected on load.

use crate::error::StoreError;
use crate::identity::{Identifier, Strategy};
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct GroupRecord {
    id: Identifier,
    paths: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    root: PathBuf,
    strategy: Strategy,
    groups: Vec<GroupRecord>,
}

/// File-backed store holding one snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: PathBuf) -> Self {
        SnapshotStore { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a persisted snapshot exists. A distinct checked condition:
    /// step 2 refuses to run without one.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Persist the snapshot, overwriting any previous one.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let mut groups: Vec<GroupRecord> = snapshot
            .groups()
            .iter()
            .map(|(id, paths)| GroupRecord {
                id: id.clone(),
                paths: paths.clone(),
            })
            .collect();
        // Stable on-disk order, independent of hash-map iteration.
        groups.sort_by(|a, b| a.id.to_string().cmp(&b.id.to_string()));

        let file = SnapshotFile {
            version: FORMAT_VERSION,
            root: snapshot.root().to_path_buf(),
            strategy: snapshot.strategy(),
            groups,
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(&self.path, json).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Load the persisted snapshot.
    pub fn load(&self) -> Result<Snapshot, StoreError> {
        if !self.exists() {
            return Err(StoreError::Missing(self.path.clone()));
        }
        let json = fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        let file: SnapshotFile = serde_json::from_str(&json)?;
        if file.version != FORMAT_VERSION {
            return Err(StoreError::Version(file.version));
        }
        let mut snapshot = Snapshot::new(file.root, file.strategy);
        for record in file.groups {
            for path in record.paths {
                snapshot.insert(record.id.clone(), path);
            }
        }
        Ok(snapshot)
    }
}
