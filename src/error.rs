//! Error Types
//!
//! Error taxonomy for the snapshot/diff/reconcile pipeline. Configuration
//! and state errors carry distinct process exit codes so workflow misuse is
//! reported differently from bugs.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building a snapshot of a directory tree.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// A file could not be read while computing its identifier.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The tree walk itself failed (unreadable directory, broken link loop).
    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    /// The configured root is not a readable directory.
    #[error("{0} is not a directory or does not exist")]
    NotADirectory(PathBuf),
}

/// Errors raised by the snapshot store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No persisted snapshot exists at the given path. Checked separately
    /// from IO errors because step 2 treats it as workflow misuse.
    #[error("no saved snapshot at {0}")]
    Missing(PathBuf),

    #[error("failed to access snapshot file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot file is malformed: {0}")]
    Format(#[from] serde_json::Error),

    #[error("unsupported snapshot format version {0}")]
    Version(u32),
}

/// Top-level CLI error. Variants map onto the process exit codes the tool
/// has always used: configuration problems exit 1, a missing baseline exits
/// -1, and a target that does not match the expected baseline exits 2.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Store(StoreError),

    #[error("results of step 1 do not exist; run step1 first")]
    MissingBaseline,

    #[error(
        "target folder does not match the saved source state; synchronize the \
         target with the source, run step1, modify the source, then run step2"
    )]
    TargetMismatch,
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::MissingBaseline => -1,
            CliError::TargetMismatch => 2,
            _ => 1,
        }
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Missing(_) => CliError::MissingBaseline,
            other => CliError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Config("bad".to_string()).exit_code(), 1);
        assert_eq!(CliError::MissingBaseline.exit_code(), -1);
        assert_eq!(CliError::TargetMismatch.exit_code(), 2);
    }

    #[test]
    fn test_missing_store_maps_to_missing_baseline() {
        let err: CliError = StoreError::Missing(PathBuf::from("./saved.checksum")).into();
        assert!(matches!(err, CliError::MissingBaseline));
    }
}
