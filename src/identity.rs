//! Content Identity
//!
//! Maps a file to an `Identifier` under one of three interchangeable
//! strategies: a full-content checksum, size plus timestamps, or a hybrid
//! that carries size/mtime and a digest resolved only when a comparison
//! could need it. Identifiers of different kinds never compare equal.

use crate::error::SnapshotError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::Read;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Identity strategy selected on the command line and recorded in the
/// persisted snapshot, so step 2 always compares like with like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum Strategy {
    /// Full-content checksum (default). Strongest, reads every byte.
    #[value(name = "checksums")]
    Checksums,
    /// Byte size + modification time. Metadata only, cannot see
    /// content-only changes that preserve size and mtime.
    #[value(name = "dateAndSize")]
    DateAndSize,
    /// Size + mtime with a digest computed only when an equality check
    /// could demand it.
    #[value(name = "checksumsAndDateAndSize")]
    ChecksumsAndDateAndSize,
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Checksums
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Checksums => "checksums",
            Strategy::DateAndSize => "dateAndSize",
            Strategy::ChecksumsAndDateAndSize => "checksumsAndDateAndSize",
        };
        write!(f, "{}", name)
    }
}

/// Content/metadata fingerprint of a file.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub enum Identifier {
    /// Hex blake3 digest of the full file contents.
    Checksum(String),
    /// Size and timestamps in milliseconds since the epoch. Creation and
    /// access times are recorded for display only; equality uses size and
    /// modification time.
    SizeAndTime {
        size: u64,
        created: u64,
        modified: u64,
        accessed: u64,
    },
    /// Size/mtime plus an optionally-resolved digest. `digest` is `None`
    /// only for files whose (size, modified) pair collided with nothing
    /// during the build, so no equality check ever needed it.
    Hybrid {
        size: u64,
        modified: u64,
        digest: Option<String>,
    },
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Identifier::Checksum(a), Identifier::Checksum(b)) => a == b,
            (
                Identifier::SizeAndTime {
                    size: s1,
                    modified: m1,
                    ..
                },
                Identifier::SizeAndTime {
                    size: s2,
                    modified: m2,
                    ..
                },
            ) => s1 == s2 && m1 == m2,
            (
                Identifier::Hybrid {
                    size: s1,
                    modified: m1,
                    digest: d1,
                },
                Identifier::Hybrid {
                    size: s2,
                    modified: m2,
                    digest: d2,
                },
            ) => s1 == s2 && m1 == m2 && d1 == d2,
            _ => false,
        }
    }
}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Must agree with PartialEq: created/accessed stay out.
        match self {
            Identifier::Checksum(digest) => {
                0u8.hash(state);
                digest.hash(state);
            }
            Identifier::SizeAndTime { size, modified, .. } => {
                1u8.hash(state);
                size.hash(state);
                modified.hash(state);
            }
            Identifier::Hybrid {
                size,
                modified,
                digest,
            } => {
                2u8.hash(state);
                size.hash(state);
                modified.hash(state);
                digest.hash(state);
            }
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Checksum(digest) => write!(f, "{}", digest),
            Identifier::SizeAndTime {
                size,
                created,
                modified,
                accessed,
            } => write!(f, "{}|{}|{}|{}", size, created, modified, accessed),
            Identifier::Hybrid {
                size,
                modified,
                digest,
            } => match digest {
                Some(d) => write!(f, "{}|{}|{}", size, modified, d),
                None => write!(f, "{}|{}|?", size, modified),
            },
        }
    }
}

impl Identifier {
    /// The (size, modified) pair a hybrid equality check narrows on first.
    pub fn partial_key(&self) -> Option<(u64, u64)> {
        match self {
            Identifier::Hybrid { size, modified, .. } => Some((*size, *modified)),
            _ => None,
        }
    }

    /// Whether this identifier still needs a digest.
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Identifier::Hybrid { digest: None, .. })
    }

    /// Return a copy of this identifier with its digest resolved against
    /// the file at `path`. Identifiers are immutable; resolution builds a
    /// new value instead of caching in place. Non-hybrid identifiers and
    /// already-resolved hybrids are returned unchanged.
    pub fn resolved(&self, path: &Path) -> Result<Identifier, SnapshotError> {
        match self {
            Identifier::Hybrid {
                size,
                modified,
                digest: None,
            } => Ok(Identifier::Hybrid {
                size: *size,
                modified: *modified,
                digest: Some(hash_file(path)?),
            }),
            other => Ok(other.clone()),
        }
    }
}

/// Compute the hex blake3 digest of a file's full contents, reading in
/// bounded chunks.
pub fn hash_file(path: &Path) -> Result<String, SnapshotError> {
    let io_err = |source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(io_err)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = file.read(&mut buffer).map_err(io_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize().as_bytes()))
}

fn millis(time: std::io::Result<SystemTime>) -> u64 {
    time.ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Compute the identifier for a regular file under the given strategy.
///
/// Deterministic for unchanged content/metadata. Under the hybrid strategy
/// the digest is left unresolved; the snapshot builder decides when to
/// resolve it.
pub fn identify(path: &Path, strategy: Strategy) -> Result<Identifier, SnapshotError> {
    match strategy {
        Strategy::Checksums => Ok(Identifier::Checksum(hash_file(path)?)),
        Strategy::DateAndSize => {
            let meta = path.metadata().map_err(|source| SnapshotError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(Identifier::SizeAndTime {
                size: meta.len(),
                created: millis(meta.created()),
                modified: millis(meta.modified()),
                accessed: millis(meta.accessed()),
            })
        }
        Strategy::ChecksumsAndDateAndSize => {
            let meta = path.metadata().map_err(|source| SnapshotError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(Identifier::Hybrid {
                size: meta.len(),
                modified: millis(meta.modified()),
                digest: None,
            })
        }
    }
}
