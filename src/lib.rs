//! Retrace: Rename-Aware One-Way Directory Synchronization
//!
//! Captures the state of a directory tree, and after the tree has been
//! modified replays the exact moves, copies and deletes into a second,
//! stale copy of that tree. Files are recognized across renames by a
//! pluggable content identity (checksum, size+time, or a hybrid).

pub mod apply;
pub mod diff;
pub mod error;
pub mod identity;
pub mod logging;
pub mod reconcile;
pub mod snapshot;
pub mod tooling;
