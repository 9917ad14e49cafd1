//! Tooling & Integration Layer
//!
//! Command-line surface for the snapshot/replay pipeline.

pub mod cli;

pub use cli::{Cli, CliContext, Commands};
