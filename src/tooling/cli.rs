//! CLI Tooling
//!
//! Command-line interface for the two-step replay workflow: `step1` records
//! the source folder's state, `step2` replays the changes made since then
//! into a target folder. All run state lives in an explicit context; the
//! pipeline stages hand results to each other as return values.

use crate::apply::apply;
use crate::diff::diff;
use crate::error::CliError;
use crate::identity::{Identifier, Strategy};
use crate::reconcile::reconcile;
use crate::snapshot::builder::{build, DigestPolicy};
use crate::snapshot::store::SnapshotStore;
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Retrace - replay file movements of one directory in another
///
/// Run the tool twice: first `step1` against the source folder before
/// renaming, then `step2` against a stale copy of that folder after the
/// changes were made.
#[derive(Parser)]
#[command(name = "retrace")]
#[command(about = "Replays file movements of the source directory in a target directory")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Snapshot file carried between the two steps
    #[arg(long, default_value = "./saved.checksum")]
    pub state_file: PathBuf,

    /// Enable verbose logging (RUST_LOG overrides)
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record the state of the source folder before it is modified
    Step1 {
        /// Source folder to snapshot
        #[arg(long)]
        source: PathBuf,

        /// Identity method used to recognize files across renames
        #[arg(long, value_enum, default_value_t = Strategy::Checksums)]
        method: Strategy,

        /// Print the intermediate group tables
        #[arg(long)]
        debug: bool,
    },
    /// Replay the source folder's changes in the target folder
    Step2 {
        /// Target folder holding the stale copy
        #[arg(long)]
        target: PathBuf,

        /// Print the intermediate group tables
        #[arg(long)]
        debug: bool,
    },
}

impl Commands {
    /// Whether the `--debug` table output was requested.
    pub fn debug(&self) -> bool {
        match self {
            Commands::Step1 { debug, .. } | Commands::Step2 { debug, .. } => *debug,
        }
    }
}

/// Execution context for CLI commands.
pub struct CliContext {
    store: SnapshotStore,
}

impl CliContext {
    pub fn new(state_file: PathBuf) -> Self {
        CliContext {
            store: SnapshotStore::new(state_file),
        }
    }

    /// Execute a command and return its console output.
    pub fn execute(&self, command: &Commands) -> Result<String, CliError> {
        match command {
            Commands::Step1 {
                source,
                method,
                debug,
            } => self.step1(source, *method, *debug),
            Commands::Step2 { target, debug } => self.step2(target, *debug),
        }
    }

    fn step1(&self, source: &Path, method: Strategy, debug: bool) -> Result<String, CliError> {
        let source = existing_directory(source, "Source")?;
        let snapshot = build(&source, method, DigestPolicy::Eager)?;

        let mut out = String::new();
        if debug {
            out.push_str(&format_group_table("Source state", snapshot.groups()));
        }
        self.store.save(&snapshot)?;
        info!(state_file = %self.store.path().display(), "baseline saved");
        out.push_str(
            "Step 1 is completed. You can now modify this folder and replay \
             your changes running step 2 afterwards.\n",
        );
        Ok(out)
    }

    fn step2(&self, target: &Path, debug: bool) -> Result<String, CliError> {
        let target = existing_directory(target, "Target")?;
        let baseline = self.store.load()?;
        let strategy = baseline.strategy();

        let target_state = build(&target, strategy, DigestPolicy::Eager)?;
        let current = build(
            baseline.root(),
            strategy,
            DigestPolicy::Deferred {
                references: &[&baseline, &target_state],
            },
        )?;

        let mut out = String::new();
        if debug {
            out.push_str(&format_group_table("Saved source state", baseline.groups()));
            out.push_str(&format_group_table(
                "Current source state",
                current.groups(),
            ));
        }

        if current == baseline {
            out.push_str(&format!(
                "Nothing changed in source folder {}.\n",
                baseline.root().display()
            ));
        }

        if target_state == current {
            out.push_str("Source and Target folders are equal.\n");
            self.store.save(&current.resolve_all()?)?;
            return Ok(out);
        }

        // Reconciliation assumes the target still looks like the source
        // did at step 1. Refuse to touch it otherwise.
        if target_state != baseline {
            return Err(CliError::TargetMismatch);
        }

        let tables = diff(&baseline, &current);
        if debug {
            out.push_str(&format_group_table("Removed", &tables.removed));
            out.push_str(&format_group_table("Added", &tables.added));
        }

        let ops = reconcile(tables, &baseline);
        let report = apply(&ops, &target, current.root());
        out.push_str(&format!("Applied {} operation(s).\n", report.attempted));
        if !report.all_succeeded() {
            out.push_str(&format!(
                "{} operation(s) failed; see the warnings above.\n",
                report.failures.len()
            ));
        }

        self.store.save(&current.resolve_all()?)?;
        out.push_str("Step 2 completed.\n");
        Ok(out)
    }
}

/// Canonicalize a configured directory, rejecting anything that is not a
/// readable directory before any filesystem mutation happens.
fn existing_directory(path: &Path, role: &str) -> Result<PathBuf, CliError> {
    let not_a_dir = || {
        CliError::Config(format!(
            "{} folder {} is not a directory or does not exist",
            role,
            path.display()
        ))
    };
    let canonical = dunce::canonicalize(path).map_err(|_| not_a_dir())?;
    if !canonical.is_dir() {
        return Err(not_a_dir());
    }
    Ok(canonical)
}

/// Render one identifier→paths table for `--debug` output.
fn format_group_table(title: &str, groups: &HashMap<Identifier, Vec<String>>) -> String {
    let mut rows: Vec<(String, String)> = groups
        .iter()
        .map(|(id, paths)| (id.to_string(), paths.join(", ")))
        .collect();
    rows.sort();

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Identifier", "Paths"]);
    for (id, paths) in rows {
        table.add_row(vec![id, paths]);
    }
    format!("{}\n{}\n\n", title.bold().underline(), table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_step1_rejects_missing_source() {
        let temp = TempDir::new().unwrap();
        let ctx = CliContext::new(temp.path().join("saved.checksum"));
        let err = ctx
            .execute(&Commands::Step1 {
                source: temp.path().join("nope"),
                method: Strategy::Checksums,
                debug: false,
            })
            .unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_step1_persists_baseline() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.txt"), "data").unwrap();

        let state_file = temp.path().join("saved.checksum");
        let ctx = CliContext::new(state_file.clone());
        let out = ctx
            .execute(&Commands::Step1 {
                source,
                method: Strategy::Checksums,
                debug: false,
            })
            .unwrap();
        assert!(out.contains("Step 1 is completed"));
        assert!(state_file.is_file());
    }

    #[test]
    fn test_step2_without_baseline_is_a_state_error() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        fs::create_dir_all(&target).unwrap();

        let ctx = CliContext::new(temp.path().join("saved.checksum"));
        let err = ctx
            .execute(&Commands::Step2 {
                target,
                debug: false,
            })
            .unwrap_err();
        assert!(matches!(err, CliError::MissingBaseline));
        assert_eq!(err.exit_code(), -1);
    }

    #[test]
    fn test_debug_output_renders_group_tables() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.txt"), "data").unwrap();

        let ctx = CliContext::new(temp.path().join("saved.checksum"));
        let out = ctx
            .execute(&Commands::Step1 {
                source,
                method: Strategy::Checksums,
                debug: true,
            })
            .unwrap();
        assert!(out.contains("Source state"));
        assert!(out.contains("a.txt"));
    }

    #[test]
    fn test_method_spellings_parse() {
        use clap::ValueEnum;
        assert_eq!(
            Strategy::from_str("checksums", false).unwrap(),
            Strategy::Checksums
        );
        assert_eq!(
            Strategy::from_str("dateAndSize", false).unwrap(),
            Strategy::DateAndSize
        );
        assert_eq!(
            Strategy::from_str("checksumsAndDateAndSize", false).unwrap(),
            Strategy::ChecksumsAndDateAndSize
        );
    }
}
