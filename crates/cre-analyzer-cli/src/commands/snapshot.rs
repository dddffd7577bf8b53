use clap::{Args, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use cre_analyzer_core::deal::DealInput;
use cre_analyzer_core::snapshot;

use crate::input;

const DEFAULT_DIR: &str = "scenarios";

#[derive(Subcommand)]
pub enum SnapshotCommand {
    /// Save a deal under a name with the current timestamp
    Save(SaveArgs),
    /// Print a saved snapshot
    Load(LoadArgs),
    /// List saved snapshots, newest first
    List(ListArgs),
}

#[derive(Args)]
pub struct SaveArgs {
    /// Snapshot name
    #[arg(long)]
    pub name: String,

    /// Path to JSON deal file (reads stdin when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Snapshot directory
    #[arg(long, default_value = DEFAULT_DIR)]
    pub dir: PathBuf,
}

#[derive(Args)]
pub struct LoadArgs {
    /// Path to a snapshot file
    pub path: PathBuf,
}

#[derive(Args)]
pub struct ListArgs {
    /// Snapshot directory
    #[arg(long, default_value = DEFAULT_DIR)]
    pub dir: PathBuf,
}

pub fn run_snapshot(cmd: SnapshotCommand) -> Result<Value, Box<dyn std::error::Error>> {
    match cmd {
        SnapshotCommand::Save(args) => {
            let deal: DealInput = input::read_input(args.input.as_deref(), "snapshot save")?;
            let path = snapshot::save_snapshot(&args.dir, &args.name, &deal)?;
            Ok(json!({ "name": args.name, "path": path.display().to_string() }))
        }
        SnapshotCommand::Load(args) => {
            let snap = snapshot::load_snapshot(&args.path)?;
            Ok(serde_json::to_value(snap)?)
        }
        SnapshotCommand::List(args) => {
            let entries = snapshot::list_snapshots(&args.dir)?
                .iter()
                .map(|path| describe(path))
                .collect::<Vec<_>>();
            Ok(Value::Array(entries))
        }
    }
}

/// Listing row; unreadable files are listed with their file name only.
fn describe(path: &Path) -> Value {
    match snapshot::load_snapshot(path) {
        Ok(snap) => json!({
            "name": snap.name,
            "created_at": snap.created_at.to_rfc3339(),
            "path": path.display().to_string(),
        }),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable snapshot");
            json!({
                "name": path.file_stem().map(|s| s.to_string_lossy().into_owned()),
                "created_at": Value::Null,
                "path": path.display().to_string(),
            })
        }
    }
}
