use clap::Args;
use serde_json::Value;

use cre_analyzer_core::comparison::{self, CompareInput};
use cre_analyzer_core::deal::DealInput;
use cre_analyzer_core::snapshot;

use crate::input;

/// Arguments for comparing two deals
#[derive(Args)]
pub struct CompareArgs {
    /// Deal under consideration: a JSON deal file or a saved snapshot
    #[arg(long)]
    pub current: String,

    /// Deal to compare against: a JSON deal file or a saved snapshot
    #[arg(long)]
    pub reference: String,
}

pub fn run_compare(args: CompareArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let compare_input = CompareInput {
        current: read_deal_or_snapshot(&args.current)?,
        reference: read_deal_or_snapshot(&args.reference)?,
    };
    let result = comparison::compare_deals(&compare_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Snapshot files wrap the deal under `inputs`; plain deal files do not.
fn read_deal_or_snapshot(path: &str) -> Result<DealInput, Box<dyn std::error::Error>> {
    let value = input::file::read_json_value(path)?;
    if value.get("inputs").is_some() && value.get("created_at").is_some() {
        let snap: snapshot::ScenarioSnapshot = serde_json::from_value(value)?;
        tracing::debug!(name = %snap.name, "comparing saved snapshot");
        Ok(snap.inputs)
    } else {
        Ok(serde_json::from_value(value)?)
    }
}
