use clap::Args;
use serde_json::Value;

use cre_analyzer_core::deal::DealInput;
use cre_analyzer_core::{leverage, proforma, returns};

use crate::input;

/// Arguments for any command that runs a single deal
#[derive(Args)]
pub struct DealArgs {
    /// Path to JSON deal file (reads stdin when omitted)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for the template command
#[derive(Args)]
pub struct TemplateArgs {
    /// Emit the template inside the standard output envelope
    #[arg(long)]
    pub envelope: bool,
}

fn read_deal(args: &DealArgs) -> Result<DealInput, Box<dyn std::error::Error>> {
    input::read_input(args.input.as_deref(), "deal analysis")
}

pub fn run_pro_forma(args: DealArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let deal = read_deal(&args)?;
    let result = proforma::build_pro_forma(&deal)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_analyze(args: DealArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let deal = read_deal(&args)?;
    let result = returns::analyze_deal(&deal)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_leverage(args: DealArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let deal = read_deal(&args)?;
    let result = leverage::optimize_leverage(&deal)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_template(args: TemplateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let deal = DealInput::default();
    if args.envelope {
        Ok(serde_json::json!({
            "result": deal,
            "methodology": "Default deal template",
            "warnings": deal.warnings(),
        }))
    } else {
        Ok(serde_json::to_value(deal)?)
    }
}
