mod commands;
mod input;
mod logging;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::compare::CompareArgs;
use commands::deal::{DealArgs, TemplateArgs};
use commands::sensitivity::SensitivityArgs;
use commands::snapshot::SnapshotCommand;

/// Commercial real-estate acquisition underwriting
#[derive(Parser)]
#[command(
    name = "cre",
    version,
    about = "Commercial real-estate acquisition underwriting",
    long_about = "A CLI for underwriting single-property acquisitions with decimal precision. \
                  Builds annual pro formas, levered pre- and after-tax returns, leverage \
                  sweeps, two-way sensitivity grids and side-by-side scenario comparisons."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log engine activity at debug level (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the annual pro forma (year 0 through the hold period)
    ProForma(DealArgs),
    /// Pro forma plus exit, tax on sale, IRR, NPV and equity multiple
    Analyze(DealArgs),
    /// Re-run the deal at LTV 0-90% and report the IRR-maximising point
    Leverage(DealArgs),
    /// Two-way sensitivity grid of one return metric
    Sensitivity(SensitivityArgs),
    /// Compare two deals metric by metric
    Compare(CompareArgs),
    /// Print a default deal to use as an input template
    Template(TemplateArgs),
    /// Save, load and list named deal snapshots
    #[command(subcommand)]
    Snapshot(SnapshotCommand),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::ProForma(args) => commands::deal::run_pro_forma(args),
        Commands::Analyze(args) => commands::deal::run_analyze(args),
        Commands::Leverage(args) => commands::deal::run_leverage(args),
        Commands::Sensitivity(args) => commands::sensitivity::run_sensitivity(args),
        Commands::Compare(args) => commands::compare::run_compare(args),
        Commands::Template(args) => commands::deal::run_template(args),
        Commands::Snapshot(cmd) => commands::snapshot::run_snapshot(cmd),
        Commands::Version => {
            println!("cre {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
