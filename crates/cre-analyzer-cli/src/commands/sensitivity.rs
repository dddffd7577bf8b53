use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use cre_analyzer_core::deal::{DealInput, InputParameter};
use cre_analyzer_core::sensitivity::{
    self, AxisRange, SensitivityAxis, SensitivityInput, SensitivityMetric,
};

use crate::input;

/// Arguments for a two-way sensitivity grid
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to a full sensitivity JSON (base, metric, axis_a, axis_b).
    /// When given, the flags below are ignored.
    #[arg(long, conflicts_with_all = ["input", "axis_a", "axis_b"])]
    pub config: Option<String>,

    /// Path to JSON base deal (reads stdin when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Metric reported in each cell
    #[arg(long, value_enum, default_value = "after-tax-irr")]
    pub metric: MetricArg,

    /// Row axis: name:min:max:step, name:min:max#count, or name=v1,v2,...
    /// (e.g. "interest_rate:0.05:0.09:0.01")
    #[arg(long, required_unless_present = "config")]
    pub axis_a: Option<String>,

    /// Column axis, same forms as --axis-a
    #[arg(long, required_unless_present = "config")]
    pub axis_b: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MetricArg {
    AfterTaxIrr,
    CashOnCash,
    EquityMultiple,
    Npv,
    PreTaxIrr,
    PreTaxCashOnCash,
    PreTaxEquityMultiple,
    PreTaxNpv,
}

impl From<MetricArg> for SensitivityMetric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::AfterTaxIrr => SensitivityMetric::AfterTaxIrr,
            MetricArg::CashOnCash => SensitivityMetric::Year1CashOnCash,
            MetricArg::EquityMultiple => SensitivityMetric::EquityMultiple,
            MetricArg::Npv => SensitivityMetric::Npv,
            MetricArg::PreTaxIrr => SensitivityMetric::PreTaxIrr,
            MetricArg::PreTaxCashOnCash => SensitivityMetric::Year1PreTaxCashOnCash,
            MetricArg::PreTaxEquityMultiple => SensitivityMetric::PreTaxEquityMultiple,
            MetricArg::PreTaxNpv => SensitivityMetric::PreTaxNpv,
        }
    }
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let sens_input = match args.config {
        Some(ref path) => input::file::read_json::<SensitivityInput>(path)?,
        None => {
            let base: DealInput = input::read_input(args.input.as_deref(), "sensitivity")?;
            let axis_a = args.axis_a.as_deref().ok_or("--axis-a is required")?;
            let axis_b = args.axis_b.as_deref().ok_or("--axis-b is required")?;
            SensitivityInput {
                base,
                metric: args.metric.into(),
                axis_a: parse_axis(axis_a)?,
                axis_b: parse_axis(axis_b)?,
            }
        }
    };

    let result = sensitivity::run_sensitivity(&sens_input)?;
    Ok(serde_json::to_value(result)?)
}

fn parse_axis(spec: &str) -> Result<SensitivityAxis, Box<dyn std::error::Error>> {
    if let Some((name, list)) = spec.split_once('=') {
        let values = list
            .split(',')
            .map(|v| v.trim().parse::<Decimal>())
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(SensitivityAxis {
            parameter: name.trim().parse::<InputParameter>()?,
            range: AxisRange::Values { values },
        });
    }

    let parts: Vec<&str> = spec.split(':').collect();
    match parts.as_slice() {
        [name, min, rest @ ..] if rest.len() == 1 && rest[0].contains('#') => {
            let (max, count) = rest[0]
                .split_once('#')
                .ok_or_else(|| format!("Bad linspace axis '{spec}'"))?;
            Ok(SensitivityAxis {
                parameter: name.parse::<InputParameter>()?,
                range: AxisRange::Linspace {
                    min: min.parse()?,
                    max: max.parse()?,
                    count: count.parse()?,
                },
            })
        }
        [name, min, max, step] => Ok(SensitivityAxis {
            parameter: name.parse::<InputParameter>()?,
            range: AxisRange::Stepped {
                min: min.parse()?,
                max: max.parse()?,
                step: step.parse()?,
            },
        }),
        _ => Err(format!(
            "Axis must be name:min:max:step, name:min:max#count or name=v1,v2,..., got '{spec}'"
        )
        .into()),
    }
}
