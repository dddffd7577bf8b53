use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::deal::{DealInput, InputParameter};
use crate::error::CreError;
use crate::returns::{self, ReturnsResult};
use crate::types::{with_metadata, ComputationOutput, MetricFormat};
use crate::CreResult;

/// Most values one axis may generate.
pub const MAX_AXIS_VALUES: usize = 100;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Output metric read from each cell's returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityMetric {
    AfterTaxIrr,
    Year1CashOnCash,
    EquityMultiple,
    Npv,
    PreTaxIrr,
    Year1PreTaxCashOnCash,
    PreTaxEquityMultiple,
    PreTaxNpv,
}

impl SensitivityMetric {
    pub fn extract(&self, r: &ReturnsResult) -> Decimal {
        match self {
            SensitivityMetric::AfterTaxIrr => r.after_tax.irr,
            SensitivityMetric::Year1CashOnCash => r.year1.after_tax_cash_on_cash,
            SensitivityMetric::EquityMultiple => r.after_tax.equity_multiple,
            SensitivityMetric::Npv => r.after_tax.npv,
            SensitivityMetric::PreTaxIrr => r.pre_tax.irr,
            SensitivityMetric::Year1PreTaxCashOnCash => r.year1.pre_tax_cash_on_cash,
            SensitivityMetric::PreTaxEquityMultiple => r.pre_tax.equity_multiple,
            SensitivityMetric::PreTaxNpv => r.pre_tax.npv,
        }
    }

    pub fn format(&self) -> MetricFormat {
        match self {
            SensitivityMetric::AfterTaxIrr
            | SensitivityMetric::Year1CashOnCash
            | SensitivityMetric::PreTaxIrr
            | SensitivityMetric::Year1PreTaxCashOnCash => MetricFormat::Percent,
            SensitivityMetric::EquityMultiple | SensitivityMetric::PreTaxEquityMultiple => {
                MetricFormat::Decimal
            }
            SensitivityMetric::Npv | SensitivityMetric::PreTaxNpv => MetricFormat::Currency,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SensitivityMetric::AfterTaxIrr => "After-Tax IRR",
            SensitivityMetric::Year1CashOnCash => "Year 1 Cash-on-Cash",
            SensitivityMetric::EquityMultiple => "Equity Multiple",
            SensitivityMetric::Npv => "NPV",
            SensitivityMetric::PreTaxIrr => "Pre-Tax IRR",
            SensitivityMetric::Year1PreTaxCashOnCash => "Year 1 Pre-Tax Cash-on-Cash",
            SensitivityMetric::PreTaxEquityMultiple => "Pre-Tax Equity Multiple",
            SensitivityMetric::PreTaxNpv => "Pre-Tax NPV",
        }
    }
}

/// Values tested along one axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AxisRange {
    /// Explicit list, used as given
    Values { values: Vec<Decimal> },
    /// min, min+step, ... with max appended when the step overshoots it
    Stepped {
        min: Decimal,
        max: Decimal,
        step: Decimal,
    },
    /// `count` evenly spaced points from min to max inclusive
    Linspace { min: Decimal, max: Decimal, count: u32 },
}

impl AxisRange {
    pub fn values(&self, field: &str) -> CreResult<Vec<Decimal>> {
        match self {
            AxisRange::Values { values } => {
                if values.is_empty() {
                    return Err(CreError::invalid(field, "Axis needs at least one value"));
                }
                if values.len() > MAX_AXIS_VALUES {
                    return Err(too_many_values(field, values.len()));
                }
                Ok(values.clone())
            }
            AxisRange::Stepped { min, max, step } => stepped(field, *min, *max, *step),
            AxisRange::Linspace { min, max, count } => linspace(field, *min, *max, *count),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityAxis {
    pub parameter: InputParameter,
    pub range: AxisRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityInput {
    pub base: DealInput,
    pub metric: SensitivityMetric,
    pub axis_a: SensitivityAxis,
    pub axis_b: SensitivityAxis,
}

/// A cell that produced no value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedCell {
    pub value_a: Decimal,
    pub value_b: Decimal,
    pub reason: String,
}

/// Metric values over a two-parameter grid. `matrix[i][j]` holds the metric
/// with parameter A at `values_a[i]` and parameter B at `values_b[j]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityGrid {
    pub metric: SensitivityMetric,
    pub format: MetricFormat,
    pub parameter_a: InputParameter,
    pub parameter_b: InputParameter,
    pub label_a: String,
    pub label_b: String,
    pub values_a: Vec<Decimal>,
    pub values_b: Vec<Decimal>,
    pub matrix: Vec<Vec<Option<Decimal>>>,
    pub excluded: Vec<ExcludedCell>,
    /// Metric at the unmodified base deal
    pub base_value: Option<Decimal>,
    /// Why the base deal produced no value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_error: Option<String>,
}

impl SensitivityGrid {
    pub fn get(&self, i: usize, j: usize) -> Option<Decimal> {
        self.matrix.get(i).and_then(|row| row.get(j)).copied().flatten()
    }

    /// Number of cells that produced a value.
    pub fn filled(&self) -> usize {
        self.matrix.iter().flatten().filter(|c| c.is_some()).count()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Evaluate every (a, b) combination with a full engine run.
pub fn build_grid(input: &SensitivityInput) -> CreResult<SensitivityGrid> {
    input.base.validate()?;
    if input.axis_a.parameter == input.axis_b.parameter {
        return Err(CreError::invalid(
            "axis_b",
            format!(
                "Both axes vary '{}'; choose two different parameters",
                input.axis_a.parameter
            ),
        ));
    }

    let values_a = input.axis_a.range.values(input.axis_a.parameter.name())?;
    let values_b = input.axis_b.range.values(input.axis_b.parameter.name())?;

    let cells: Vec<(Decimal, Decimal)> = values_a
        .iter()
        .flat_map(|&a| values_b.iter().map(move |&b| (a, b)))
        .collect();

    tracing::debug!(
        metric = ?input.metric,
        cells = cells.len(),
        "building sensitivity grid"
    );

    #[cfg(feature = "parallel")]
    let outcomes: Vec<CreResult<Decimal>> = cells
        .par_iter()
        .map(|&(a, b)| evaluate_cell(input, a, b))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<CreResult<Decimal>> = cells
        .iter()
        .map(|&(a, b)| evaluate_cell(input, a, b))
        .collect();

    let mut excluded = Vec::new();
    let flat: Vec<Option<Decimal>> = cells
        .iter()
        .zip(outcomes)
        .map(|(&(value_a, value_b), outcome)| match outcome {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(a = %value_a, b = %value_b, error = %e, "sensitivity cell excluded");
                excluded.push(ExcludedCell {
                    value_a,
                    value_b,
                    reason: e.to_string(),
                });
                None
            }
        })
        .collect();

    let matrix: Vec<Vec<Option<Decimal>>> = flat
        .chunks(values_b.len())
        .map(|row| row.to_vec())
        .collect();

    let (base_value, base_error) = match returns::evaluate(&input.base) {
        Ok(analysis) => (Some(input.metric.extract(&analysis.returns)), None),
        Err(e) => {
            tracing::warn!(error = %e, "sensitivity base deal failed");
            (None, Some(e.to_string()))
        }
    };

    Ok(SensitivityGrid {
        metric: input.metric,
        format: input.metric.format(),
        parameter_a: input.axis_a.parameter,
        parameter_b: input.axis_b.parameter,
        label_a: input.axis_a.parameter.label().to_string(),
        label_b: input.axis_b.parameter.label().to_string(),
        values_a,
        values_b,
        matrix,
        excluded,
        base_value,
        base_error,
    })
}

/// Sensitivity grid in the standard output envelope.
pub fn run_sensitivity(input: &SensitivityInput) -> CreResult<ComputationOutput<SensitivityGrid>> {
    let start = Instant::now();
    let mut warnings = input.base.warnings();

    let grid = build_grid(input)?;

    if !grid.excluded.is_empty() {
        warnings.push(format!(
            "{} of {} cells excluded after computation errors",
            grid.excluded.len(),
            grid.values_a.len() * grid.values_b.len()
        ));
    }
    if let Some(reason) = &grid.base_error {
        warnings.push(format!(
            "Base deal failed to evaluate ({reason}); no base value reported"
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        &format!(
            "Two-Way Sensitivity: {} vs {} / {}",
            input.metric.label(),
            grid.label_a,
            grid.label_b
        ),
        input,
        warnings,
        elapsed,
        grid,
    ))
}

fn evaluate_cell(input: &SensitivityInput, a: Decimal, b: Decimal) -> CreResult<Decimal> {
    let deal = input.axis_a.parameter.apply(&input.base, a)?;
    let deal = input.axis_b.parameter.apply(&deal, b)?;
    let analysis = returns::evaluate(&deal)?;
    Ok(input.metric.extract(&analysis.returns))
}

// ---------------------------------------------------------------------------
// Axis generation
// ---------------------------------------------------------------------------

fn stepped(field: &str, min: Decimal, max: Decimal, step: Decimal) -> CreResult<Vec<Decimal>> {
    if step <= Decimal::ZERO {
        return Err(CreError::invalid(field, "Step must be positive"));
    }
    if min > max {
        return Err(CreError::invalid(field, "Min must be <= max"));
    }

    let within_cap = (max - min)
        .checked_div(step)
        .is_some_and(|intervals| intervals.ceil() + Decimal::ONE <= Decimal::from(MAX_AXIS_VALUES));
    if !within_cap {
        return Err(CreError::invalid(
            field,
            format!("Step is too small: more than {MAX_AXIS_VALUES} values from {min} to {max}"),
        ));
    }

    let mut values = Vec::new();
    let mut current = min;
    while current <= max {
        values.push(current);
        match current.checked_add(step) {
            Some(next) => current = next,
            None => break,
        }
    }
    if let Some(&last) = values.last() {
        if last < max {
            values.push(max);
        }
    }
    Ok(values)
}

fn linspace(field: &str, min: Decimal, max: Decimal, count: u32) -> CreResult<Vec<Decimal>> {
    if count == 0 {
        return Err(CreError::invalid(field, "Count must be at least 1"));
    }
    if min > max {
        return Err(CreError::invalid(field, "Min must be <= max"));
    }
    if count as usize > MAX_AXIS_VALUES {
        return Err(too_many_values(field, count as usize));
    }
    if count == 1 {
        return Ok(vec![min]);
    }
    let intervals = Decimal::from(count - 1);
    Ok((0..count)
        .map(|i| {
            if i == count - 1 {
                max
            } else {
                min + (max - min) * Decimal::from(i) / intervals
            }
        })
        .collect())
}

fn too_many_values(field: &str, count: usize) -> CreError {
    CreError::invalid(
        field,
        format!("Axis has {count} values; at most {MAX_AXIS_VALUES} are allowed"),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
