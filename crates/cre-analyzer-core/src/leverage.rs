use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::deal::DealInput;
use crate::returns::{self, DealAnalysis};
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Rate};
use crate::CreResult;

/// Distance between sweep points.
pub const LTV_STEP: Decimal = dec!(0.05);
/// Highest loan-to-value tested.
pub const MAX_LTV: Decimal = dec!(0.90);
/// Points needing less equity than this are not tested.
pub const MIN_DOWN_PAYMENT: Decimal = dec!(0.05);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One leverage point in the sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeverageSweepRow {
    pub ltv: Rate,
    pub down_payment_pct: Rate,
    pub equity_required: Money,
    pub loan_amount: Money,
    pub annual_debt_service: Money,
    pub year1_dscr: Multiple,
    pub after_tax_irr: Rate,
    pub pre_tax_irr: Rate,
    pub after_tax_equity_multiple: Multiple,
    pub pre_tax_equity_multiple: Multiple,
    pub year1_cash_on_cash: Rate,
    pub npv: Money,
}

/// A leverage point that failed to produce returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedPoint {
    pub ltv: Rate,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeverageSweepOutput {
    /// Successful points in ascending LTV order
    pub rows: Vec<LeverageSweepRow>,
    pub excluded: Vec<ExcludedPoint>,
    /// Point with the highest after-tax IRR; the lowest LTV wins ties
    pub optimal: Option<LeverageSweepRow>,
    /// LTV of the input deal, for reference
    pub base_ltv: Rate,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// LTV points 0%, 5%, ..., 90%, skipping any whose down payment is under 5%.
pub fn ltv_points() -> Vec<Rate> {
    let steps = (MAX_LTV / LTV_STEP).trunc();
    let mut points = Vec::new();
    let mut k = Decimal::ZERO;
    while k <= steps {
        let ltv = LTV_STEP * k;
        if Decimal::ONE - ltv >= MIN_DOWN_PAYMENT {
            points.push(ltv);
        }
        k += Decimal::ONE;
    }
    points
}

/// Re-run the full engine at every LTV point. Each point only differs from
/// `input` in its down payment.
pub fn sweep_leverage(input: &DealInput) -> CreResult<LeverageSweepOutput> {
    input.validate()?;
    let points = ltv_points();

    #[cfg(feature = "parallel")]
    let outcomes: Vec<(Rate, CreResult<LeverageSweepRow>)> = points
        .par_iter()
        .map(|&ltv| (ltv, evaluate_point(input, ltv)))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<(Rate, CreResult<LeverageSweepRow>)> = points
        .iter()
        .map(|&ltv| (ltv, evaluate_point(input, ltv)))
        .collect();

    let mut rows = Vec::with_capacity(outcomes.len());
    let mut excluded = Vec::new();
    for (ltv, outcome) in outcomes {
        match outcome {
            Ok(row) => rows.push(row),
            Err(e) => {
                tracing::warn!(ltv = %ltv, error = %e, "leverage point excluded");
                excluded.push(ExcludedPoint {
                    ltv,
                    reason: e.to_string(),
                });
            }
        }
    }

    let optimal = rows
        .iter()
        .fold(None::<&LeverageSweepRow>, |best, row| match best {
            Some(b) if row.after_tax_irr <= b.after_tax_irr => Some(b),
            _ => Some(row),
        })
        .cloned();

    Ok(LeverageSweepOutput {
        rows,
        excluded,
        optimal,
        base_ltv: input.loan_to_value(),
    })
}

/// Leverage sweep in the standard output envelope.
pub fn optimize_leverage(input: &DealInput) -> CreResult<ComputationOutput<LeverageSweepOutput>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    let output = sweep_leverage(input)?;

    match &output.optimal {
        Some(best) => {
            if best.year1_dscr > Decimal::ZERO && best.year1_dscr < dec!(1.2) {
                warnings.push(format!(
                    "IRR-maximising leverage of {:.0}% LTV has a year 1 DSCR of {:.2}",
                    (best.ltv * dec!(100)).round_dp(0),
                    best.year1_dscr.round_dp(2)
                ));
            }
        }
        None => warnings.push("No leverage point produced a valid return".into()),
    }
    if !output.excluded.is_empty() {
        warnings.push(format!(
            "{} leverage point(s) excluded after computation errors",
            output.excluded.len()
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Leverage Sweep (LTV 0-90% in 5pt steps, max after-tax IRR)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

fn evaluate_point(input: &DealInput, ltv: Rate) -> CreResult<LeverageSweepRow> {
    let deal = input.with_down_payment(Decimal::ONE - ltv);
    let DealAnalysis { returns, .. } = returns::evaluate(&deal)?;
    Ok(LeverageSweepRow {
        ltv,
        down_payment_pct: deal.down_payment_pct,
        equity_required: deal.equity_required(),
        loan_amount: deal.loan_amount(),
        annual_debt_service: deal.annual_debt_service()?,
        year1_dscr: returns.year1.dscr,
        after_tax_irr: returns.after_tax.irr,
        pre_tax_irr: returns.pre_tax.irr,
        after_tax_equity_multiple: returns.after_tax.equity_multiple,
        pre_tax_equity_multiple: returns.pre_tax.equity_multiple,
        year1_cash_on_cash: returns.year1.after_tax_cash_on_cash,
        npv: returns.after_tax.npv,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CreError;
    use rust_decimal_macros::dec;

    #[test]
    fn test_ltv_points() {
        let points = ltv_points();
        assert_eq!(points.len(), 19);
        assert_eq!(points[0], Decimal::ZERO);
        assert_eq!(points[1], dec!(0.05));
        assert_eq!(*points.last().unwrap(), dec!(0.90));
        assert!(points.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_sweep_matches_single_runs() {
        let input = DealInput::default();
        let out = sweep_leverage(&input).unwrap();
        assert_eq!(out.rows.len() + out.excluded.len(), 19);

        let row = out
            .rows
            .iter()
            .find(|r| r.ltv == dec!(0.75))
            .expect("75% LTV point present");
        let single = returns::evaluate(&input).unwrap().returns;
        assert_eq!(row.after_tax_irr, single.after_tax.irr);
        assert_eq!(row.npv, single.after_tax.npv);
        assert_eq!(row.pre_tax_irr, single.pre_tax.irr);
        assert_eq!(row.after_tax_equity_multiple, single.after_tax.equity_multiple);
        assert_eq!(row.pre_tax_equity_multiple, single.pre_tax.equity_multiple);
        assert_eq!(row.equity_required, dec!(2575000));
    }

    #[test]
    fn test_failing_points_excluded_not_zeroed() {
        // Any borrowing at 300% over 50 years overflows the payment;
        // only the all-cash point can be evaluated.
        let input = DealInput {
            interest_rate: dec!(3),
            loan_term_years: 50,
            ..DealInput::default()
        };
        let out = sweep_leverage(&input).unwrap();

        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].ltv, Decimal::ZERO);
        assert_eq!(out.excluded.len(), 18);
        for point in &out.excluded {
            assert!(point.ltv > Decimal::ZERO);
            assert!(out.rows.iter().all(|r| r.ltv != point.ltv));
            assert!(point.reason.contains("representable range"));
        }
        assert_eq!(out.optimal.as_ref().map(|r| r.ltv), Some(Decimal::ZERO));

        let envelope = optimize_leverage(&input).unwrap();
        assert!(envelope
            .warnings
            .iter()
            .any(|w| w.starts_with("18 leverage point(s) excluded")));
    }

    #[test]
    fn test_all_cash_point() {
        let out = sweep_leverage(&DealInput::default()).unwrap();
        let all_cash = &out.rows[0];
        assert_eq!(all_cash.ltv, Decimal::ZERO);
        assert_eq!(all_cash.loan_amount, Decimal::ZERO);
        assert_eq!(all_cash.year1_dscr, Decimal::ZERO);
        assert_eq!(all_cash.equity_required, dec!(10300000));
    }

    #[test]
    fn test_optimal_is_max_after_tax_irr() {
        let out = sweep_leverage(&DealInput::default()).unwrap();
        let best = out.optimal.as_ref().unwrap();
        assert!(out.rows.iter().all(|r| r.after_tax_irr <= best.after_tax_irr));
        let first_max = out
            .rows
            .iter()
            .find(|r| r.after_tax_irr == best.after_tax_irr)
            .unwrap();
        assert_eq!(first_max.ltv, best.ltv);
    }

    #[test]
    fn test_base_ltv_reported() {
        let out = sweep_leverage(&DealInput::default()).unwrap();
        assert_eq!(out.base_ltv, dec!(0.75));
    }

    #[test]
    fn test_invalid_base_rejected() {
        let input = DealInput {
            building_area: Decimal::ZERO,
            ..DealInput::default()
        };
        let err = sweep_leverage(&input).unwrap_err();
        assert!(matches!(err, CreError::InvalidInput { .. }));
    }

    #[test]
    fn test_envelope() {
        let out = optimize_leverage(&DealInput::default()).unwrap();
        assert!(out.methodology.contains("Leverage"));
        assert!(out.result.optimal.is_some());
    }
}
