use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::deal::DealInput;
use crate::returns::{self, ReturnsResult};
use crate::types::{with_metadata, ComputationOutput, MetricFormat};
use crate::CreResult;

/// One metric side by side for two deals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub metric: String,
    pub format: MetricFormat,
    pub current: Decimal,
    pub reference: Decimal,
    /// current - reference
    pub delta: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareInput {
    pub current: DealInput,
    pub reference: DealInput,
}

/// Compared metrics in display order. Return metrics are on the after-tax basis.
const METRICS: [(&str, MetricFormat); 10] = [
    ("Purchase Price", MetricFormat::Currency),
    ("Equity Required", MetricFormat::Currency),
    ("Loan Amount", MetricFormat::Currency),
    ("Interest Rate", MetricFormat::Percent),
    ("After-Tax IRR", MetricFormat::Percent),
    ("Equity Multiple", MetricFormat::Decimal),
    ("NPV", MetricFormat::Currency),
    ("Avg Cash-on-Cash", MetricFormat::Percent),
    ("Year 1 DSCR", MetricFormat::Decimal),
    ("Total Profit", MetricFormat::Currency),
];

fn metric_values(deal: &DealInput, r: &ReturnsResult) -> [Decimal; 10] {
    [
        deal.purchase_price,
        r.equity_required,
        deal.loan_amount(),
        deal.interest_rate,
        r.after_tax.irr,
        r.after_tax.equity_multiple,
        r.after_tax.npv,
        r.after_tax.average_cash_on_cash,
        r.year1.dscr,
        r.after_tax.total_profit,
    ]
}

/// Side-by-side metrics for two already-evaluated deals.
pub fn compare_scenarios(
    current: (&DealInput, &ReturnsResult),
    reference: (&DealInput, &ReturnsResult),
) -> Vec<ComparisonRow> {
    let cur = metric_values(current.0, current.1);
    let refs = metric_values(reference.0, reference.1);
    METRICS
        .iter()
        .zip(cur.into_iter().zip(refs))
        .map(|((metric, format), (current, reference))| ComparisonRow {
            metric: (*metric).to_string(),
            format: *format,
            current,
            reference,
            delta: current - reference,
        })
        .collect()
}

/// Evaluate both deals and compare them, in the standard output envelope.
pub fn compare_deals(input: &CompareInput) -> CreResult<ComputationOutput<Vec<ComparisonRow>>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    let current = returns::evaluate(&input.current)?.returns;
    let reference = returns::evaluate(&input.reference)?.returns;

    let rows = compare_scenarios((&input.current, &current), (&input.reference, &reference));

    if input.current.hold_period_years != input.reference.hold_period_years {
        warnings.push(format!(
            "Hold periods differ ({} vs {} years); IRR and multiple are not like-for-like",
            input.current.hold_period_years, input.reference.hold_period_years
        ));
    }
    if input.current.discount_rate != input.reference.discount_rate {
        warnings.push("Discount rates differ; NPVs are not directly comparable".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Scenario Comparison (current vs reference, after-tax basis)",
        input,
        warnings,
        elapsed,
        rows,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_identical_deals_have_zero_delta() {
        let deal = DealInput::default();
        let out = compare_deals(&CompareInput {
            current: deal.clone(),
            reference: deal,
        })
        .unwrap();
        assert_eq!(out.result.len(), 10);
        assert!(out.result.iter().all(|row| row.delta.is_zero()));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_metric_order_and_formats() {
        let deal = DealInput::default();
        let r = returns::evaluate(&deal).unwrap().returns;
        let rows = compare_scenarios((&deal, &r), (&deal, &r));
        let names: Vec<&str> = rows.iter().map(|row| row.metric.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Purchase Price",
                "Equity Required",
                "Loan Amount",
                "Interest Rate",
                "After-Tax IRR",
                "Equity Multiple",
                "NPV",
                "Avg Cash-on-Cash",
                "Year 1 DSCR",
                "Total Profit",
            ]
        );
        assert_eq!(rows[3].format, MetricFormat::Percent);
        assert_eq!(rows[5].format, MetricFormat::Decimal);
        assert_eq!(rows[9].format, MetricFormat::Currency);
    }

    #[test]
    fn test_delta_is_current_minus_reference() {
        let reference = DealInput::default();
        let current = DealInput {
            purchase_price: dec!(9500000),
            interest_rate: dec!(0.065),
            ..reference.clone()
        };
        let out = compare_deals(&CompareInput { current, reference }).unwrap();
        let price = &out.result[0];
        assert_eq!(price.current, dec!(9500000));
        assert_eq!(price.reference, dec!(10000000));
        assert_eq!(price.delta, dec!(-500000));
        assert_eq!(out.result[3].delta, dec!(-0.005));
        // Cheaper, cheaper debt: better IRR.
        assert!(out.result[4].delta > Decimal::ZERO);
    }

    #[test]
    fn test_hold_mismatch_warns() {
        let reference = DealInput::default();
        let current = DealInput {
            hold_period_years: 7,
            ..reference.clone()
        };
        let out = compare_deals(&CompareInput { current, reference }).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("Hold periods differ")));
    }
}
