use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::deal::DealInput;
use crate::error::CreError;
use crate::proforma::{self, product, ratio, sum, ProFormaRow};
use crate::time_value;
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Rate};
use crate::CreResult;

const IRR_GUESS: Decimal = dec!(0.10);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Return metrics on one tax basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnMetrics {
    /// [-equity, CF_1, ..., CF_N + sale proceeds]
    pub cash_flows: Vec<Money>,
    /// Sum of operating cash flow over years 1..N
    pub total_operating_cash_flow: Money,
    pub total_cash_returned: Money,
    pub total_profit: Money,
    pub equity_multiple: Multiple,
    pub average_cash_on_cash: Rate,
    pub irr: Rate,
    pub npv: Money,
}

/// Year-1 operating snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Year1Snapshot {
    pub noi: Money,
    pub going_in_cap_rate: Rate,
    pub dscr: Multiple,
    pub pre_tax_cash_on_cash: Rate,
    pub after_tax_cash_on_cash: Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnsResult {
    pub equity_required: Money,

    // Exit valuation
    pub exit_noi: Money,
    pub gross_sale_price: Money,
    pub sale_costs: Money,
    pub net_sale_proceeds: Money,
    pub exit_loan_balance: Money,

    // Tax on sale
    pub capital_gain: Money,
    pub total_depreciation: Money,
    pub depreciation_recapture_tax: Money,
    pub capital_gains_tax: Money,
    pub total_tax_on_sale: Money,
    pub net_cash_from_sale: Money,

    pub pre_tax: ReturnMetrics,
    pub after_tax: ReturnMetrics,
    pub year1: Year1Snapshot,
}

/// Pro forma and returns for one deal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealAnalysis {
    pub pro_forma: Vec<ProFormaRow>,
    pub returns: ReturnsResult,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run the full engine for one deal: pro forma then returns.
pub fn evaluate(input: &DealInput) -> CreResult<DealAnalysis> {
    tracing::debug!(
        down_payment = %input.down_payment_pct,
        hold = input.hold_period_years,
        "evaluating deal"
    );
    let pro_forma = proforma::project(input)?;
    let returns = calculate_returns(input, &pro_forma)?;
    Ok(DealAnalysis { pro_forma, returns })
}

/// Full analysis in the standard output envelope.
pub fn analyze_deal(input: &DealInput) -> CreResult<ComputationOutput<DealAnalysis>> {
    let start = Instant::now();
    let mut warnings = input.warnings();

    let analysis = evaluate(input)?;
    let r = &analysis.returns;

    if r.capital_gain - r.total_depreciation < Decimal::ZERO {
        warnings.push(format!(
            "Capital gain net of recapture is negative; capital gains tax of {} is a credit, not floored at zero",
            r.capital_gains_tax.round_dp(2)
        ));
    }
    if r.capital_gain < Decimal::ZERO {
        warnings.push(format!(
            "Gross sale price {} is below the purchase price",
            r.gross_sale_price.round_dp(2)
        ));
    }
    if r.year1.dscr > Decimal::ZERO && r.year1.dscr < dec!(1.2) {
        warnings.push(format!(
            "Year 1 DSCR of {:.2} is below 1.20x lender covenant",
            r.year1.dscr.round_dp(2)
        ));
    }
    if r.after_tax.npv < Decimal::ZERO {
        warnings.push(format!(
            "After-tax IRR of {:.2}% is below the {:.2}% discount rate",
            (r.after_tax.irr * dec!(100)).round_dp(2),
            (input.discount_rate * dec!(100)).round_dp(2)
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Levered Acquisition Returns (Pre-Tax and After-Tax IRR, NPV, Equity Multiple)",
        input,
        warnings,
        elapsed,
        analysis,
    ))
}

/// Exit valuation, tax on sale, and aggregate return metrics from an
/// already-built pro forma.
pub fn calculate_returns(input: &DealInput, rows: &[ProFormaRow]) -> CreResult<ReturnsResult> {
    let expected_rows = input.hold_period_years as usize + 1;
    if rows.len() != expected_rows || rows.len() < 2 {
        return Err(CreError::InsufficientData(format!(
            "Returns need {expected_rows} pro forma rows (years 0..={}), got {}",
            input.hold_period_years,
            rows.len()
        )));
    }

    let equity_required = input.equity_required();
    if equity_required <= Decimal::ZERO {
        return Err(CreError::DivisionByZero {
            context: "equity multiple (equity required is zero)".into(),
        });
    }
    if input.exit_cap_rate.is_zero() {
        return Err(CreError::DivisionByZero {
            context: "exit valuation (NOI / exit cap rate)".into(),
        });
    }

    let final_row = &rows[rows.len() - 1];
    let year1 = &rows[1];
    let operating = &rows[1..];

    // --- Exit valuation ---
    let exit_growth = Decimal::ONE
        .checked_add(input.rent_growth_rate)
        .ok_or_else(|| CreError::overflow("Exit growth"))?;
    let exit_noi = product(&[final_row.noi, exit_growth], "Exit NOI")?;
    let gross_sale_price = ratio(exit_noi, input.exit_cap_rate, "Gross sale price")?;
    let sale_costs = gross_sale_price * input.sale_cost_pct;
    let net_sale_proceeds = gross_sale_price - sale_costs;
    let exit_loan_balance = final_row.ending_loan_balance;

    // --- Tax on sale ---
    let capital_gain = gross_sale_price - input.purchase_price;
    let depreciation: Vec<Money> = operating.iter().map(|r| r.depreciation).collect();
    let total_depreciation = sum(&depreciation, "Total depreciation")?;
    let depreciation_recapture_tax = total_depreciation * input.depreciation_recapture_rate;
    let capital_gains_tax = (capital_gain - total_depreciation) * input.tax_rate;
    let total_tax_on_sale = depreciation_recapture_tax + capital_gains_tax;
    let net_cash_from_sale = net_sale_proceeds - exit_loan_balance - total_tax_on_sale;

    // --- Metrics per basis ---
    let pre_tax = basis_metrics(
        input,
        equity_required,
        operating.iter().map(|r| (r.pre_tax_cash_flow, r.pre_tax_cash_on_cash)),
        net_sale_proceeds - exit_loan_balance,
    )?;
    let after_tax = basis_metrics(
        input,
        equity_required,
        operating
            .iter()
            .map(|r| (r.after_tax_cash_flow, r.after_tax_cash_on_cash)),
        net_cash_from_sale,
    )?;

    let year1 = Year1Snapshot {
        noi: year1.noi,
        going_in_cap_rate: ratio(year1.noi, input.purchase_price, "Going-in cap rate")?,
        dscr: year1.dscr,
        pre_tax_cash_on_cash: year1.pre_tax_cash_on_cash,
        after_tax_cash_on_cash: year1.after_tax_cash_on_cash,
    };

    Ok(ReturnsResult {
        equity_required,
        exit_noi,
        gross_sale_price,
        sale_costs,
        net_sale_proceeds,
        exit_loan_balance,
        capital_gain,
        total_depreciation,
        depreciation_recapture_tax,
        capital_gains_tax,
        total_tax_on_sale,
        net_cash_from_sale,
        pre_tax,
        after_tax,
        year1,
    })
}

/// `yearly` yields (cash flow, cash-on-cash) for years 1..N; `sale_proceeds`
/// is added to year N.
fn basis_metrics(
    input: &DealInput,
    equity_required: Money,
    yearly: impl Iterator<Item = (Money, Rate)>,
    sale_proceeds: Money,
) -> CreResult<ReturnMetrics> {
    let (operating_flows, cash_on_cash): (Vec<Money>, Vec<Rate>) = yearly.unzip();
    if operating_flows.is_empty() {
        return Err(CreError::InsufficientData(
            "At least one operating year is required".into(),
        ));
    }

    let total_operating_cash_flow = sum(&operating_flows, "Operating cash flow")?;

    let mut cash_flows = Vec::with_capacity(operating_flows.len() + 1);
    cash_flows.push(-equity_required);
    cash_flows.extend(operating_flows);
    if let Some(last) = cash_flows.last_mut() {
        *last += sale_proceeds;
    }

    let total_cash_returned = sum(&cash_flows[1..], "Total cash returned")?;
    let total_profit = total_cash_returned - equity_required;
    let equity_multiple = ratio(total_cash_returned, equity_required, "Equity multiple")?;
    let average_cash_on_cash =
        cash_on_cash.iter().copied().sum::<Decimal>() / Decimal::from(cash_on_cash.len() as u64);

    let irr = time_value::irr(&cash_flows, IRR_GUESS)?;
    let npv = time_value::npv(input.discount_rate, &cash_flows)?;

    Ok(ReturnMetrics {
        cash_flows,
        total_operating_cash_flow,
        total_cash_returned,
        total_profit,
        equity_multiple,
        average_cash_on_cash,
        irr,
        npv,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
