use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::deal::{DealInput, RevenueMode, Tenant};
use crate::error::CreError;
use crate::time_value::growth_factor;
use crate::types::{with_metadata, Area, ComputationOutput, Money, Multiple, Rate};
use crate::CreResult;

/// Closing balances below this are an amortization error, not rounding.
const BALANCE_TOLERANCE: Decimal = dec!(-0.01);

/// Largest magnitude accepted for a single line item. Hold-period totals of
/// items below it stay inside the decimal range.
const LINE_ITEM_LIMIT: Decimal = dec!(1000000000000000000000000);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One projection year. Year 0 is the acquisition year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProFormaRow {
    pub year: u32,

    // Revenue
    pub rent_per_area: Money,
    pub occupancy: Rate,
    pub occupied_area: Area,
    pub gross_rental_income: Money,
    pub other_income: Money,
    pub total_revenue: Money,

    // Reimbursable expenses (disclosed, not deducted from NOI)
    pub property_tax: Money,
    pub insurance: Money,
    pub cam: Money,
    pub total_reimbursable: Money,

    // Landlord expenses
    pub management_fee: Money,
    pub leasing_commission: Money,
    pub repairs_maintenance: Money,
    pub total_landlord_expenses: Money,

    pub noi: Money,

    // Capital expenditures
    pub initial_ti: Money,
    pub capex_reserve: Money,
    pub total_capex: Money,

    // Debt
    pub beginning_loan_balance: Money,
    pub debt_service: Money,
    pub interest: Money,
    pub principal: Money,
    pub ending_loan_balance: Money,

    // Tax
    pub depreciation: Money,
    pub taxable_income: Money,
    pub tax_liability: Money,

    // Cash flow and ratios
    pub pre_tax_cash_flow: Money,
    pub after_tax_cash_flow: Money,
    pub dscr: Multiple,
    pub pre_tax_cash_on_cash: Rate,
    pub after_tax_cash_on_cash: Rate,
}

/// Hold-period totals over years 1..N.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProFormaSummary {
    pub total_noi: Money,
    pub total_debt_service: Money,
    pub total_interest: Money,
    pub total_principal: Money,
    pub total_depreciation: Money,
    pub total_tax: Money,
    pub total_pre_tax_cash_flow: Money,
    pub total_after_tax_cash_flow: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProFormaOutput {
    pub rows: Vec<ProFormaRow>,
    pub summary: ProFormaSummary,
}

/// Quantities resolved once per build and shared by every row.
#[derive(Debug, Clone, Copy)]
struct FinancingTerms {
    equity: Money,
    loan_amount: Money,
    payment: Money,
    annual_depreciation: Money,
}

impl FinancingTerms {
    fn resolve(input: &DealInput) -> CreResult<Self> {
        let equity = input.equity_required();
        if equity <= Decimal::ZERO {
            return Err(CreError::DivisionByZero {
                context: "cash-on-cash (equity required is zero)".into(),
            });
        }
        Ok(FinancingTerms {
            equity,
            loan_amount: input.loan_amount(),
            payment: input.annual_debt_service()?,
            annual_depreciation: input.annual_depreciation()?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct RevenueLine {
    rent_per_area: Money,
    occupancy: Rate,
    occupied_area: Area,
    gross_rent: Money,
}

#[derive(Debug, Clone, Copy, Default)]
struct LoanYear {
    beginning_balance: Money,
    debt_service: Money,
    interest: Money,
    principal: Money,
    ending_balance: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the year 0..=hold pro forma for a deal.
///
/// The loan balance is the only state carried between years; it is threaded
/// through a fold so every row is a function of the input and the previous
/// closing balance.
pub fn project(input: &DealInput) -> CreResult<Vec<ProFormaRow>> {
    input.validate()?;
    let terms = FinancingTerms::resolve(input)?;

    let capacity = input.hold_period_years as usize + 1;
    let (rows, _) = (0..=input.hold_period_years).try_fold(
        (Vec::with_capacity(capacity), terms.loan_amount),
        |(mut rows, balance), year| -> CreResult<_> {
            let row = build_row(input, &terms, year, balance)?;
            let closing = row.ending_loan_balance;
            rows.push(row);
            Ok((rows, closing))
        },
    )?;

    Ok(rows)
}

/// Build the pro forma wrapped in the standard output envelope.
pub fn build_pro_forma(input: &DealInput) -> CreResult<ComputationOutput<ProFormaOutput>> {
    let start = Instant::now();
    let mut warnings = input.warnings();

    let rows = project(input)?;
    let summary = summarize(&rows);

    if let Some(year1) = rows.get(1) {
        if year1.dscr > Decimal::ZERO && year1.dscr < dec!(1.2) {
            warnings.push(format!(
                "Year 1 DSCR of {:.2} is below 1.20x lender covenant",
                year1.dscr.round_dp(2)
            ));
        }
    }
    let loss_years: Vec<String> = rows
        .iter()
        .filter(|r| r.year > 0 && r.taxable_income < Decimal::ZERO)
        .map(|r| r.year.to_string())
        .collect();
    if !loss_years.is_empty() {
        warnings.push(format!(
            "Taxable losses in year(s) {} are not carried forward",
            loss_years.join(", ")
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Commercial Real Estate Pro Forma (Annual, Fixed-Rate Amortizing Debt)",
        input,
        warnings,
        elapsed,
        ProFormaOutput { rows, summary },
    ))
}

pub fn summarize(rows: &[ProFormaRow]) -> ProFormaSummary {
    let operating = || rows.iter().filter(|r| r.year > 0);
    ProFormaSummary {
        total_noi: operating().map(|r| r.noi).sum(),
        total_debt_service: operating().map(|r| r.debt_service).sum(),
        total_interest: operating().map(|r| r.interest).sum(),
        total_principal: operating().map(|r| r.principal).sum(),
        total_depreciation: operating().map(|r| r.depreciation).sum(),
        total_tax: operating().map(|r| r.tax_liability).sum(),
        total_pre_tax_cash_flow: operating().map(|r| r.pre_tax_cash_flow).sum(),
        total_after_tax_cash_flow: operating().map(|r| r.after_tax_cash_flow).sum(),
    }
}

// ---------------------------------------------------------------------------
// Row construction
// ---------------------------------------------------------------------------

fn build_row(
    input: &DealInput,
    terms: &FinancingTerms,
    year: u32,
    opening_balance: Money,
) -> CreResult<ProFormaRow> {
    let operating = year > 0;
    let escalation = if operating {
        growth_factor(input.rent_growth_rate, year - 1)?
    } else {
        Decimal::ZERO
    };

    // --- Revenue ---
    let revenue = project_revenue(input, year)?;
    let other_income = revenue.gross_rent * input.other_income_pct;
    let total_revenue = sum(&[revenue.gross_rent, other_income], "Total revenue")?;

    // --- Reimbursables ---
    let area = input.building_area;
    let property_tax = product(&[area, input.property_tax_per_area, escalation], "Property tax")?;
    let insurance = product(&[area, input.insurance_per_area, escalation], "Insurance")?;
    let cam = product(&[area, input.cam_per_area, escalation], "CAM")?;
    let total_reimbursable = sum(&[property_tax, insurance, cam], "Reimbursables")?;

    // --- Landlord expenses ---
    let (management_fee, leasing_commission, repairs_maintenance) = if operating {
        (
            total_revenue * input.management_fee_pct,
            total_revenue * input.leasing_commission_pct,
            input.repairs_maintenance,
        )
    } else {
        (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)
    };
    let total_landlord_expenses = sum(
        &[management_fee, leasing_commission, repairs_maintenance],
        "Landlord expenses",
    )?;
    let noi = total_revenue - total_landlord_expenses;

    // --- Capex ---
    let (initial_ti, capex_reserve) = if operating {
        (
            Decimal::ZERO,
            product(&[area, input.capex_reserve_per_area], "Capex reserve")?,
        )
    } else {
        (input.initial_ti, Decimal::ZERO)
    };
    let total_capex = sum(&[initial_ti, capex_reserve], "Capex")?;

    // --- Debt ---
    let loan = if operating {
        amortize(input, terms, year, opening_balance)?
    } else {
        LoanYear {
            beginning_balance: opening_balance,
            ending_balance: opening_balance,
            ..LoanYear::default()
        }
    };

    // --- Tax ---
    let depreciation = if operating {
        terms.annual_depreciation
    } else {
        Decimal::ZERO
    };
    let taxable_income = if operating {
        noi - loan.interest - depreciation
    } else {
        Decimal::ZERO
    };
    let tax_liability = (taxable_income * input.tax_rate).max(Decimal::ZERO);

    // --- Cash flow ---
    let pre_tax_cash_flow = noi - loan.debt_service - total_capex;
    let after_tax_cash_flow = pre_tax_cash_flow - tax_liability;

    let levered = operating && loan.debt_service > Decimal::ZERO;
    let (dscr, pre_tax_cash_on_cash, after_tax_cash_on_cash) = if levered {
        (
            ratio(noi, loan.debt_service, "DSCR")?,
            ratio(pre_tax_cash_flow, terms.equity, "Pre-tax cash-on-cash")?,
            ratio(after_tax_cash_flow, terms.equity, "After-tax cash-on-cash")?,
        )
    } else {
        (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)
    };

    Ok(ProFormaRow {
        year,
        rent_per_area: revenue.rent_per_area,
        occupancy: revenue.occupancy,
        occupied_area: revenue.occupied_area,
        gross_rental_income: revenue.gross_rent,
        other_income,
        total_revenue,
        property_tax,
        insurance,
        cam,
        total_reimbursable,
        management_fee,
        leasing_commission,
        repairs_maintenance,
        total_landlord_expenses,
        noi,
        initial_ti,
        capex_reserve,
        total_capex,
        beginning_loan_balance: loan.beginning_balance,
        debt_service: loan.debt_service,
        interest: loan.interest,
        principal: loan.principal,
        ending_loan_balance: loan.ending_balance,
        depreciation,
        taxable_income,
        tax_liability,
        pre_tax_cash_flow,
        after_tax_cash_flow,
        dscr,
        pre_tax_cash_on_cash,
        after_tax_cash_on_cash,
    })
}

/// One year of the level-payment schedule. The payment in the final term
/// year is trued up to the outstanding balance; later years carry no debt.
fn amortize(
    input: &DealInput,
    terms: &FinancingTerms,
    year: u32,
    opening_balance: Money,
) -> CreResult<LoanYear> {
    if year > input.loan_term_years || opening_balance <= Decimal::ZERO {
        return Ok(LoanYear {
            beginning_balance: opening_balance.max(Decimal::ZERO),
            ending_balance: opening_balance.max(Decimal::ZERO),
            ..LoanYear::default()
        });
    }

    let interest = product(&[opening_balance, input.interest_rate], "Interest")?;
    let payoff = sum(&[opening_balance, interest], "Loan payoff")?;

    // Final term year, or a payment that would overshoot: retire the balance exactly.
    if year == input.loan_term_years || terms.payment >= payoff {
        return Ok(LoanYear {
            beginning_balance: opening_balance,
            debt_service: payoff,
            interest,
            principal: opening_balance,
            ending_balance: Decimal::ZERO,
        });
    }

    let debt_service = terms.payment;
    let principal = debt_service - interest;
    if principal < Decimal::ZERO {
        return Err(CreError::FinancialImpossibility(format!(
            "Debt service of {} does not cover year {year} interest of {interest}",
            terms.payment
        )));
    }

    let ending_balance = opening_balance - principal;
    if ending_balance < BALANCE_TOLERANCE {
        return Err(CreError::FinancialImpossibility(format!(
            "Loan balance amortized below zero in year {year}: {ending_balance}"
        )));
    }

    Ok(LoanYear {
        beginning_balance: opening_balance,
        debt_service,
        interest,
        principal,
        ending_balance,
    })
}

// ---------------------------------------------------------------------------
// Revenue
// ---------------------------------------------------------------------------

fn project_revenue(input: &DealInput, year: u32) -> CreResult<RevenueLine> {
    if year == 0 {
        return Ok(RevenueLine::default());
    }
    match &input.revenue_mode {
        RevenueMode::Blended => blended_revenue(input, year),
        RevenueMode::TenantRoll(tenants) => tenant_roll_revenue(input, tenants, year),
    }
}

fn blended_revenue(input: &DealInput, year: u32) -> CreResult<RevenueLine> {
    let (rent_per_area, occupancy) = if year == 1 {
        (input.base_rent_per_area, input.year1_occupancy)
    } else {
        let escalation = growth_factor(input.rent_growth_rate, year - 1)?;
        (
            product(&[input.base_rent_per_area, escalation], "Rent per area")?,
            input.stabilized_occupancy,
        )
    };
    let occupied_area = input.building_area * occupancy;

    Ok(RevenueLine {
        rent_per_area,
        occupancy,
        occupied_area,
        gross_rent: product(&[occupied_area, rent_per_area], "Gross rental income")?,
    })
}

/// In-place leases pay their own escalated rent through expiry; afterwards
/// `release_occupancy_share` of the suite is assumed re-let at the tenant's
/// escalated rate and the rest sits vacant.
fn tenant_roll_revenue(
    input: &DealInput,
    tenants: &[Tenant],
    year: u32,
) -> CreResult<RevenueLine> {
    let escalation = growth_factor(input.rent_growth_rate, year - 1)?;

    let (gross_rent, occupied_area) = tenants.iter().try_fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(gross, occupied), tenant| -> CreResult<_> {
            let market_rent = product(&[tenant.rent_per_area, escalation], "Market rent")?;
            let leased = if year <= tenant.lease_expiration_year {
                tenant.area
            } else {
                tenant.area * input.release_occupancy_share
            };
            let rent = product(&[leased, market_rent], "Tenant rent")?;
            Ok((
                sum(&[gross, rent], "Gross rental income")?,
                sum(&[occupied, leased], "Occupied area")?,
            ))
        },
    )?;

    let rent_per_area = if occupied_area.is_zero() {
        Decimal::ZERO
    } else {
        gross_rent / occupied_area
    };

    Ok(RevenueLine {
        rent_per_area,
        occupancy: occupied_area / input.building_area,
        occupied_area,
        gross_rent,
    })
}

// ---------------------------------------------------------------------------
// Checked arithmetic
// ---------------------------------------------------------------------------

fn bounded(value: Option<Decimal>, context: &str) -> CreResult<Decimal> {
    value
        .filter(|v| v.abs() <= LINE_ITEM_LIMIT)
        .ok_or_else(|| CreError::overflow(context))
}

/// Product of `factors`, or an error once it leaves the line-item range.
pub(crate) fn product(factors: &[Decimal], context: &str) -> CreResult<Decimal> {
    bounded(
        factors
            .iter()
            .try_fold(Decimal::ONE, |acc, f| acc.checked_mul(*f)),
        context,
    )
}

pub(crate) fn sum(terms: &[Decimal], context: &str) -> CreResult<Decimal> {
    bounded(
        terms
            .iter()
            .try_fold(Decimal::ZERO, |acc, t| acc.checked_add(*t)),
        context,
    )
}

pub(crate) fn ratio(numerator: Decimal, denominator: Decimal, context: &str) -> CreResult<Decimal> {
    bounded(numerator.checked_div(denominator), context)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_value;
    use rust_decimal_macros::dec;

    fn sample_input() -> DealInput {
        DealInput::default()
    }

    fn tenant(name: &str, area: Decimal, rent: Decimal, expires: u32) -> Tenant {
        Tenant {
            name: name.into(),
            area,
            rent_per_area: rent,
            lease_expiration_year: expires,
        }
    }

    #[test]
    fn test_row_count() {
        let rows = project(&sample_input()).unwrap();
        assert_eq!(rows.len(), 11);
        assert_eq!(rows.first().unwrap().year, 0);
        assert_eq!(rows.last().unwrap().year, 10);
    }

    #[test]
    fn test_year_zero_is_acquisition_only() {
        let rows = project(&sample_input()).unwrap();
        let y0 = &rows[0];
        assert_eq!(y0.total_revenue, Decimal::ZERO);
        assert_eq!(y0.total_landlord_expenses, Decimal::ZERO);
        assert_eq!(y0.total_reimbursable, Decimal::ZERO);
        assert_eq!(y0.debt_service, Decimal::ZERO);
        assert_eq!(y0.total_capex, dec!(250000));
        assert_eq!(y0.ending_loan_balance, dec!(7725000));
        assert_eq!(y0.dscr, Decimal::ZERO);
        assert_eq!(y0.pre_tax_cash_on_cash, Decimal::ZERO);
        assert_eq!(y0.pre_tax_cash_flow, dec!(-250000));
    }

    #[test]
    fn test_year_one_revenue_and_noi() {
        let rows = project(&sample_input()).unwrap();
        let y1 = &rows[1];
        // 50,000 sf * 90% * $18
        assert_eq!(y1.gross_rental_income, dec!(810000));
        assert_eq!(y1.other_income, dec!(16200));
        assert_eq!(y1.total_revenue, dec!(826200));
        // mgmt 4% + commission 3% of revenue + 25,000 repairs
        assert_eq!(y1.total_landlord_expenses, dec!(82834));
        assert_eq!(y1.noi, dec!(743366));
        // Reimbursables are disclosed but not deducted
        assert_eq!(y1.total_reimbursable, dec!(175000));
        assert_eq!(y1.capex_reserve, dec!(37500));
    }

    #[test]
    fn test_year_two_growth_and_stabilization() {
        let rows = project(&sample_input()).unwrap();
        let y2 = &rows[2];
        assert_eq!(y2.rent_per_area, dec!(18.54));
        assert_eq!(y2.occupancy, dec!(0.95));
        assert_eq!(y2.gross_rental_income, dec!(880650));
        assert_eq!(y2.property_tax, dec!(77250));
    }

    #[test]
    fn test_interest_principal_split() {
        let input = sample_input();
        let rows = project(&input).unwrap();
        let ds = input.annual_debt_service().unwrap();
        let y1 = &rows[1];
        assert_eq!(y1.interest, dec!(540750));
        assert_eq!(y1.debt_service, ds);
        assert_eq!(y1.principal, ds - dec!(540750));
        assert_eq!(y1.ending_loan_balance, dec!(7725000) - y1.principal);
        assert_eq!(rows[2].beginning_loan_balance, y1.ending_loan_balance);
    }

    #[test]
    fn test_exit_balance_matches_closed_form() {
        let input = sample_input();
        let rows = project(&input).unwrap();
        let ds = input.annual_debt_service().unwrap();
        // Balance after 10 payments = PV of the 15 remaining payments
        let expected = time_value::pv(dec!(0.07), 15, -ds, Decimal::ZERO).unwrap();
        let actual = rows.last().unwrap().ending_loan_balance;
        assert!((actual - expected).abs() < dec!(0.0001));
    }

    #[test]
    fn test_tax_and_cash_flow_identities() {
        let input = sample_input();
        let rows = project(&input).unwrap();
        for row in rows.iter().skip(1) {
            assert_eq!(
                row.taxable_income,
                row.noi - row.interest - row.depreciation
            );
            assert_eq!(
                row.tax_liability,
                (row.taxable_income * input.tax_rate).max(Decimal::ZERO)
            );
            assert_eq!(
                row.pre_tax_cash_flow,
                row.noi - row.debt_service - row.total_capex
            );
            assert_eq!(
                row.after_tax_cash_flow,
                row.pre_tax_cash_flow - row.tax_liability
            );
            assert_eq!(row.dscr, row.noi / row.debt_service);
        }
    }

    #[test]
    fn test_depreciation_constant_after_year_zero() {
        let input = sample_input();
        let rows = project(&input).unwrap();
        let annual = input.annual_depreciation().unwrap();
        assert_eq!(rows[0].depreciation, Decimal::ZERO);
        assert!(rows.iter().skip(1).all(|r| r.depreciation == annual));
    }

    #[test]
    fn test_loan_repaid_before_exit() {
        let input = DealInput {
            loan_term_years: 5,
            hold_period_years: 8,
            ..sample_input()
        };
        let rows = project(&input).unwrap();
        assert_eq!(rows[5].ending_loan_balance, Decimal::ZERO);
        for row in &rows[6..] {
            assert_eq!(row.debt_service, Decimal::ZERO);
            assert_eq!(row.dscr, Decimal::ZERO);
            assert_eq!(row.after_tax_cash_on_cash, Decimal::ZERO);
        }
    }

    #[test]
    fn test_zero_rate_straight_line() {
        let input = DealInput {
            interest_rate: Decimal::ZERO,
            ..sample_input()
        };
        let rows = project(&input).unwrap();
        for row in rows.iter().skip(1) {
            assert_eq!(row.interest, Decimal::ZERO);
            assert_eq!(row.principal, dec!(309000));
        }
        assert_eq!(rows[10].ending_loan_balance, dec!(4635000));
    }

    #[test]
    fn test_all_cash_deal_has_no_debt_ratios() {
        let input = sample_input().with_down_payment(Decimal::ONE);
        let rows = project(&input).unwrap();
        assert!(rows.iter().all(|r| r.debt_service.is_zero()));
        assert!(rows.iter().all(|r| r.dscr.is_zero()));
    }

    #[test]
    fn test_tenant_roll_before_and_after_expiry() {
        let input = DealInput {
            revenue_mode: RevenueMode::TenantRoll(vec![
                tenant("Anchor", dec!(30000), dec!(16), 5),
                tenant("Inline", dec!(10000), dec!(24), 2),
            ]),
            ..sample_input()
        };
        let rows = project(&input).unwrap();

        // Year 1: both leases in place
        let y1 = &rows[1];
        assert_eq!(y1.gross_rental_income, dec!(720000));
        assert_eq!(y1.occupied_area, dec!(40000));
        assert_eq!(y1.occupancy, dec!(0.8));
        assert_eq!(y1.rent_per_area, dec!(18));

        // Year 3: inline expired, half re-let at 24 * 1.03^2
        let y3 = &rows[3];
        let growth = dec!(1.0609);
        let expected = dec!(30000) * dec!(16) * growth + dec!(5000) * dec!(24) * growth;
        assert_eq!(y3.gross_rental_income, expected);
        assert_eq!(y3.occupied_area, dec!(35000));
        assert_eq!(y3.rent_per_area, expected / dec!(35000));
    }

    #[test]
    fn test_tenant_roll_release_share_is_configurable() {
        let input = DealInput {
            revenue_mode: RevenueMode::TenantRoll(vec![tenant("Solo", dec!(10000), dec!(20), 1)]),
            release_occupancy_share: Decimal::ZERO,
            ..sample_input()
        };
        let rows = project(&input).unwrap();
        assert_eq!(rows[2].gross_rental_income, Decimal::ZERO);
        assert_eq!(rows[2].rent_per_area, Decimal::ZERO);
        assert_eq!(rows[2].occupancy, Decimal::ZERO);
    }

    #[test]
    fn test_invalid_input_rejected_before_run() {
        let input = DealInput {
            hold_period_years: 0,
            ..sample_input()
        };
        assert!(matches!(
            project(&input),
            Err(CreError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_envelope_warnings() {
        let input = DealInput {
            interest_rate: dec!(0.11),
            ..sample_input()
        };
        let out = build_pro_forma(&input).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("DSCR")));
        assert_eq!(out.result.rows.len(), 11);
    }

    #[test]
    fn test_summary_totals() {
        let rows = project(&sample_input()).unwrap();
        let summary = summarize(&rows);
        let noi: Decimal = rows.iter().map(|r| r.noi).sum();
        assert_eq!(summary.total_noi, noi);
        let split = summary.total_interest + summary.total_principal;
        assert!(
            (summary.total_debt_service - split).abs() < dec!(0.000001),
            "Debt service {} != interest + principal {}",
            summary.total_debt_service,
            split
        );
    }

    #[test]
    fn test_runaway_rent_growth_is_computation_error() {
        // Rent doubling every year for a century leaves the decimal range.
        let input = DealInput {
            rent_growth_rate: dec!(1),
            hold_period_years: 100,
            ..sample_input()
        };
        assert!(input.validate().is_ok());
        let err = project(&input).unwrap_err();
        assert!(err.is_computation_error(), "unexpected error: {err}");
    }

    #[test]
    fn test_runaway_growth_in_tenant_roll_is_computation_error() {
        let input = DealInput {
            revenue_mode: RevenueMode::TenantRoll(vec![tenant("Anchor", dec!(30000), dec!(16), 50)]),
            rent_growth_rate: dec!(1),
            hold_period_years: 90,
            ..sample_input()
        };
        assert!(matches!(
            project(&input),
            Err(CreError::FinancialImpossibility(_))
        ));
    }

    #[test]
    fn test_usurious_rate_is_computation_error() {
        let input = DealInput {
            interest_rate: dec!(3),
            loan_term_years: 50,
            ..sample_input()
        };
        assert!(input.validate().is_ok());
        let err = project(&input).unwrap_err();
        assert!(err.is_computation_error(), "unexpected error: {err}");
    }

    #[test]
    fn test_checked_helpers() {
        assert_eq!(product(&[dec!(2), dec!(3), dec!(4)], "x").unwrap(), dec!(24));
        assert!(product(&[LINE_ITEM_LIMIT, dec!(2)], "x").is_err());
        assert!(product(&[Decimal::MAX, Decimal::MAX], "x").is_err());
        assert!(sum(&[LINE_ITEM_LIMIT, LINE_ITEM_LIMIT], "x").is_err());
        assert!(ratio(dec!(1), Decimal::ZERO, "x").is_err());
        assert_eq!(ratio(dec!(3), dec!(4), "x").unwrap(), dec!(0.75));
    }
}
