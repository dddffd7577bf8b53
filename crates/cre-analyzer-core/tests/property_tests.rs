use cre_analyzer_core::deal::DealInput;
use cre_analyzer_core::proforma::project;
use cre_analyzer_core::returns::evaluate;
use cre_analyzer_core::time_value::{irr, npv};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn conventional_flows() -> impl Strategy<Value = Vec<Decimal>> {
    (1_000i64..1_000_000, 1usize..=15).prop_flat_map(|(investment, n)| {
        prop::collection::vec(investment / 20..=investment / 2, n).prop_map(move |inflows| {
            std::iter::once(Decimal::from(-investment))
                .chain(inflows.into_iter().map(Decimal::from))
                .collect()
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn irr_zeroes_npv(flows in conventional_flows()) {
        let rate = irr(&flows, dec!(0.10)).unwrap();
        let residual = npv(rate, &flows).unwrap();
        prop_assert!(residual.abs() < dec!(0.01), "NPV at IRR {} was {}", rate, residual);
    }

    #[test]
    fn loan_amortizes_to_zero_at_term(
        term in 1u32..=12,
        rate_bp in 0u32..=1_200,
        down_pct in 5u32..=100,
    ) {
        let deal = DealInput {
            loan_term_years: term,
            interest_rate: Decimal::new(rate_bp as i64, 4),
            down_payment_pct: Decimal::new(down_pct as i64, 2),
            hold_period_years: 12,
            ..DealInput::default()
        };
        let rows = project(&deal).unwrap();
        prop_assert_eq!(rows[term as usize].ending_loan_balance, Decimal::ZERO);
        for row in &rows[1..] {
            prop_assert!(row.ending_loan_balance >= Decimal::ZERO);
            prop_assert!(row.principal >= Decimal::ZERO);
        }
        for row in &rows[(term as usize + 1)..] {
            prop_assert_eq!(row.debt_service, Decimal::ZERO);
        }
    }

    #[test]
    fn equity_multiple_identity(
        rent in 16u32..=30,
        exit_cap_bp in 450u32..=750,
        hold in 3u32..=15,
    ) {
        let deal = DealInput {
            base_rent_per_area: Decimal::from(rent),
            exit_cap_rate: Decimal::new(exit_cap_bp as i64, 4),
            hold_period_years: hold,
            ..DealInput::default()
        };
        let r = evaluate(&deal).unwrap().returns;
        for basis in [&r.pre_tax, &r.after_tax] {
            prop_assert_eq!(basis.equity_multiple, basis.total_cash_returned / r.equity_required);
            prop_assert_eq!(basis.cash_flows.len(), hold as usize + 1);
        }
    }
}
