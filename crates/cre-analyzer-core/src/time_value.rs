use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::CreError;
use crate::types::{Money, Rate};
use crate::CreResult;

const CONVERGENCE_THRESHOLD: Decimal = dec!(0.0000001);
const RATE_TOLERANCE: Decimal = dec!(0.000000000001);
const MAX_IRR_ITERATIONS: u32 = 100;
const MAX_BISECTION_ITERATIONS: u32 = 200;
const MIN_RATE: Decimal = dec!(-0.99);
const MAX_RATE: Decimal = dec!(10);

/// Candidate rates scanned for a sign change when Newton-Raphson fails.
const BRACKET_GRID: [Decimal; 18] = [
    dec!(-0.99),
    dec!(-0.9),
    dec!(-0.75),
    dec!(-0.5),
    dec!(-0.25),
    dec!(-0.1),
    dec!(0),
    dec!(0.05),
    dec!(0.1),
    dec!(0.2),
    dec!(0.35),
    dec!(0.5),
    dec!(0.75),
    dec!(1),
    dec!(1.5),
    dec!(2.5),
    dec!(5),
    dec!(10),
];

/// Net Present Value of a series of cash flows. `cash_flows[0]` is undiscounted.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> CreResult<Money> {
    if rate <= dec!(-1) {
        return Err(CreError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount
                .checked_mul(one_plus_r)
                .ok_or_else(|| CreError::DivisionByZero {
                    context: format!("NPV discount factor overflow at period {t}"),
                })?;
        }
        if discount.is_zero() {
            return Err(CreError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        result = cf
            .checked_div(discount)
            .and_then(|pv| result.checked_add(pv))
            .ok_or_else(|| CreError::overflow("NPV"))?;
    }

    Ok(result)
}

/// Internal Rate of Return.
///
/// Newton-Raphson from `guess`; if the iteration stalls, overflows, or leaves
/// the (-99%, 1000%] window it falls back to bisection over the first sign
/// change found on a fixed rate grid. Never returns a default rate: a series
/// without a bracketed root is a `ConvergenceFailure`.
pub fn irr(cash_flows: &[Money], guess: Rate) -> CreResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(CreError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }

    let has_outflow = cash_flows.iter().any(|cf| *cf < Decimal::ZERO);
    let has_inflow = cash_flows.iter().any(|cf| *cf > Decimal::ZERO);
    if !(has_outflow && has_inflow) {
        return Err(CreError::FinancialImpossibility(
            "IRR is undefined for cash flows that never change sign".into(),
        ));
    }

    let mut rate = guess.clamp(MIN_RATE, MAX_RATE);

    for _ in 0..MAX_IRR_ITERATIONS {
        let Some((npv_val, dnpv)) = npv_with_derivative(cash_flows, rate) else {
            break;
        };

        if npv_val.abs() < CONVERGENCE_THRESHOLD {
            return Ok(rate);
        }

        let Some(step) = npv_val.checked_div(dnpv) else {
            break;
        };
        let next = rate - step;

        if next <= MIN_RATE || next > MAX_RATE {
            break;
        }
        if step.abs() < RATE_TOLERANCE {
            return Ok(next);
        }

        rate = next;
    }

    tracing::debug!(guess = %guess, "IRR Newton-Raphson stalled, falling back to bisection");
    bisect_irr(cash_flows)
}

fn bisect_irr(cash_flows: &[Money]) -> CreResult<Rate> {
    let samples: Vec<(Rate, Decimal)> = BRACKET_GRID
        .iter()
        .filter_map(|&r| npv_with_derivative(cash_flows, r).map(|(v, _)| (r, v)))
        .collect();

    let bracket = samples
        .windows(2)
        .find(|w| w[0].1.is_zero() || !same_sign(w[0].1, w[1].1));

    let Some(pair) = bracket else {
        return Err(CreError::ConvergenceFailure {
            function: "IRR".into(),
            iterations: MAX_IRR_ITERATIONS,
            last_delta: samples
                .iter()
                .map(|(_, v)| v.abs())
                .min()
                .unwrap_or(Decimal::MAX),
        });
    };

    let (mut lo, mut f_lo) = pair[0];
    let (mut hi, _) = pair[1];
    if f_lo.is_zero() {
        return Ok(lo);
    }

    let mut last_delta = f_lo;
    for _ in 0..MAX_BISECTION_ITERATIONS {
        let mid = (lo + hi) / dec!(2);
        let (f_mid, _) =
            npv_with_derivative(cash_flows, mid).ok_or_else(|| CreError::ConvergenceFailure {
                function: "IRR".into(),
                iterations: MAX_IRR_ITERATIONS,
                last_delta,
            })?;
        last_delta = f_mid;

        if f_mid.abs() < CONVERGENCE_THRESHOLD || (hi - lo) / dec!(2) < RATE_TOLERANCE {
            return Ok(mid);
        }

        if same_sign(f_mid, f_lo) {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }

    Err(CreError::ConvergenceFailure {
        function: "IRR".into(),
        iterations: MAX_IRR_ITERATIONS + MAX_BISECTION_ITERATIONS,
        last_delta,
    })
}

fn same_sign(a: Decimal, b: Decimal) -> bool {
    (a > Decimal::ZERO && b > Decimal::ZERO) || (a < Decimal::ZERO && b < Decimal::ZERO)
}

/// NPV(r) = sum CF_t / (1+r)^t and its derivative d(NPV)/dr.
/// `None` when a discount factor overflows the decimal range.
fn npv_with_derivative(cash_flows: &[Money], rate: Rate) -> Option<(Decimal, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    if one_plus_r <= Decimal::ZERO {
        return None;
    }

    let mut npv = Decimal::ZERO;
    let mut dnpv = Decimal::ZERO;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        let pv = cf.checked_mul(discount)?;
        npv = npv.checked_add(pv)?;
        if t > 0 {
            // d/dr of CF_t / (1+r)^t = -t * CF_t / (1+r)^(t+1)
            let term = pv
                .checked_mul(Decimal::from(t as u64))?
                .checked_div(one_plus_r)?;
            dnpv = dnpv.checked_sub(term)?;
        }
        discount = discount.checked_div(one_plus_r)?;
    }

    Some((npv, dnpv))
}

/// Present Value
pub fn pv(rate: Rate, nper: u32, pmt: Money, fv: Money) -> CreResult<Money> {
    if rate.is_zero() {
        return pmt
            .checked_mul(Decimal::from(nper))
            .and_then(|total| total.checked_add(fv))
            .map(|total| -total)
            .ok_or_else(|| CreError::overflow("PV"));
    }

    let factor = compound(rate, nper, "PV factor")?;

    if factor.is_zero() {
        return Err(CreError::DivisionByZero {
            context: "PV factor".into(),
        });
    }

    let annuity_factor = (Decimal::ONE - Decimal::ONE / factor) / rate;
    pmt.checked_mul(annuity_factor)
        .and_then(|annuity| annuity.checked_add(fv / factor))
        .map(|total| -total)
        .ok_or_else(|| CreError::overflow("PV"))
}

/// Payment (PMT), spreadsheet sign convention: a positive present value
/// yields a negative payment.
pub fn pmt(rate: Rate, nper: u32, present_value: Money, future_value: Money) -> CreResult<Money> {
    if nper == 0 {
        return Err(CreError::InvalidInput {
            field: "nper".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }

    if present_value.is_zero() && future_value.is_zero() {
        return Ok(Decimal::ZERO);
    }

    if rate.is_zero() {
        return Ok(-(present_value + future_value) / Decimal::from(nper));
    }

    let factor = compound(rate, nper, "PMT factor")?;
    let annuity_factor = (factor - Decimal::ONE)
        .checked_div(rate)
        .ok_or_else(|| CreError::overflow("PMT annuity factor"))?;

    if annuity_factor.is_zero() {
        return Err(CreError::DivisionByZero {
            context: "PMT annuity factor".into(),
        });
    }

    present_value
        .checked_mul(factor)
        .and_then(|grown| grown.checked_add(future_value))
        .and_then(|total| total.checked_div(annuity_factor))
        .map(|payment| -payment)
        .ok_or_else(|| CreError::overflow("PMT"))
}

/// Compound escalation factor (1 + rate)^periods.
pub fn growth_factor(rate: Rate, periods: u32) -> CreResult<Decimal> {
    compound(rate, periods, "Growth factor")
}

fn compound(rate: Rate, periods: u32, context: &str) -> CreResult<Decimal> {
    Decimal::ONE
        .checked_add(rate)
        .and_then(|base| base.checked_powi(periods as i64))
        .ok_or_else(|| CreError::overflow(context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // NPV at 10%: -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(0.01));
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        let result = npv(dec!(0.0), &cfs).unwrap();
        assert_eq!(result, dec!(50));
    }

    #[test]
    fn test_npv_rejects_rate_below_minus_one() {
        assert!(npv(dec!(-1), &[dec!(-100), dec!(110)]).is_err());
    }

    #[test]
    fn test_irr_basic() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let result = irr(&cfs, dec!(0.10)).unwrap();
        // IRR ~9.70%
        assert!((result - dec!(0.0970)).abs() < dec!(0.0001));
        assert!(npv(result, &cfs).unwrap().abs() < dec!(0.0001));
    }

    #[test]
    fn test_irr_exact_single_period() {
        let result = irr(&[dec!(-100), dec!(110)], dec!(0.5)).unwrap();
        assert!((result - dec!(0.10)).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_irr_negative_return() {
        let cfs = vec![dec!(-1000), dec!(100), dec!(100), dec!(500)];
        let result = irr(&cfs, dec!(0.10)).unwrap();
        assert!(result < Decimal::ZERO);
        assert!(npv(result, &cfs).unwrap().abs() < dec!(0.001));
    }

    #[test]
    fn test_irr_bad_guess_falls_back_to_bisection() {
        // A wild guess far from the ~44% root must still converge.
        let cfs = vec![dec!(-100), dec!(0), dec!(0), dec!(300)];
        let result = irr(&cfs, dec!(9.9)).unwrap();
        assert!((result - dec!(0.4422)).abs() < dec!(0.001));
    }

    #[test]
    fn test_irr_no_sign_change() {
        let err = irr(&[dec!(-100), dec!(-50), dec!(-10)], dec!(0.1)).unwrap_err();
        assert!(err.is_computation_error());
        assert!(matches!(err, CreError::FinancialImpossibility(_)));
    }

    #[test]
    fn test_irr_no_real_root_fails() {
        // NPV = 100 - 300x + 250x^2 with x = 1/(1+r) has no real root.
        let err = irr(&[dec!(100), dec!(-300), dec!(250)], dec!(0.1)).unwrap_err();
        assert!(matches!(err, CreError::ConvergenceFailure { .. }));
    }

    #[test]
    fn test_irr_requires_two_flows() {
        assert!(matches!(
            irr(&[dec!(-100)], dec!(0.1)),
            Err(CreError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_pmt_standard_mortgage() {
        // 7,725,000 at 7% over 25 years ≈ 662,886 per year
        let payment = -pmt(dec!(0.07), 25, dec!(7725000), Decimal::ZERO).unwrap();
        assert!((payment - dec!(662886)).abs() < dec!(1));
    }

    #[test]
    fn test_pmt_zero_rate() {
        let payment = pmt(Decimal::ZERO, 10, dec!(1000), Decimal::ZERO).unwrap();
        assert_eq!(payment, dec!(-100));
    }

    #[test]
    fn test_pmt_zero_periods() {
        assert!(pmt(dec!(0.05), 0, dec!(1000), Decimal::ZERO).is_err());
    }

    #[test]
    fn test_pv_basic() {
        let result = pv(dec!(0.08), 10, dec!(-100), dec!(0)).unwrap();
        // PV of annuity: 100 * (1 - 1/1.08^10) / 0.08 = ~671.01
        assert!((result - dec!(671.01)).abs() < dec!(0.01));
    }

    #[test]
    fn test_growth_factor() {
        assert_eq!(growth_factor(dec!(0.03), 0).unwrap(), Decimal::ONE);
        assert_eq!(growth_factor(dec!(0.03), 2).unwrap(), dec!(1.0609));
    }

    #[test]
    fn test_growth_factor_overflow_is_error() {
        // 2^100 is past the 96-bit mantissa
        let err = growth_factor(dec!(1), 100).unwrap_err();
        assert!(err.is_computation_error());
        assert!(matches!(err, CreError::FinancialImpossibility(_)));
    }

    #[test]
    fn test_pmt_overflow_is_error() {
        // 4^50 overflows before the payment can be formed
        let err = pmt(dec!(3), 50, dec!(7725000), Decimal::ZERO).unwrap_err();
        assert!(err.is_computation_error());
    }

    #[test]
    fn test_pmt_nothing_borrowed() {
        assert_eq!(pmt(dec!(3), 50, Decimal::ZERO, Decimal::ZERO).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_pv_overflow_is_error() {
        assert!(pv(dec!(3), 50, dec!(-100), Decimal::ZERO).is_err());
    }
}
