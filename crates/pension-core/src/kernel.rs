use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::{Money, Rate};

const IRR_TOLERANCE: Decimal = dec!(0.0000001);
const IRR_MAX_ITERATIONS: u32 = 200;
const IRR_LOWER_BOUND: Decimal = dec!(-0.99);
const IRR_UPPER_BOUND: Decimal = dec!(5.0);
const MONTHS_PER_YEAR: u32 = 12;

/// (1 + r)^n via iterative multiplication (avoids Decimal::powd drift).
pub fn compound(rate: Rate, n: u32) -> Decimal {
    let mut result = Decimal::ONE;
    let factor = Decimal::ONE + rate;
    for _ in 0..n {
        result *= factor;
    }
    result
}

/// Future value of a level yearly payment over `years` years.
/// FV = pmt * ((1+r)^n - 1) / r, degenerating to pmt * n at r = 0.
pub fn future_value(pmt: Money, rate: Rate, years: u32) -> Money {
    if rate.is_zero() {
        return pmt * Decimal::from(years);
    }
    pmt * (compound(rate, years) - Decimal::ONE) / rate
}

/// Level monthly payment that exhausts `balance` over `months` months at
/// monthly rate `yearly_rate / 12`.
pub fn monthly_annuity(balance: Money, yearly_rate: Rate, months: u32) -> Money {
    if months == 0 {
        return Decimal::ZERO;
    }
    let i = yearly_rate / Decimal::from(MONTHS_PER_YEAR);
    if i.is_zero() {
        return balance / Decimal::from(months);
    }
    let discount = Decimal::ONE / compound(i, months);
    balance * i / (Decimal::ONE - discount)
}

/// Initial monthly payment of an escalating annuity: payments fall due at
/// month end, each yearly cohort of 12 grows by `escalation`, and the present
/// value of the whole schedule at `yearly_rate / 12` equals `balance`.
///
/// Evaluated via the unit-payment present-value factor; the payment is linear
/// in the factor so no root search is needed.
pub fn escalating_annuity(
    balance: Money,
    yearly_rate: Rate,
    escalation: Rate,
    months: u32,
) -> Money {
    if months == 0 {
        return Decimal::ZERO;
    }
    let i = yearly_rate / Decimal::from(MONTHS_PER_YEAR);
    if i.is_zero() && escalation.is_zero() {
        return balance / Decimal::from(months);
    }
    let v = Decimal::ONE / (Decimal::ONE + i);
    let mut factor = Decimal::ZERO;
    let mut cohort = Decimal::ONE;
    let mut discount = Decimal::ONE;
    for m in 0..months {
        if m > 0 && m % MONTHS_PER_YEAR == 0 {
            cohort *= Decimal::ONE + escalation;
        }
        discount *= v;
        factor += cohort * discount;
    }
    balance / factor
}

/// Net Present Value of yearly cash flows indexed from year 0.
/// `rate` must be greater than -100%.
pub fn npv(cash_flows: &[Money], rate: Rate) -> Money {
    let v = Decimal::ONE / (Decimal::ONE + rate);
    let mut discount = Decimal::ONE;
    let mut total = Decimal::ZERO;
    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount *= v;
        }
        total += cf * discount;
    }
    total
}

/// Internal Rate of Return by bisection on [-0.99, 5.0].
///
/// Returns None when the cash flows never change sign, when no root lies in
/// the bracket, or when bisection fails to tighten below tolerance within the
/// iteration cap. Callers report this as an absent IRR, never as a failure.
pub fn irr(cash_flows: &[Money]) -> Option<Rate> {
    let has_positive = cash_flows.iter().any(|cf| *cf > Decimal::ZERO);
    let has_negative = cash_flows.iter().any(|cf| *cf < Decimal::ZERO);
    if !has_positive || !has_negative {
        return None;
    }

    let mut lo = IRR_LOWER_BOUND;
    let mut hi = IRR_UPPER_BOUND;
    let mut npv_lo = npv(cash_flows, lo);
    let npv_hi = npv(cash_flows, hi);
    if npv_lo.is_zero() {
        return Some(lo);
    }
    if npv_hi.is_zero() {
        return Some(hi);
    }
    if npv_lo.is_sign_positive() == npv_hi.is_sign_positive() {
        return None;
    }

    for _ in 0..IRR_MAX_ITERATIONS {
        let mid = (lo + hi) / dec!(2);
        let npv_mid = npv(cash_flows, mid);
        if npv_mid.abs() < IRR_TOLERANCE || (hi - lo) / dec!(2) < IRR_TOLERANCE {
            return Some(mid);
        }
        if npv_mid.is_sign_positive() == npv_lo.is_sign_positive() {
            lo = mid;
            npv_lo = npv_mid;
        } else {
            hi = mid;
        }
    }
    None
}

/// First (fractional) age at which cumulative benefits reach cumulative
/// contributions. Both series are aligned ascending-by-age; the crossing is
/// linearly interpolated between the two surrounding yearly points. None if
/// the horizon is never reached.
pub fn payback_age(
    cumulative_contrib: &[(u32, Money)],
    cumulative_benefit: &[(u32, Money)],
) -> Option<Decimal> {
    let n = cumulative_contrib.len().min(cumulative_benefit.len());
    for idx in 0..n {
        let (age, benefit) = cumulative_benefit[idx];
        let (_, contrib) = cumulative_contrib[idx];
        if benefit >= contrib {
            if idx == 0 {
                return Some(Decimal::from(age));
            }
            let (prev_age, prev_benefit) = cumulative_benefit[idx - 1];
            let (_, prev_contrib) = cumulative_contrib[idx - 1];
            let shortfall = prev_contrib - prev_benefit;
            let surplus = benefit - contrib;
            let span = shortfall + surplus;
            let fraction = if span.is_zero() {
                Decimal::ZERO
            } else {
                shortfall / span
            };
            return Some(Decimal::from(prev_age) + Decimal::from(age - prev_age) * fraction);
        }
    }
    None
}
