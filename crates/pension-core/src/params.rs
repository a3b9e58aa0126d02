use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::PensionSimError;
use crate::kernel::compound;
use crate::types::{Money, Rate};
use crate::PensionSimResult;

/// A constants table keyed by calendar year.
///
/// Lookups resolve to the greatest covered year not after the requested one.
/// Across any gap or beyond the horizon, amounts are inflation-indexed from
/// that value while rates are carried forward unchanged. Years before the
/// first covered year are a configuration error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearSeries {
    label: String,
    values: BTreeMap<i32, Decimal>,
}

impl YearSeries {
    pub fn new(label: &str, pairs: &[(i32, Decimal)]) -> Self {
        YearSeries {
            label: label.to_string(),
            values: pairs.iter().copied().collect(),
        }
    }

    fn lookup(&self, year: i32) -> PensionSimResult<(i32, Decimal)> {
        let (first, _) = self
            .values
            .iter()
            .next()
            .ok_or_else(|| PensionSimError::Config {
                what: self.label.clone(),
                year,
                nearest: None,
            })?;
        if year < *first {
            return Err(PensionSimError::Config {
                what: self.label.clone(),
                year,
                nearest: Some(*first),
            });
        }
        let (known_year, value) = self
            .values
            .range(..=year)
            .next_back()
            .expect("range is non-empty past the first-year check");
        Ok((*known_year, *value))
    }

    /// Monetary amount for `year`, inflation-indexed past the last known year.
    pub fn amount_for(&self, year: i32, inflation: Rate) -> PensionSimResult<Money> {
        let (known_year, value) = self.lookup(year)?;
        if year > known_year {
            let gap = (year - known_year) as u32;
            return Ok(value * compound(inflation, gap));
        }
        Ok(value)
    }

    /// Rate for `year`, carried forward unchanged past the last known year.
    pub fn rate_for(&self, year: i32) -> PensionSimResult<Rate> {
        Ok(self.lookup(year)?.1)
    }

    pub fn first_year(&self) -> Option<i32> {
        self.values.keys().next().copied()
    }
}

/// One band of a marginal tax schedule: `rate` applies to income above `over`
/// up to the next band's threshold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bracket {
    pub over: Money,
    pub rate: Rate,
}

/// Walk a marginal bracket schedule. `brackets` must be sorted ascending by
/// threshold with the first threshold at zero.
pub fn marginal_tax(taxable: Money, brackets: &[Bracket]) -> Money {
    if taxable <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let mut tax = Decimal::ZERO;
    for (idx, bracket) in brackets.iter().enumerate() {
        if taxable <= bracket.over {
            break;
        }
        let upper = brackets
            .get(idx + 1)
            .map(|b| b.over)
            .unwrap_or(taxable)
            .min(taxable);
        tax += (upper - bracket.over) * bracket.rate;
    }
    tax
}

/// Inflation-index every threshold of a bracket schedule `years_past` years
/// beyond its base year. Rates are untouched.
pub fn index_brackets(brackets: &[Bracket], inflation: Rate, years_past: u32) -> Vec<Bracket> {
    if years_past == 0 {
        return brackets.to_vec();
    }
    let factor = compound(inflation, years_past);
    brackets
        .iter()
        .map(|b| Bracket {
            over: b.over * factor,
            rate: b.rate,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn series() -> YearSeries {
        YearSeries::new(
            "social security wage base",
            &[(2023, dec!(160200)), (2024, dec!(168600)), (2025, dec!(176100))],
        )
    }

    #[test]
    fn test_amount_within_range() {
        let s = series();
        assert_eq!(s.amount_for(2024, dec!(0.02)).unwrap(), dec!(168600));
    }

    #[test]
    fn test_amount_gap_indexes_from_latest_earlier_year() {
        let s = YearSeries::new("x", &[(2020, dec!(100)), (2024, dec!(140))]);
        // 2022 is absent: 100 indexed forward two years.
        assert_eq!(
            s.amount_for(2022, dec!(0.02)).unwrap(),
            dec!(100) * dec!(1.02) * dec!(1.02)
        );
        assert_eq!(s.amount_for(2024, dec!(0.02)).unwrap(), dec!(140));
    }

    #[test]
    fn test_amount_extrapolates_with_inflation() {
        let s = series();
        let v = s.amount_for(2027, dec!(0.02)).unwrap();
        // 176100 * 1.02^2
        assert_eq!(v, dec!(176100) * dec!(1.02) * dec!(1.02));
    }

    #[test]
    fn test_rate_carries_forward() {
        let s = YearSeries::new("rate", &[(2024, dec!(0.062))]);
        assert_eq!(s.rate_for(2060).unwrap(), dec!(0.062));
    }

    #[test]
    fn test_year_before_horizon_is_config_error() {
        let err = series().amount_for(2001, dec!(0.02)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("2001"), "got: {msg}");
        assert!(msg.contains("2023"), "got: {msg}");
    }

    #[test]
    fn test_marginal_tax_walk() {
        let brackets = [
            Bracket { over: dec!(0), rate: dec!(0.10) },
            Bracket { over: dec!(10000), rate: dec!(0.20) },
            Bracket { over: dec!(50000), rate: dec!(0.30) },
        ];
        assert_eq!(marginal_tax(dec!(-5), &brackets), dec!(0));
        assert_eq!(marginal_tax(dec!(10000), &brackets), dec!(1000));
        // 1000 + 40000*0.2 + 10000*0.3 = 12000
        assert_eq!(marginal_tax(dec!(60000), &brackets), dec!(12000.0));
    }

    #[test]
    fn test_marginal_tax_is_monotone_and_sub_linear() {
        let brackets = [
            Bracket { over: dec!(0), rate: dec!(0.10) },
            Bracket { over: dec!(20000), rate: dec!(0.40) },
        ];
        let mut prev = Decimal::ZERO;
        let mut prev_income = Decimal::ZERO;
        for income in [dec!(0), dec!(5000), dec!(20000), dec!(20001), dec!(90000)] {
            let tax = marginal_tax(income, &brackets);
            assert!(tax >= prev);
            assert!(tax - prev <= income - prev_income);
            prev = tax;
            prev_income = income;
        }
    }
}
