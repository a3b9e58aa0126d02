use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::PensionSimError;
use crate::types::{Currency, Money};
use crate::PensionSimResult;

pub const CACHE_VERSION: &str = "1.0";

/// A daily table of exchange rates expressed as units of each currency per
/// one unit of the base currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateTable {
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,
    pub api_source: String,
    pub base_currency: Currency,
    pub cache_version: String,
    pub expires_at: NaiveDate,
    pub rates: BTreeMap<Currency, Decimal>,
}

impl RateTable {
    pub fn new(
        date: NaiveDate,
        api_source: &str,
        base_currency: Currency,
        rates: BTreeMap<Currency, Decimal>,
    ) -> Self {
        RateTable {
            date,
            timestamp: Utc::now(),
            api_source: api_source.to_string(),
            base_currency,
            cache_version: CACHE_VERSION.to_string(),
            expires_at: date.checked_add_days(Days::new(1)).unwrap_or(date),
            rates,
        }
    }

    /// A table is sane when the base currency maps to exactly 1.0 and every
    /// rate is strictly positive.
    pub fn is_sane(&self) -> bool {
        self.rates.get(&self.base_currency) == Some(&Decimal::ONE)
            && self.rates.values().all(|r| *r > Decimal::ZERO)
    }

    pub fn rate(&self, currency: Currency) -> PensionSimResult<Decimal> {
        self.rates
            .get(&currency)
            .copied()
            .ok_or_else(|| PensionSimError::UnknownCurrency {
                code: currency.code().to_string(),
                suggestion: None,
            })
    }

    /// `amount · rate(to) / rate(from)`. Same-currency conversion is exact
    /// identity.
    pub fn convert(&self, amount: Money, from: Currency, to: Currency) -> PensionSimResult<Money> {
        if from == to {
            return Ok(amount);
        }
        let from_rate = self.rate(from)?;
        let to_rate = self.rate(to)?;
        Ok(amount * to_rate / from_rate)
    }
}

/// Hard-coded fallback rates, used when the cache is stale and every fetcher
/// fails. Snapshot of mid-January 2025, base CNY.
pub fn default_rates() -> RateTable {
    let date = NaiveDate::from_ymd_opt(2025, 1, 15).expect("valid baked-in date");
    let rates: BTreeMap<Currency, Decimal> = [
        (Currency::CNY, dec!(1.0)),
        (Currency::USD, dec!(0.1392)),
        (Currency::EUR, dec!(0.1280)),
        (Currency::GBP, dec!(0.1106)),
        (Currency::JPY, dec!(21.64)),
        (Currency::HKD, dec!(1.0845)),
        (Currency::SGD, dec!(0.1866)),
        (Currency::AUD, dec!(0.2147)),
        (Currency::CAD, dec!(0.1925)),
        (Currency::TWD, dec!(4.52)),
        (Currency::NOK, dec!(1.52)),
        (Currency::SEK, dec!(1.49)),
        (Currency::DKK, dec!(0.955)),
        (Currency::CHF, dec!(0.1216)),
        (Currency::INR, dec!(11.77)),
        (Currency::KRW, dec!(196.40)),
        (Currency::RUB, dec!(13.71)),
        (Currency::BRL, dec!(0.788)),
    ]
    .into_iter()
    .collect();

    let mut table = RateTable::new(date, "default", Currency::CNY, rates);
    table.timestamp = date
        .and_hms_opt(0, 0, 0)
        .expect("valid baked-in timestamp")
        .and_utc();
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_table_is_sane_and_complete() {
        let table = default_rates();
        assert!(table.is_sane());
        assert_eq!(table.api_source, "default");
        assert_eq!(table.rates.len(), Currency::ALL.len());
        for currency in Currency::ALL {
            assert!(table.rate(currency).is_ok());
        }
    }

    #[test]
    fn test_convert_identity() {
        let table = default_rates();
        assert_eq!(
            table.convert(dec!(123.45), Currency::USD, Currency::USD).unwrap(),
            dec!(123.45)
        );
    }

    #[test]
    fn test_convert_cross_rate() {
        let table = default_rates();
        // 10000 CNY -> USD at the baked-in rate.
        let usd = table
            .convert(dec!(10000), Currency::CNY, Currency::USD)
            .unwrap();
        assert_eq!(usd, dec!(1392.0000));
        // And back again.
        let cny = table.convert(usd, Currency::USD, Currency::CNY).unwrap();
        assert!((cny - dec!(10000)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_insane_tables_detected() {
        let mut table = default_rates();
        table.rates.insert(Currency::CNY, dec!(2.0));
        assert!(!table.is_sane());

        let mut table = default_rates();
        table.rates.insert(Currency::USD, dec!(-1.0));
        assert!(!table.is_sane());
    }

    #[test]
    fn test_cache_schema_round_trip() {
        let table = default_rates();
        let json = serde_json::to_string_pretty(&table).unwrap();
        assert!(json.contains("\"date\": \"2025-01-15\""));
        assert!(json.contains("\"cache_version\": \"1.0\""));
        assert!(json.contains("\"expires_at\": \"2025-01-16\""));
        assert!(json.contains("\"base_currency\": \"CNY\""));
        let back: RateTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back.rates, table.rates);
        assert_eq!(back.date, table.date);
    }
}
