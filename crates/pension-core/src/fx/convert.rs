use chrono::{Local, NaiveDate};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fx::fetch::{ExchangeRateApi, ExchangeRatesApi, RateFetcher};
use crate::fx::rates::{default_rates, RateTable};
use crate::types::{Currency, CurrencyAmount, Money};
use crate::PensionSimResult;

pub const DEFAULT_CACHE_PATH: &str = "cache/exchange_rates.json";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct FxConfig {
    pub cache_path: PathBuf,
    pub timeout: Duration,
    pub base: Currency,
}

impl Default for FxConfig {
    fn default() -> Self {
        FxConfig {
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            timeout: DEFAULT_FETCH_TIMEOUT,
            base: Currency::CNY,
        }
    }
}

/// The live fetcher chain, tried in order after a cache miss.
pub fn default_fetchers(timeout: Duration) -> Vec<Box<dyn RateFetcher>> {
    vec![
        Box::new(ExchangeRateApi::new(timeout)),
        Box::new(ExchangeRatesApi::new(timeout)),
    ]
}

/// Currency converter over one day's rate table.
///
/// Loading never fails: a same-day cache file wins, then the fetcher chain in
/// order, then the baked-in default table.
pub struct CurrencyConverter {
    table: RateTable,
}

impl CurrencyConverter {
    pub fn from_table(table: RateTable) -> Self {
        CurrencyConverter { table }
    }

    pub fn load(config: &FxConfig, fetchers: &[Box<dyn RateFetcher>]) -> Self {
        Self::load_for_date(config, fetchers, Local::now().date_naive())
    }

    pub fn load_for_date(
        config: &FxConfig,
        fetchers: &[Box<dyn RateFetcher>],
        today: NaiveDate,
    ) -> Self {
        if let Some(table) = read_cache(&config.cache_path, config.base, today) {
            info!(
                "using cached exchange rates for {} from {}",
                table.date, table.api_source
            );
            return CurrencyConverter { table };
        }

        for fetcher in fetchers {
            match fetcher.fetch(config.base) {
                Ok(table) if table.is_sane() => {
                    info!("fetched exchange rates from {}", fetcher.name());
                    write_cache(&config.cache_path, &table);
                    return CurrencyConverter { table };
                }
                Ok(_) => warn!("{} returned an inconsistent rate table", fetcher.name()),
                Err(e) => warn!("{e}"),
            }
        }

        info!("all rate sources failed; using built-in default rates");
        CurrencyConverter {
            table: default_rates(),
        }
    }

    pub fn table(&self) -> &RateTable {
        &self.table
    }

    pub fn source(&self) -> &str {
        &self.table.api_source
    }

    pub fn convert(&self, amount: Money, from: Currency, to: Currency) -> PensionSimResult<Money> {
        self.table.convert(amount, from, to)
    }

    pub fn convert_amount(
        &self,
        amount: &CurrencyAmount,
        to: Currency,
    ) -> PensionSimResult<CurrencyAmount> {
        Ok(CurrencyAmount::new(
            self.convert(amount.amount, amount.currency, to)?,
            to,
        ))
    }
}

/// Whole-file read + parse; the table must be dated today, sane, and on the
/// expected base. Anything else is ignored and regenerated.
fn read_cache(path: &Path, base: Currency, today: NaiveDate) -> Option<RateTable> {
    let contents = fs::read_to_string(path).ok()?;
    let table: RateTable = match serde_json::from_str(&contents) {
        Ok(table) => table,
        Err(e) => {
            warn!("ignoring unreadable rate cache {}: {e}", path.display());
            return None;
        }
    };
    if table.date != today {
        debug!(
            "rate cache dated {} is stale (today is {today})",
            table.date
        );
        return None;
    }
    if table.base_currency != base || !table.is_sane() {
        warn!("ignoring inconsistent rate cache {}", path.display());
        return None;
    }
    Some(table)
}

/// Atomic replace: write a sibling temp file, then rename over the target so
/// concurrent readers never observe a partial file. Failure is non-fatal.
fn write_cache(path: &Path, table: &RateTable) {
    let result = (|| -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(table)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        fs::write(&tmp, body)?;
        fs::rename(&tmp, path)
    })();
    match result {
        Ok(()) => debug!("wrote rate cache {}", path.display()),
        Err(e) => warn!("failed to write rate cache {}: {e}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PensionSimError;
    use crate::fx::fetch::StaticRates;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    struct FailingFetcher;

    impl RateFetcher for FailingFetcher {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn fetch(&self, _base: Currency) -> PensionSimResult<RateTable> {
            Err(PensionSimError::Fetch {
                src: "failing".into(),
                reason: "network off".into(),
            })
        }
    }

    fn scratch_config(tag: &str) -> FxConfig {
        let dir = std::env::temp_dir().join(format!("pensim-fx-{}-{tag}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        FxConfig {
            cache_path: dir.join("exchange_rates.json"),
            timeout: Duration::from_millis(10),
            base: Currency::CNY,
        }
    }

    #[test]
    fn test_all_fetchers_fail_falls_back_to_defaults() {
        let config = scratch_config("fallback");
        let fetchers: Vec<Box<dyn RateFetcher>> = vec![Box::new(FailingFetcher)];
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let converter = CurrencyConverter::load_for_date(&config, &fetchers, today);
        assert_eq!(converter.source(), "default");
        // Deterministic conversion from the baked-in table.
        let usd = converter
            .convert(dec!(10000), Currency::CNY, Currency::USD)
            .unwrap();
        assert_eq!(usd, dec!(1392.0000));
    }

    #[test]
    fn test_successful_fetch_writes_cache_and_is_reused() {
        let config = scratch_config("write");
        let today = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let mut fresh = default_rates();
        fresh.date = today;
        fresh.api_source = "mock".into();

        let fetchers: Vec<Box<dyn RateFetcher>> = vec![Box::new(StaticRates::new(fresh))];
        let converter = CurrencyConverter::load_for_date(&config, &fetchers, today);
        assert_eq!(converter.source(), "mock");
        assert!(config.cache_path.exists());

        // Second load must come straight from the cache, not the chain.
        let failing: Vec<Box<dyn RateFetcher>> = vec![Box::new(FailingFetcher)];
        let cached = CurrencyConverter::load_for_date(&config, &failing, today);
        assert_eq!(cached.source(), "mock");
        assert_eq!(cached.table().date, today);

        let _ = fs::remove_dir_all(config.cache_path.parent().unwrap());
    }

    #[test]
    fn test_stale_cache_triggers_refetch() {
        let config = scratch_config("stale");
        let yesterday = NaiveDate::from_ymd_opt(2025, 6, 3).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 6, 4).unwrap();

        let mut stale = default_rates();
        stale.date = yesterday;
        write_cache(&config.cache_path, &stale);

        let mut fresh = default_rates();
        fresh.date = today;
        fresh.api_source = "mock".into();
        let fetchers: Vec<Box<dyn RateFetcher>> = vec![Box::new(StaticRates::new(fresh))];

        let converter = CurrencyConverter::load_for_date(&config, &fetchers, today);
        assert_eq!(converter.source(), "mock");
        assert_eq!(converter.table().date, today);

        let _ = fs::remove_dir_all(config.cache_path.parent().unwrap());
    }

    #[test]
    fn test_corrupt_cache_is_ignored() {
        let config = scratch_config("corrupt");
        fs::create_dir_all(config.cache_path.parent().unwrap()).unwrap();
        fs::write(&config.cache_path, "{ not json").unwrap();

        let today = NaiveDate::from_ymd_opt(2025, 6, 5).unwrap();
        let fetchers: Vec<Box<dyn RateFetcher>> = vec![Box::new(FailingFetcher)];
        let converter = CurrencyConverter::load_for_date(&config, &fetchers, today);
        assert_eq!(converter.source(), "default");

        let _ = fs::remove_dir_all(config.cache_path.parent().unwrap());
    }

    #[test]
    fn test_convert_amount_wraps_currency() {
        let converter = CurrencyConverter::from_table(default_rates());
        let salary = CurrencyAmount::new(dec!(10000), Currency::CNY);
        let converted = converter.convert_amount(&salary, Currency::SGD).unwrap();
        assert_eq!(converted.currency, Currency::SGD);
        assert_eq!(converted.amount, dec!(1866.0000));
    }
}
