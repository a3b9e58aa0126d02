use chrono::Local;
use log::debug;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::PensionSimError;
use crate::fx::rates::RateTable;
use crate::types::Currency;
use crate::PensionSimResult;

/// A source of a full daily rate map keyed by the configured base currency.
pub trait RateFetcher {
    fn name(&self) -> &'static str;
    fn fetch(&self, base: Currency) -> PensionSimResult<RateTable>;
}

#[derive(Deserialize)]
struct ApiRates {
    rates: BTreeMap<String, Decimal>,
}

/// Keep only supported codes, force the base to 1.0, and wrap into a dated
/// table. Fails when the response covers too little of the supported set.
fn table_from_response(
    source: &'static str,
    base: Currency,
    raw: BTreeMap<String, Decimal>,
) -> PensionSimResult<RateTable> {
    let mut rates: BTreeMap<Currency, Decimal> = BTreeMap::new();
    for (code, rate) in raw {
        if let Some(currency) = Currency::from_code(&code) {
            if rate > Decimal::ZERO {
                rates.insert(currency, rate);
            }
        }
    }
    rates.insert(base, Decimal::ONE);
    if rates.len() < Currency::ALL.len() / 2 {
        return Err(PensionSimError::Fetch {
            src: source.to_string(),
            reason: format!("response covered only {} supported currencies", rates.len()),
        });
    }
    let table = RateTable::new(Local::now().date_naive(), source, base, rates);
    debug!(
        "fetched {} rates from {} for {}",
        table.rates.len(),
        source,
        table.date
    );
    Ok(table)
}

fn http_get_rates(
    source: &'static str,
    url: &str,
    timeout: Duration,
) -> PensionSimResult<BTreeMap<String, Decimal>> {
    let wrap = |reason: String| PensionSimError::Fetch {
        src: source.to_string(),
        reason,
    };
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| wrap(e.to_string()))?;
    let response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| wrap(e.to_string()))?;
    let body: ApiRates = response.json().map_err(|e| wrap(e.to_string()))?;
    Ok(body.rates)
}

/// exchangerate-api.com `latest` endpoint.
pub struct ExchangeRateApi {
    timeout: Duration,
}

impl ExchangeRateApi {
    pub fn new(timeout: Duration) -> Self {
        ExchangeRateApi { timeout }
    }
}

impl RateFetcher for ExchangeRateApi {
    fn name(&self) -> &'static str {
        "exchangerate-api"
    }

    fn fetch(&self, base: Currency) -> PensionSimResult<RateTable> {
        let url = format!("https://api.exchangerate-api.com/v4/latest/{}", base.code());
        let raw = http_get_rates(self.name(), &url, self.timeout)?;
        table_from_response(self.name(), base, raw)
    }
}

/// exchangeratesapi.io `latest` endpoint.
pub struct ExchangeRatesApi {
    timeout: Duration,
}

impl ExchangeRatesApi {
    pub fn new(timeout: Duration) -> Self {
        ExchangeRatesApi { timeout }
    }
}

impl RateFetcher for ExchangeRatesApi {
    fn name(&self) -> &'static str {
        "exchangeratesapi"
    }

    fn fetch(&self, base: Currency) -> PensionSimResult<RateTable> {
        let url = format!("https://api.exchangeratesapi.io/latest?base={}", base.code());
        let raw = http_get_rates(self.name(), &url, self.timeout)?;
        table_from_response(self.name(), base, raw)
    }
}

/// Serves a pre-built table. The "mock" source for offline runs and tests.
pub struct StaticRates {
    table: RateTable,
}

impl StaticRates {
    pub fn new(table: RateTable) -> Self {
        StaticRates { table }
    }
}

impl RateFetcher for StaticRates {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn fetch(&self, base: Currency) -> PensionSimResult<RateTable> {
        if self.table.base_currency != base {
            return Err(PensionSimError::Fetch {
                src: self.name().to_string(),
                reason: format!(
                    "table base {} does not match requested {}",
                    self.table.base_currency, base
                ),
            });
        }
        Ok(self.table.clone())
    }
}
