pub mod convert;
pub mod fetch;
pub mod parse;
pub mod rates;

pub use convert::{default_fetchers, CurrencyConverter, FxConfig};
pub use fetch::RateFetcher;
pub use parse::parse_amount;
pub use rates::{default_rates, RateTable, CACHE_VERSION};
