use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PensionSimError;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Supported currency codes. The set is closed: anything else is rejected at
/// parse time with a nearest-code suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum Currency {
    CNY,
    USD,
    EUR,
    GBP,
    JPY,
    HKD,
    SGD,
    AUD,
    CAD,
    TWD,
    NOK,
    SEK,
    DKK,
    CHF,
    INR,
    KRW,
    RUB,
    BRL,
}

impl Currency {
    pub const ALL: [Currency; 18] = [
        Currency::CNY,
        Currency::USD,
        Currency::EUR,
        Currency::GBP,
        Currency::JPY,
        Currency::HKD,
        Currency::SGD,
        Currency::AUD,
        Currency::CAD,
        Currency::TWD,
        Currency::NOK,
        Currency::SEK,
        Currency::DKK,
        Currency::CHF,
        Currency::INR,
        Currency::KRW,
        Currency::RUB,
        Currency::BRL,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::CNY => "CNY",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
            Currency::HKD => "HKD",
            Currency::SGD => "SGD",
            Currency::AUD => "AUD",
            Currency::CAD => "CAD",
            Currency::TWD => "TWD",
            Currency::NOK => "NOK",
            Currency::SEK => "SEK",
            Currency::DKK => "DKK",
            Currency::CHF => "CHF",
            Currency::INR => "INR",
            Currency::KRW => "KRW",
            Currency::RUB => "RUB",
            Currency::BRL => "BRL",
        }
    }

    /// Case-insensitive lookup without the suggestion machinery.
    pub fn from_code(code: &str) -> Option<Currency> {
        let upper = code.to_ascii_uppercase();
        Currency::ALL.iter().copied().find(|c| c.code() == upper)
    }

    /// Nearest supported code within Levenshtein distance 1, if any.
    pub fn suggest(code: &str) -> Option<Currency> {
        let upper = code.to_ascii_uppercase();
        Currency::ALL
            .iter()
            .copied()
            .find(|c| levenshtein(c.code(), &upper) <= 1)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = PensionSimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::from_code(s).ok_or_else(|| PensionSimError::UnknownCurrency {
            code: s.to_string(),
            suggestion: Currency::suggest(s).map(|c| c.code().to_string()),
        })
    }
}

/// An amount tagged with its currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrencyAmount {
    pub amount: Money,
    pub currency: Currency,
}

impl CurrencyAmount {
    pub fn new(amount: Money, currency: Currency) -> Self {
        CurrencyAmount { amount, currency }
    }
}

impl fmt::Display for CurrencyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.currency.code(), self.amount)
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
