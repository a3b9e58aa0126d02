use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::PensionSimError;
use crate::types::{Currency, CurrencyAmount};
use crate::PensionSimResult;

/// Currency symbols, longest first so "S$" wins over "$".
/// Half-width "¥" is the base-currency yuan; full-width "￥" is the yen.
const SYMBOLS: &[(&str, Currency)] = &[
    ("HK$", Currency::HKD),
    ("NT$", Currency::TWD),
    ("S$", Currency::SGD),
    ("￥", Currency::JPY),
    ("¥", Currency::CNY),
    ("$", Currency::USD),
    ("€", Currency::EUR),
    ("£", Currency::GBP),
];

/// Parse a salary-amount string: `cny10000`, `10000usd`, `S$8,000`, `¥12 000`
/// or bare digits (interpreted as the default base currency, CNY).
/// Whitespace and thousands commas are ignored; code matching is
/// case-insensitive.
pub fn parse_amount(input: &str) -> PensionSimResult<CurrencyAmount> {
    let compact: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    if compact.is_empty() {
        return Err(PensionSimError::Parse {
            input: input.to_string(),
            reason: "empty amount".into(),
        });
    }

    let upper = compact.to_uppercase();
    for (symbol, currency) in SYMBOLS {
        let symbol_upper = symbol.to_uppercase();
        if let Some(rest) = upper.strip_prefix(&symbol_upper) {
            return Ok(CurrencyAmount::new(
                parse_number(input, rest)?,
                *currency,
            ));
        }
    }

    let leading: String = upper.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let trailing: String = upper
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    if !leading.is_empty() && leading.len() + trailing.len() >= upper.len() {
        // Letters only, no digits anywhere.
        return Err(PensionSimError::Parse {
            input: input.to_string(),
            reason: "no numeric part".into(),
        });
    }

    if !leading.is_empty() && !trailing.is_empty() {
        return Err(PensionSimError::Parse {
            input: input.to_string(),
            reason: "currency code may appear on one side only".into(),
        });
    }

    if !leading.is_empty() {
        let currency = Currency::from_str(&leading)?;
        let amount = parse_number(input, &upper[leading.len()..])?;
        return Ok(CurrencyAmount::new(amount, currency));
    }

    if !trailing.is_empty() {
        let currency = Currency::from_str(&trailing)?;
        let amount = parse_number(input, &upper[..upper.len() - trailing.len()])?;
        return Ok(CurrencyAmount::new(amount, currency));
    }

    Ok(CurrencyAmount::new(
        parse_number(input, &upper)?,
        Currency::CNY,
    ))
}

fn parse_number(original: &str, digits: &str) -> PensionSimResult<Decimal> {
    let amount = Decimal::from_str(digits).map_err(|_| PensionSimError::Parse {
        input: original.to_string(),
        reason: format!("'{digits}' is not a number"),
    })?;
    if amount < Decimal::ZERO {
        return Err(PensionSimError::Parse {
            input: original.to_string(),
            reason: "amount must be non-negative".into(),
        });
    }
    Ok(amount)
}
