use serde_json::Value;

use super::format_value;

/// One line per country: the monthly pension in native currency, plus the
/// converted figure when the report carries one.
pub fn print_minimal(value: &Value) {
    let Some(countries) = super::countries(value) else {
        println!("{}", format_value(value));
        return;
    };
    for country in countries {
        let code = country
            .get("code")
            .map(format_value)
            .unwrap_or_default();
        let result = country.get("result").unwrap_or(&Value::Null);
        let currency = result.get("currency").map(format_value).unwrap_or_default();
        let monthly = result
            .get("monthly_pension")
            .map(format_value)
            .unwrap_or_default();
        match country.get("converted") {
            Some(converted) if !converted.is_null() => {
                let display = converted
                    .get("currency")
                    .map(format_value)
                    .unwrap_or_default();
                let converted_monthly = converted
                    .get("monthly_pension")
                    .map(format_value)
                    .unwrap_or_default();
                println!("{code} {monthly} {currency} ({converted_monthly} {display})");
            }
            _ => println!("{code} {monthly} {currency}"),
        }
    }
}
