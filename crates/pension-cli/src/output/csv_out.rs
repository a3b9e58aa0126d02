use serde_json::Value;
use std::io;

use super::{format_value, HEADLINE_FIELDS};

/// Write the per-country headline rows as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let Some(countries) = super::countries(value) else {
        let _ = wtr.write_record([format_value(value)]);
        let _ = wtr.flush();
        return;
    };

    let mut header = vec!["country".to_string(), "currency".to_string()];
    header.extend(HEADLINE_FIELDS.iter().map(|f| f.to_string()));
    header.extend([
        "converted_currency".to_string(),
        "converted_monthly_pension".to_string(),
    ]);
    let _ = wtr.write_record(&header);

    for country in countries {
        let result = country.get("result").unwrap_or(&Value::Null);
        let mut row = vec![
            country.get("code").map(format_value).unwrap_or_default(),
            result.get("currency").map(format_value).unwrap_or_default(),
        ];
        for field in HEADLINE_FIELDS {
            row.push(
                result
                    .get(field)
                    .map(csv_cell)
                    .unwrap_or_default(),
            );
        }
        match country.get("converted") {
            Some(converted) if !converted.is_null() => {
                row.push(converted.get("currency").map(format_value).unwrap_or_default());
                row.push(
                    converted
                        .get("monthly_pension")
                        .map(csv_cell)
                        .unwrap_or_default(),
                );
            }
            _ => {
                row.push(String::new());
                row.push(String::new());
            }
        }
        let _ = wtr.write_record(&row);
    }

    let _ = wtr.flush();
}

fn csv_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => format_value(other),
    }
}
