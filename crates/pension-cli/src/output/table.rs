use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{format_value, HEADLINE_FIELDS};

/// Render a comparison table: one row per country over the headline fields,
/// and a second table for the converted block when present.
pub fn print_table(value: &Value) {
    let Some(countries) = super::countries(value) else {
        print_flat_object(value);
        return;
    };

    let mut builder = Builder::default();
    let mut header = vec!["country".to_string(), "currency".to_string()];
    header.extend(HEADLINE_FIELDS.iter().map(|f| f.to_string()));
    builder.push_record(header);

    for country in countries {
        let result = country.get("result").unwrap_or(&Value::Null);
        let mut row = vec![
            country.get("code").map(format_value).unwrap_or_default(),
            result.get("currency").map(format_value).unwrap_or_default(),
        ];
        for field in HEADLINE_FIELDS {
            row.push(result.get(field).map(format_value).unwrap_or_default());
        }
        builder.push_record(row);
    }
    println!("{}", Table::from(builder));

    let converted_rows: Vec<&Value> = countries
        .iter()
        .filter(|c| c.get("converted").is_some_and(|v| !v.is_null()))
        .collect();
    if converted_rows.is_empty() {
        return;
    }

    let display = value
        .get("display_currency")
        .map(format_value)
        .unwrap_or_default();
    println!("\nConverted to {display}:");
    let mut builder = Builder::default();
    builder.push_record([
        "country",
        "monthly_pension",
        "total_contributions",
        "total_benefits",
    ]);
    for country in converted_rows {
        let converted = &country["converted"];
        builder.push_record([
            country.get("code").map(format_value).unwrap_or_default(),
            converted
                .get("monthly_pension")
                .map(format_value)
                .unwrap_or_default(),
            converted
                .get("total_contributions")
                .map(format_value)
                .unwrap_or_default(),
            converted
                .get("total_benefits")
                .map(format_value)
                .unwrap_or_default(),
        ]);
    }
    println!("{}", Table::from(builder));
}

fn print_flat_object(value: &Value) {
    let Value::Object(map) = value else {
        println!("{}", format_value(value));
        return;
    };
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}
