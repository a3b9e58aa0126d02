pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Headline columns shared by the table, CSV and minimal renderers.
pub const HEADLINE_FIELDS: [&str; 8] = [
    "retirement_age",
    "monthly_pension",
    "employee_contributions",
    "total_contributions",
    "total_benefits",
    "roi",
    "irr",
    "payback_age",
];

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The per-country rows of a report value, if it has any.
pub(crate) fn countries(value: &Value) -> Option<&Vec<Value>> {
    value.get("countries")?.as_array()
}

pub(crate) fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
