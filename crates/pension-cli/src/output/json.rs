use serde_json::Value;

use super::format_value;

/// The canonical machine-readable view: the report value pretty-printed
/// unmodified, ledgers and converted blocks included.
pub fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(body) => println!("{body}"),
        Err(e) => {
            // Re-serializing an already-parsed Value should not fail; if it
            // ever does, degrade to the flat per-country rendering the other
            // formatters share rather than printing nothing.
            eprintln!("cannot render report as JSON: {e}");
            match super::countries(value) {
                Some(countries) => {
                    for country in countries {
                        println!("{}", format_value(country));
                    }
                }
                None => println!("{}", format_value(value)),
            }
        }
    }
}
