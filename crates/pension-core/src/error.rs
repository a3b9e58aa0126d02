use thiserror::Error;

#[derive(Debug, Error)]
pub enum PensionSimError {
    #[error("Cannot parse amount '{input}': {reason}")]
    Parse { input: String, reason: String },

    #[error("Unknown currency code '{code}'{}", .suggestion.as_deref().map(|s| format!(" — did you mean '{s}'?")).unwrap_or_default())]
    UnknownCurrency {
        code: String,
        suggestion: Option<String>,
    },

    #[error("Unknown country code '{code}' (available: {})", .available.join(", "))]
    UnknownCountry {
        code: String,
        available: Vec<String>,
    },

    #[error("Calculator for '{code}' is already registered")]
    DuplicateRegistration { code: String },

    #[error("Invalid profile: {field} — {reason}")]
    InvalidProfile { field: String, reason: String },

    #[error("Rate fetch from {src} failed: {reason}")]
    Fetch { src: String, reason: String },

    #[error("Missing {what} for year {year}{}", .nearest.map(|y| format!(" (nearest year present: {y})")).unwrap_or_default())]
    Config {
        what: String,
        year: i32,
        nearest: Option<i32>,
    },

    #[error("Arithmetic overflow in {context}")]
    Overflow { context: String },
}

impl PensionSimError {
    pub fn invalid_profile(field: &str, reason: impl Into<String>) -> Self {
        PensionSimError::InvalidProfile {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
