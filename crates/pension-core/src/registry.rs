use log::debug;
use std::collections::BTreeMap;

use crate::calc::{Calculator, China, Japan, Singapore, Taiwan, Uk, Usa};
use crate::error::PensionSimError;
use crate::PensionSimResult;

/// Process-lifetime mapping from country code to calculator. Populated once
/// at startup and immutable afterwards; codes are case-insensitive.
#[derive(Default)]
pub struct Registry {
    calculators: BTreeMap<String, Box<dyn Calculator>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// All built-in jurisdictions.
    pub fn with_defaults() -> Self {
        let mut registry = Registry::new();
        for calculator in [
            Box::new(China::default()) as Box<dyn Calculator>,
            Box::new(Usa::default()),
            Box::new(Singapore::default()),
            Box::new(Taiwan::default()),
            Box::new(Japan::default()),
            Box::new(Uk::default()),
        ] {
            registry
                .register(calculator)
                .expect("built-in codes are unique");
        }
        registry
    }

    pub fn register(&mut self, calculator: Box<dyn Calculator>) -> PensionSimResult<()> {
        let code = calculator.country_code().to_uppercase();
        if self.calculators.contains_key(&code) {
            return Err(PensionSimError::DuplicateRegistration { code });
        }
        debug!("registered calculator {code}");
        self.calculators.insert(code, calculator);
        Ok(())
    }

    pub fn get(&self, code: &str) -> PensionSimResult<&dyn Calculator> {
        let upper = code.trim().to_uppercase();
        self.calculators
            .get(&upper)
            .map(|c| c.as_ref())
            .ok_or_else(|| PensionSimError::UnknownCountry {
                code: code.trim().to_string(),
                available: self.codes(),
            })
    }

    pub fn codes(&self) -> Vec<String> {
        self.calculators.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.calculators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calculators.is_empty()
    }
}
