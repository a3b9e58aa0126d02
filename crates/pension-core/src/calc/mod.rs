pub mod china;
pub mod japan;
pub mod singapore;
pub mod taiwan;
pub mod uk;
pub mod usa;

use crate::model::{EconomicFactors, PensionResult, Person, SalaryProfile, YearLedgerEntry};
use crate::types::Currency;
use crate::PensionSimResult;

/// The capability set every jurisdiction implements. Outputs are in the
/// jurisdiction's native currency; conversion happens in the analysis runner.
pub trait Calculator: std::fmt::Debug {
    fn country_code(&self) -> &'static str;
    fn currency(&self) -> Currency;
    fn retirement_age(&self, person: &Person) -> u32;

    fn annual_ledger(
        &self,
        person: &Person,
        salary: &SalaryProfile,
        econ: &EconomicFactors,
    ) -> PensionSimResult<Vec<YearLedgerEntry>>;

    fn calculate(
        &self,
        person: &Person,
        salary: &SalaryProfile,
        econ: &EconomicFactors,
    ) -> PensionSimResult<PensionResult>;
}

pub use china::China;
pub use japan::Japan;
pub use singapore::Singapore;
pub use taiwan::Taiwan;
pub use uk::Uk;
pub use usa::Usa;

pub(crate) fn effective_retirement_age(statutory: u32, econ: &EconomicFactors) -> u32 {
    econ.retirement_age_override.unwrap_or(statutory)
}

/// Working span common to every calculator: contribution start age up to (but
/// not including) the retirement age.
pub(crate) fn working_span(
    salary: &SalaryProfile,
    retirement_age: u32,
) -> PensionSimResult<std::ops::Range<u32>> {
    if salary.contribution_start_age >= retirement_age {
        return Err(crate::error::PensionSimError::invalid_profile(
            "contribution_start_age",
            format!(
                "must be below the retirement age {retirement_age} (got {})",
                salary.contribution_start_age
            ),
        ));
    }
    Ok(salary.contribution_start_age..retirement_age)
}
