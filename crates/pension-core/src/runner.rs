use chrono::{Datelike, Local};
use log::info;
use rust_decimal::RoundingStrategy;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::fx::CurrencyConverter;
use crate::model::{
    EconomicFactors, Employment, Gender, PensionResult, Person, SalaryProfile,
    DEFAULT_TERMINAL_AGE,
};
use crate::registry::Registry;
use crate::types::{Currency, CurrencyAmount, Money, Rate};
use crate::PensionSimResult;

/// Everything the runner needs besides the salary amount and the code set.
/// `contribution_start_age` has no default on purpose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub current_age: u32,
    pub gender: Gender,
    pub employment: Employment,
    pub contribution_start_age: u32,
    pub annual_growth: Rate,
    pub display_currency: Currency,
    pub inflation: Option<Rate>,
    pub investment_return: Option<Rate>,
    pub ss_return: Option<Rate>,
    pub retirement_age: Option<u32>,
    pub terminal_age: Option<u32>,
    /// Calendar year the simulation starts in; defaults to the current year.
    pub base_year: Option<i32>,
}

impl AnalysisOptions {
    pub fn new(contribution_start_age: u32) -> Self {
        AnalysisOptions {
            current_age: 30,
            gender: Gender::Male,
            employment: Employment::Employee,
            contribution_start_age,
            annual_growth: dec!(0.02),
            display_currency: Currency::CNY,
            inflation: None,
            investment_return: None,
            ss_return: None,
            retirement_age: None,
            terminal_age: None,
            base_year: None,
        }
    }
}

/// Headline numbers restated in the display currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertedHeadline {
    pub currency: Currency,
    pub monthly_pension: Money,
    pub total_contributions: Money,
    pub total_benefits: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryAnalysis {
    pub code: String,
    pub input_monthly_salary: CurrencyAmount,
    pub result: PensionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converted: Option<ConvertedHeadline>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub input_salary: CurrencyAmount,
    pub display_currency: Currency,
    pub rate_source: String,
    pub countries: Vec<CountryAnalysis>,
}

/// Drives registered calculators with a common input and collects the
/// results, converting salaries in and headline numbers out.
pub struct AnalysisRunner<'a> {
    registry: &'a Registry,
    converter: &'a CurrencyConverter,
}

impl<'a> AnalysisRunner<'a> {
    pub fn new(registry: &'a Registry, converter: &'a CurrencyConverter) -> Self {
        AnalysisRunner {
            registry,
            converter,
        }
    }

    pub fn run(
        &self,
        salary: &CurrencyAmount,
        codes: &[String],
        options: &AnalysisOptions,
    ) -> PensionSimResult<AnalysisReport> {
        let base_year = options
            .base_year
            .unwrap_or_else(|| Local::now().year());
        let birth_year = base_year - options.current_age as i32;
        let multi_country = codes.len() > 1;

        let mut countries = Vec::with_capacity(codes.len());
        for code in codes {
            let calculator = self.registry.get(code)?;
            let native = calculator.currency();
            let local_salary = self.converter.convert_amount(salary, native)?;
            info!(
                "running {} with {} (from {})",
                calculator.country_code(),
                local_salary,
                salary
            );

            let person = Person {
                birth_year,
                gender: options.gender,
                employment: options.employment,
                start_work_year: birth_year + options.contribution_start_age as i32,
            };
            let profile = SalaryProfile {
                monthly_salary: local_salary.amount,
                annual_growth: options.annual_growth,
                contribution_start_age: options.contribution_start_age,
            };
            let mut econ = EconomicFactors::with_defaults(native, options.display_currency);
            if let Some(inflation) = options.inflation {
                econ.inflation = inflation;
            }
            if let Some(investment_return) = options.investment_return {
                econ.investment_return = investment_return;
            }
            if let Some(ss_return) = options.ss_return {
                econ.ss_return = ss_return;
            }
            econ.retirement_age_override = options.retirement_age;
            econ.terminal_age = options.terminal_age.unwrap_or(DEFAULT_TERMINAL_AGE);

            let result = calculator.calculate(&person, &profile, &econ)?;
            let converted = if multi_country || options.display_currency != native {
                Some(self.convert_headline(&result, options.display_currency)?)
            } else {
                None
            };

            countries.push(CountryAnalysis {
                code: calculator.country_code().to_string(),
                input_monthly_salary: local_salary,
                result,
                converted,
            });
        }

        Ok(AnalysisReport {
            input_salary: *salary,
            display_currency: options.display_currency,
            rate_source: self.converter.source().to_string(),
            countries,
        })
    }

    fn convert_headline(
        &self,
        result: &PensionResult,
        display: Currency,
    ) -> PensionSimResult<ConvertedHeadline> {
        let round =
            |v: Money| v.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
        let convert = |v: Money| -> PensionSimResult<Money> {
            Ok(round(self.converter.convert(v, result.currency, display)?))
        };
        Ok(ConvertedHeadline {
            currency: display,
            monthly_pension: convert(result.monthly_pension)?,
            total_contributions: convert(result.total_contributions)?,
            total_benefits: convert(result.total_benefits)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::rates::default_rates;
    use pretty_assertions::assert_eq;

    fn runner_fixtures() -> (Registry, CurrencyConverter) {
        (
            Registry::with_defaults(),
            CurrencyConverter::from_table(default_rates()),
        )
    }

    fn options() -> AnalysisOptions {
        let mut o = AnalysisOptions::new(30);
        o.base_year = Some(2025);
        o
    }

    #[test]
    fn test_single_country_native_currency() {
        let (registry, converter) = runner_fixtures();
        let runner = AnalysisRunner::new(&registry, &converter);
        let salary = CurrencyAmount::new(dec!(15000), Currency::CNY);
        let report = runner
            .run(&salary, &["CN".to_string()], &options())
            .unwrap();
        assert_eq!(report.countries.len(), 1);
        let country = &report.countries[0];
        assert_eq!(country.code, "CN");
        // CNY in, CNY display: no conversion block.
        assert!(country.converted.is_none());
        assert_eq!(country.input_monthly_salary.amount, dec!(15000));
    }

    #[test]
    fn test_multi_country_converts_salary_and_headline() {
        let (registry, converter) = runner_fixtures();
        let runner = AnalysisRunner::new(&registry, &converter);
        let salary = CurrencyAmount::new(dec!(20000), Currency::CNY);
        let codes = vec!["CN".to_string(), "US".to_string(), "SG".to_string()];
        let report = runner.run(&salary, &codes, &options()).unwrap();
        assert_eq!(report.countries.len(), 3);

        let us = report.countries.iter().find(|c| c.code == "US").unwrap();
        assert_eq!(us.input_monthly_salary.currency, Currency::USD);
        assert_eq!(us.input_monthly_salary.amount, dec!(20000) * dec!(0.1392));
        assert_eq!(us.result.currency, Currency::USD);

        // Headline block restated in the display currency.
        let converted = us.converted.as_ref().unwrap();
        assert_eq!(converted.currency, Currency::CNY);
        let expected = (us.result.monthly_pension / dec!(0.1392))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
        assert_eq!(converted.monthly_pension, expected);
    }

    #[test]
    fn test_unknown_country_rejected() {
        let (registry, converter) = runner_fixtures();
        let runner = AnalysisRunner::new(&registry, &converter);
        let salary = CurrencyAmount::new(dec!(10000), Currency::CNY);
        let err = runner
            .run(&salary, &["ZZ".to_string()], &options())
            .unwrap_err();
        assert!(err.to_string().contains("ZZ"));
    }

    #[test]
    fn test_overrides_reach_calculators() {
        let (registry, converter) = runner_fixtures();
        let runner = AnalysisRunner::new(&registry, &converter);
        let salary = CurrencyAmount::new(dec!(15000), Currency::CNY);
        let mut opts = options();
        opts.retirement_age = Some(62);
        opts.terminal_age = Some(85);
        let report = runner
            .run(&salary, &["CN".to_string()], &opts)
            .unwrap();
        let result = &report.countries[0].result;
        assert_eq!(result.retirement_age, 62);
        assert_eq!(result.schedule.end_age(), Some(85));
    }

    #[test]
    fn test_required_start_age_shapes_ledger() {
        let (registry, converter) = runner_fixtures();
        let runner = AnalysisRunner::new(&registry, &converter);
        let salary = CurrencyAmount::new(dec!(15000), Currency::CNY);
        let mut opts = options();
        opts.current_age = 25;
        opts.contribution_start_age = 22;
        let report = runner
            .run(&salary, &["CN".to_string()], &opts)
            .unwrap();
        let ledger = &report.countries[0].result.ledger;
        assert_eq!(ledger.first().unwrap().age, 22);
    }
}
