use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

use crate::calc::{effective_retirement_age, working_span, Calculator};
use crate::model::{
    summarize, validate_inputs, ContributionLines, EconomicFactors, Gender, PensionResult, Person,
    RetirementSchedule, SalaryProfile, YearLedgerEntry,
};
use crate::params::YearSeries;
use crate::types::{Currency, Money, Rate};
use crate::PensionSimResult;

/// One row of the annualized quick-deduction tax table: `rate` applies to the
/// whole taxable amount up to `up_to` (None = open-ended), minus the
/// pre-computed deduction constant.
#[derive(Debug, Clone, Copy)]
pub struct QuickBracket {
    pub up_to: Option<Money>,
    pub rate: Rate,
    pub quick_deduction: Money,
}

#[derive(Debug, Clone)]
pub struct ChinaParams {
    /// Local average monthly wage by calendar year; absent years are
    /// inflation-indexed from the last known value.
    pub avg_monthly_wage: YearSeries,
    pub si_floor_ratio: Rate,
    pub si_cap_ratio: Rate,
    pub hf_rate: Rate,
    pub hf_base_floor: Money,
    pub hf_base_ceiling: Money,
    /// Yearly interest credited on the housing-fund balance.
    pub hf_interest: Rate,
    pub employee_pension: Rate,
    pub employee_medical: Rate,
    pub employee_unemployment: Rate,
    pub employer_pension: Rate,
    pub employer_medical: Rate,
    pub employer_unemployment: Rate,
    pub employer_injury: Rate,
    pub standard_deduction: Money,
    pub tax_table: Vec<QuickBracket>,
    /// Months divisor for the individual-account annuity, by retirement age.
    pub months_divisor: Vec<(u32, Decimal)>,
    pub male_retirement_age: u32,
    pub female_employee_retirement_age: u32,
    pub female_civil_retirement_age: u32,
    /// Accrual per contribution year in the basic-pension formula.
    pub basic_pension_accrual: Rate,
}

impl Default for ChinaParams {
    fn default() -> Self {
        ChinaParams {
            avg_monthly_wage: YearSeries::new(
                "local average monthly wage",
                &[(2022, dec!(11297)), (2023, dec!(11961)), (2024, dec!(12434))],
            ),
            si_floor_ratio: dec!(0.6),
            si_cap_ratio: dec!(3.0),
            hf_rate: dec!(0.07),
            hf_base_floor: dec!(2420),
            hf_base_ceiling: dec!(35283),
            hf_interest: Decimal::ZERO,
            employee_pension: dec!(0.08),
            employee_medical: dec!(0.02),
            employee_unemployment: dec!(0.005),
            employer_pension: dec!(0.16),
            employer_medical: dec!(0.09),
            employer_unemployment: dec!(0.005),
            employer_injury: dec!(0.0016),
            standard_deduction: dec!(60000),
            tax_table: vec![
                QuickBracket { up_to: Some(dec!(36000)), rate: dec!(0.03), quick_deduction: dec!(0) },
                QuickBracket { up_to: Some(dec!(144000)), rate: dec!(0.10), quick_deduction: dec!(2520) },
                QuickBracket { up_to: Some(dec!(300000)), rate: dec!(0.20), quick_deduction: dec!(16920) },
                QuickBracket { up_to: Some(dec!(420000)), rate: dec!(0.25), quick_deduction: dec!(31920) },
                QuickBracket { up_to: Some(dec!(660000)), rate: dec!(0.30), quick_deduction: dec!(52920) },
                QuickBracket { up_to: Some(dec!(960000)), rate: dec!(0.35), quick_deduction: dec!(85920) },
                QuickBracket { up_to: None, rate: dec!(0.45), quick_deduction: dec!(181920) },
            ],
            months_divisor: vec![(50, dec!(195)), (55, dec!(170)), (60, dec!(139))],
            male_retirement_age: 60,
            female_employee_retirement_age: 55,
            female_civil_retirement_age: 60,
            basic_pension_accrual: dec!(0.01),
        }
    }
}

impl ChinaParams {
    fn income_tax(&self, taxable: Money) -> Money {
        if taxable <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        for bracket in &self.tax_table {
            match bracket.up_to {
                Some(upper) if taxable > upper => continue,
                _ => return taxable * bracket.rate - bracket.quick_deduction,
            }
        }
        Decimal::ZERO
    }

    fn divisor_for(&self, retirement_age: u32) -> Decimal {
        self.months_divisor
            .iter()
            .min_by_key(|(age, _)| age.abs_diff(retirement_age))
            .map(|(_, d)| *d)
            .unwrap_or(dec!(139))
    }
}

struct Projection {
    ledger: Vec<YearLedgerEntry>,
    pension_account: Money,
    housing_fund: Money,
    /// Career mean of `si_base / avg_wage`, the wage-index ratio.
    index_ratio: Decimal,
}

/// Urban employee social insurance, housing fund, and the two-part basic +
/// individual-account pension.
#[derive(Debug, Clone, Default)]
pub struct China {
    pub params: ChinaParams,
}

impl China {
    pub fn with_params(params: ChinaParams) -> Self {
        China { params }
    }

    fn project(
        &self,
        person: &Person,
        salary: &SalaryProfile,
        econ: &EconomicFactors,
        retirement_age: u32,
    ) -> PensionSimResult<Projection> {
        let p = &self.params;
        let span = working_span(salary, retirement_age)?;

        let mut ledger = Vec::with_capacity(span.len());
        let mut pension_account = Decimal::ZERO;
        let mut housing_fund = Decimal::ZERO;
        let mut index_sum = Decimal::ZERO;
        let start_age = span.start;

        for age in span.clone() {
            let year = person.year_at_age(age);
            let monthly = salary.monthly_in(age - start_age);
            let gross = monthly * dec!(12);
            let avg_wage = p.avg_monthly_wage.amount_for(year, econ.inflation)?;

            let si_base = monthly
                .max(avg_wage * p.si_floor_ratio)
                .min(avg_wage * p.si_cap_ratio);
            let hf_base = monthly.max(p.hf_base_floor).min(p.hf_base_ceiling);

            let employee = ContributionLines {
                pension: si_base * p.employee_pension * dec!(12),
                medical: si_base * p.employee_medical * dec!(12),
                unemployment: si_base * p.employee_unemployment * dec!(12),
                housing_fund: hf_base * p.hf_rate * dec!(12),
                other: Decimal::ZERO,
            };
            let employer = ContributionLines {
                pension: si_base * p.employer_pension * dec!(12),
                medical: si_base * p.employer_medical * dec!(12),
                unemployment: si_base * p.employer_unemployment * dec!(12),
                housing_fund: hf_base * p.hf_rate * dec!(12),
                other: si_base * p.employer_injury * dec!(12),
            };

            let emp_si = employee.pension + employee.medical + employee.unemployment;
            let taxable = (gross - p.standard_deduction - emp_si - employee.housing_fund)
                .max(Decimal::ZERO);
            let tax = p.income_tax(taxable);
            let net = gross - emp_si - employee.housing_fund - tax;

            pension_account = pension_account * (Decimal::ONE + econ.ss_return) + employee.pension;
            housing_fund = housing_fund * (Decimal::ONE + p.hf_interest)
                + employee.housing_fund
                + employer.housing_fund;
            index_sum += si_base / avg_wage;

            let mut balances = BTreeMap::new();
            balances.insert("pension_account".to_string(), pension_account);
            balances.insert("housing_fund".to_string(), housing_fund);

            ledger.push(YearLedgerEntry {
                year,
                age,
                gross_salary: gross,
                contribution_base: si_base * dec!(12),
                employee,
                employer,
                taxable_income: taxable,
                tax,
                net_income: net,
                balances,
            });
        }

        let years = Decimal::from(span.len() as u64);
        Ok(Projection {
            ledger,
            pension_account,
            housing_fund,
            index_ratio: if years.is_zero() {
                Decimal::ZERO
            } else {
                index_sum / years
            },
        })
    }
}

impl Calculator for China {
    fn country_code(&self) -> &'static str {
        "CN"
    }

    fn currency(&self) -> Currency {
        Currency::CNY
    }

    fn retirement_age(&self, person: &Person) -> u32 {
        use crate::model::Employment;
        match (person.gender, person.employment) {
            (Gender::Male, _) => self.params.male_retirement_age,
            (Gender::Female, Employment::CivilServant) => self.params.female_civil_retirement_age,
            (Gender::Female, _) => self.params.female_employee_retirement_age,
        }
    }

    fn annual_ledger(
        &self,
        person: &Person,
        salary: &SalaryProfile,
        econ: &EconomicFactors,
    ) -> PensionSimResult<Vec<YearLedgerEntry>> {
        validate_inputs(person, salary, econ)?;
        let retirement_age = effective_retirement_age(self.retirement_age(person), econ);
        Ok(self.project(person, salary, econ, retirement_age)?.ledger)
    }

    fn calculate(
        &self,
        person: &Person,
        salary: &SalaryProfile,
        econ: &EconomicFactors,
    ) -> PensionSimResult<PensionResult> {
        validate_inputs(person, salary, econ)?;
        let p = &self.params;
        let retirement_age = effective_retirement_age(self.retirement_age(person), econ);
        let projection = self.project(person, salary, econ, retirement_age)?;

        let retirement_year = person.year_at_age(retirement_age);
        let avg_at_retirement = p
            .avg_monthly_wage
            .amount_for(retirement_year, econ.inflation)?;
        let avg_indexed_salary = projection.index_ratio * avg_at_retirement;
        let years = Decimal::from(projection.ledger.len() as u64);

        let basic = (avg_at_retirement + avg_indexed_salary) / dec!(2)
            * years
            * p.basic_pension_accrual;
        let individual = projection.pension_account / p.divisor_for(retirement_age);
        let monthly_pension = basic + individual;

        let schedule =
            RetirementSchedule::level(retirement_age, econ.terminal_age, monthly_pension);

        Ok(summarize(
            self.country_code(),
            self.currency(),
            retirement_age,
            projection.ledger,
            schedule,
            projection.housing_fund,
        ))
    }
}
