use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

use crate::calc::{effective_retirement_age, working_span, Calculator};
use crate::model::{
    summarize, validate_inputs, ContributionLines, EconomicFactors, PensionResult, Person,
    RetirementSchedule, SalaryProfile, YearLedgerEntry,
};
use crate::params::{marginal_tax, Bracket, YearSeries};
use crate::types::{Currency, Money, Rate};
use crate::PensionSimResult;

#[derive(Debug, Clone)]
pub struct JapanParams {
    /// Standard-monthly-remuneration ceiling for the pension premium.
    pub smr_cap: Money,
    /// Employees' Pension Insurance rate, split evenly with the employer.
    pub pension_rate: Rate,
    pub health_rate: Rate,
    pub employment_insurance_employee: Rate,
    pub employment_insurance_employer: Rate,
    pub basic_deduction: Money,
    pub brackets: Vec<Bracket>,
    pub resident_tax_rate: Rate,
    /// Full-career basic pension, yearly amount by calendar year.
    pub basic_pension_full: YearSeries,
    pub basic_pension_full_months: u32,
    /// Earnings-related accrual per contribution month on the career-average
    /// standard remuneration.
    pub earnings_accrual: Rate,
    pub statutory_retirement_age: u32,
}

impl Default for JapanParams {
    fn default() -> Self {
        JapanParams {
            smr_cap: dec!(650000),
            pension_rate: dec!(0.183),
            health_rate: dec!(0.0998),
            employment_insurance_employee: dec!(0.006),
            employment_insurance_employer: dec!(0.0095),
            basic_deduction: dec!(480000),
            brackets: vec![
                Bracket { over: dec!(0), rate: dec!(0.05) },
                Bracket { over: dec!(1950000), rate: dec!(0.10) },
                Bracket { over: dec!(3300000), rate: dec!(0.20) },
                Bracket { over: dec!(6950000), rate: dec!(0.23) },
                Bracket { over: dec!(9000000), rate: dec!(0.33) },
                Bracket { over: dec!(18000000), rate: dec!(0.40) },
                Bracket { over: dec!(40000000), rate: dec!(0.45) },
            ],
            resident_tax_rate: dec!(0.10),
            basic_pension_full: YearSeries::new(
                "full basic pension",
                &[(2023, dec!(795000)), (2024, dec!(816000))],
            ),
            basic_pension_full_months: 480,
            earnings_accrual: dec!(0.005481),
            statutory_retirement_age: 65,
        }
    }
}

impl JapanParams {
    /// Employment-income deduction on the yearly salary.
    fn employment_income_deduction(&self, gross: Money) -> Money {
        if gross <= dec!(1625000) {
            dec!(550000)
        } else if gross <= dec!(1800000) {
            gross * dec!(0.40) - dec!(100000)
        } else if gross <= dec!(3600000) {
            gross * dec!(0.30) + dec!(80000)
        } else if gross <= dec!(6600000) {
            gross * dec!(0.20) + dec!(440000)
        } else if gross <= dec!(8500000) {
            gross * dec!(0.10) + dec!(1100000)
        } else {
            dec!(1950000)
        }
    }
}

/// Employees' Pension Insurance: flat basic tier prorated by contribution
/// months plus an earnings-related tier on career-average remuneration.
#[derive(Debug, Clone, Default)]
pub struct Japan {
    pub params: JapanParams,
}

struct Projection {
    ledger: Vec<YearLedgerEntry>,
    smr_sum: Money,
}

impl Japan {
    pub fn with_params(params: JapanParams) -> Self {
        Japan { params }
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
        let start_age = span.start;

        let mut ledger = Vec::with_capacity(span.len());
        let mut smr_sum = Decimal::ZERO;

        for age in span {
            let year = person.year_at_age(age);
            let monthly = salary.monthly_in(age - start_age);
            let gross = monthly * dec!(12);
            let smr = monthly.min(p.smr_cap);

            let pension_each = smr * p.pension_rate / dec!(2) * dec!(12);
            let health_each = smr * p.health_rate / dec!(2) * dec!(12);
            let employee = ContributionLines {
                pension: pension_each,
                medical: health_each,
                unemployment: gross * p.employment_insurance_employee,
                ..Default::default()
            };
            let employer = ContributionLines {
                pension: pension_each,
                medical: health_each,
                unemployment: gross * p.employment_insurance_employer,
                ..Default::default()
            };

            let deduction = p.employment_income_deduction(gross) + p.basic_deduction;
            let taxable = (gross - deduction - employee.total()).max(Decimal::ZERO);
            let national = marginal_tax(taxable, &p.brackets);
            let tax = national + taxable * p.resident_tax_rate;
            let net = gross - employee.total() - tax;

            smr_sum += smr;

            ledger.push(YearLedgerEntry {
                year,
                age,
                gross_salary: gross,
                contribution_base: smr * dec!(12),
                employee,
                employer,
                taxable_income: taxable,
                tax,
                net_income: net,
                balances: BTreeMap::new(),
            });
        }

        Ok(Projection { ledger, smr_sum })
    }
}

impl Calculator for Japan {
    fn country_code(&self) -> &'static str {
        "JP"
    }

    fn currency(&self) -> Currency {
        Currency::JPY
    }

    fn retirement_age(&self, _person: &Person) -> u32 {
        self.params.statutory_retirement_age
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

        let years = projection.ledger.len() as u32;
        let months = years * 12;
        let capped_months = months.min(p.basic_pension_full_months);
        let full_basic = p
            .basic_pension_full
            .amount_for(retirement_year, econ.inflation)?;
        let basic_yearly =
            full_basic * Decimal::from(capped_months) / Decimal::from(p.basic_pension_full_months);

        let avg_smr = if years == 0 {
            Decimal::ZERO
        } else {
            projection.smr_sum / Decimal::from(years)
        };
        let earnings_yearly = avg_smr * p.earnings_accrual * Decimal::from(months);

        let monthly_pension = (basic_yearly + earnings_yearly) / dec!(12);
        let schedule =
            RetirementSchedule::level(retirement_age, econ.terminal_age, monthly_pension);

        Ok(summarize(
            self.country_code(),
            self.currency(),
            retirement_age,
            projection.ledger,
            schedule,
            Decimal::ZERO,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Employment, Gender};
    use pretty_assertions::assert_eq;

    fn person_at_30() -> Person {
        Person {
            birth_year: 1995,
            gender: Gender::Male,
            employment: Employment::Employee,
            start_work_year: 2025,
        }
    }

    fn salary(monthly: Money) -> SalaryProfile {
        SalaryProfile {
            monthly_salary: monthly,
            annual_growth: Decimal::ZERO,
            contribution_start_age: 30,
        }
    }

    fn econ() -> EconomicFactors {
        let mut e = EconomicFactors::with_defaults(Currency::JPY, Currency::JPY);
        e.inflation = Decimal::ZERO;
        e
    }

    #[test]
    fn test_premiums_split_evenly_on_capped_remuneration() {
        let calc = Japan::default();
        let ledger = calc
            .annual_ledger(&person_at_30(), &salary(dec!(400000)), &econ())
            .unwrap();
        let entry = &ledger[0];
        // 400000 * 0.183 / 2 * 12
        assert_eq!(entry.employee.pension, dec!(439200.0));
        assert_eq!(entry.employee.pension, entry.employer.pension);
        assert_eq!(entry.employee.medical, entry.employer.medical);

        let ledger = calc
            .annual_ledger(&person_at_30(), &salary(dec!(800000)), &econ())
            .unwrap();
        // Remuneration capped at 650000.
        assert_eq!(ledger[0].contribution_base, dec!(650000) * dec!(12));
        assert_eq!(
            ledger[0].employee.pension,
            dec!(650000) * dec!(0.183) / dec!(2) * dec!(12)
        );
    }

    #[test]
    fn test_employment_income_deduction_bands() {
        let p = JapanParams::default();
        assert_eq!(p.employment_income_deduction(dec!(1500000)), dec!(550000));
        assert_eq!(
            p.employment_income_deduction(dec!(3000000)),
            dec!(3000000) * dec!(0.30) + dec!(80000)
        );
        assert_eq!(
            p.employment_income_deduction(dec!(4800000)),
            dec!(4800000) * dec!(0.20) + dec!(440000)
        );
        assert_eq!(p.employment_income_deduction(dec!(20000000)), dec!(1950000));
    }

    #[test]
    fn test_tax_includes_resident_levy() {
        let calc = Japan::default();
        let ledger = calc
            .annual_ledger(&person_at_30(), &salary(dec!(400000)), &econ())
            .unwrap();
        let entry = &ledger[0];
        let deduction = JapanParams::default().employment_income_deduction(dec!(4800000))
            + dec!(480000);
        let expected_taxable =
            (dec!(4800000) - deduction - entry.employee.total()).max(Decimal::ZERO);
        assert_eq!(entry.taxable_income, expected_taxable);
        let national = marginal_tax(expected_taxable, &JapanParams::default().brackets);
        assert_eq!(entry.tax, national + expected_taxable * dec!(0.10));
    }

    #[test]
    fn test_basic_pension_prorated_by_months() {
        let calc = Japan::default();
        // 35 working years = 420 months out of 480.
        let result = calc
            .calculate(&person_at_30(), &salary(dec!(400000)), &econ())
            .unwrap();
        let basic_yearly = dec!(816000) * dec!(420) / dec!(480);
        let earnings_yearly = dec!(400000) * dec!(0.005481) * dec!(420);
        let expected_monthly = (basic_yearly + earnings_yearly) / dec!(12);
        assert!(
            (result.monthly_pension - expected_monthly).abs() < dec!(0.01),
            "got {}",
            result.monthly_pension
        );
    }

    #[test]
    fn test_net_identity_and_non_negative_lines() {
        let calc = Japan::default();
        let ledger = calc
            .annual_ledger(&person_at_30(), &salary(dec!(700000)), &econ())
            .unwrap();
        for entry in &ledger {
            assert_eq!(
                entry.net_income,
                entry.gross_salary - entry.employee.total() - entry.tax
            );
            assert!(entry.employee.pension >= dec!(0));
            assert!(entry.tax >= dec!(0));
            assert!(entry.net_income <= entry.gross_salary);
        }
    }
}
