use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

use crate::calc::{effective_retirement_age, working_span, Calculator};
use crate::kernel;
use crate::model::{
    summarize, validate_inputs, ContributionLines, EconomicFactors, PensionResult, Person,
    RetirementSchedule, SalaryProfile, YearLedgerEntry,
};
use crate::params::{marginal_tax, Bracket, YearSeries};
use crate::types::{Currency, Money, Rate};
use crate::PensionSimResult;

#[derive(Debug, Clone)]
pub struct TaiwanParams {
    /// Monthly insured-salary ceiling for Labor Insurance.
    pub insured_salary_cap: YearSeries,
    pub insured_salary_floor: Money,
    /// Combined ordinary + employment insurance premium rate.
    pub labor_insurance_rate: Rate,
    pub li_employee_share: Rate,
    pub li_employer_share: Rate,
    pub nhi_rate: Rate,
    pub nhi_employee_share: Rate,
    pub nhi_employer_share: Rate,
    /// Employer-funded individual pension account.
    pub labor_pension_rate: Rate,
    pub pension_wage_cap: Money,
    pub exemption: Money,
    pub standard_deduction: Money,
    pub salary_deduction: Money,
    pub brackets: Vec<Bracket>,
    /// Labor Insurance annuity accrual per insured year.
    pub li_accrual: Rate,
    /// The annuity base averages the highest-paid insured months over a
    /// window of this size.
    pub insured_window_months: u32,
    pub statutory_retirement_age: u32,
    pub annuity_rate: Rate,
}

impl Default for TaiwanParams {
    fn default() -> Self {
        TaiwanParams {
            insured_salary_cap: YearSeries::new(
                "labor insurance salary ceiling",
                &[(2023, dec!(45800)), (2024, dec!(45800))],
            ),
            insured_salary_floor: dec!(27470),
            labor_insurance_rate: dec!(0.115),
            li_employee_share: dec!(0.2),
            li_employer_share: dec!(0.7),
            nhi_rate: dec!(0.0517),
            nhi_employee_share: dec!(0.3),
            nhi_employer_share: dec!(0.6),
            labor_pension_rate: dec!(0.06),
            pension_wage_cap: dec!(150000),
            exemption: dec!(92000),
            standard_deduction: dec!(124000),
            salary_deduction: dec!(207000),
            brackets: vec![
                Bracket { over: dec!(0), rate: dec!(0.05) },
                Bracket { over: dec!(560000), rate: dec!(0.12) },
                Bracket { over: dec!(1260000), rate: dec!(0.20) },
                Bracket { over: dec!(2520000), rate: dec!(0.30) },
                Bracket { over: dec!(4720000), rate: dec!(0.40) },
            ],
            li_accrual: dec!(0.0155),
            insured_window_months: 60,
            statutory_retirement_age: 65,
            annuity_rate: dec!(0.03),
        }
    }
}

/// Mean monthly insured salary over the highest-paid `window_months` of the
/// career. Each calendar year contributes twelve months at its insured
/// level, so the window reduces to the top ceil(window/12) yearly values.
fn top_window_average(history: &[Money], window_months: u32) -> Money {
    if history.is_empty() {
        return Decimal::ZERO;
    }
    let mut sorted = history.to_vec();
    sorted.sort();
    sorted.reverse();
    let window_years = (window_months.div_ceil(12).max(1) as usize).min(sorted.len());
    let top = &sorted[..window_years];
    top.iter().copied().sum::<Decimal>() / Decimal::from(top.len() as u64)
}

/// Labor Insurance annuity plus the employer-funded Labor Pension account.
#[derive(Debug, Clone, Default)]
pub struct Taiwan {
    pub params: TaiwanParams,
}

struct Projection {
    ledger: Vec<YearLedgerEntry>,
    pension_account: Money,
    /// Monthly insured salary for each working year.
    insured_history: Vec<Money>,
}

impl Taiwan {
    pub fn with_params(params: TaiwanParams) -> Self {
        Taiwan { params }
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
        let mut pension_account = Decimal::ZERO;
        let mut insured_history = Vec::with_capacity(span.len());

        for age in span {
            let year = person.year_at_age(age);
            let monthly = salary.monthly_in(age - start_age);
            let gross = monthly * dec!(12);

            let cap = p.insured_salary_cap.amount_for(year, econ.inflation)?;
            let insured = monthly.max(p.insured_salary_floor).min(cap);
            let li_premium = insured * p.labor_insurance_rate * dec!(12);
            let nhi_premium = insured * p.nhi_rate * dec!(12);

            let employee = ContributionLines {
                pension: li_premium * p.li_employee_share,
                medical: nhi_premium * p.nhi_employee_share,
                ..Default::default()
            };
            let pension_wage = monthly.min(p.pension_wage_cap);
            let employer = ContributionLines {
                pension: li_premium * p.li_employer_share,
                medical: nhi_premium * p.nhi_employer_share,
                other: pension_wage * p.labor_pension_rate * dec!(12),
                ..Default::default()
            };

            let taxable = (gross - p.exemption - p.standard_deduction - p.salary_deduction)
                .max(Decimal::ZERO);
            let tax = marginal_tax(taxable, &p.brackets);
            let net = gross - employee.total() - tax;

            pension_account =
                pension_account * (Decimal::ONE + econ.investment_return) + employer.other;
            insured_history.push(insured);

            let mut balances = BTreeMap::new();
            balances.insert("labor_pension_account".to_string(), pension_account);

            ledger.push(YearLedgerEntry {
                year,
                age,
                gross_salary: gross,
                contribution_base: insured * dec!(12),
                employee,
                employer,
                taxable_income: taxable,
                tax,
                net_income: net,
                balances,
            });
        }

        Ok(Projection {
            ledger,
            pension_account,
            insured_history,
        })
    }
}

impl Calculator for Taiwan {
    fn country_code(&self) -> &'static str {
        "TW"
    }

    fn currency(&self) -> Currency {
        Currency::TWD
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

        let years = Decimal::from(projection.ledger.len() as u64);
        // Earnings-related tier: highest-paid insured window times the
        // per-year accrual over the whole insured career.
        let avg_insured =
            top_window_average(&projection.insured_history, p.insured_window_months);
        let li_monthly = avg_insured * years * p.li_accrual;
        let months = (econ.terminal_age.saturating_sub(retirement_age)) * 12;
        let lp_monthly = kernel::monthly_annuity(projection.pension_account, p.annuity_rate, months);

        let schedule = RetirementSchedule::level(
            retirement_age,
            econ.terminal_age,
            li_monthly + lp_monthly,
        );

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
        let mut e = EconomicFactors::with_defaults(Currency::TWD, Currency::TWD);
        e.inflation = Decimal::ZERO;
        e.investment_return = dec!(0.04);
        e
    }

    #[test]
    fn test_insured_salary_clamped() {
        let calc = Taiwan::default();
        let ledger = calc
            .annual_ledger(&person_at_30(), &salary(dec!(80000)), &econ())
            .unwrap();
        // Capped at 45800/month.
        assert_eq!(ledger[0].contribution_base, dec!(45800) * dec!(12));

        let ledger = calc
            .annual_ledger(&person_at_30(), &salary(dec!(20000)), &econ())
            .unwrap();
        // Floored at the minimum insured salary.
        assert_eq!(ledger[0].contribution_base, dec!(27470) * dec!(12));
    }

    #[test]
    fn test_first_year_premium_split() {
        let calc = Taiwan::default();
        let ledger = calc
            .annual_ledger(&person_at_30(), &salary(dec!(40000)), &econ())
            .unwrap();
        let entry = &ledger[0];
        let li_total = dec!(40000) * dec!(0.115) * dec!(12);
        assert_eq!(entry.employee.pension, li_total * dec!(0.2));
        assert_eq!(entry.employer.pension, li_total * dec!(0.7));
        // Employer pays 6% into the individual pension account.
        assert_eq!(entry.employer.other, dec!(40000) * dec!(0.06) * dec!(12));
        assert_eq!(entry.balances["labor_pension_account"], entry.employer.other);
    }

    #[test]
    fn test_tax_deductions_zero_out_modest_salary() {
        let calc = Taiwan::default();
        // 420000/yr < 92000 + 124000 + 207000 = 423000 of deductions.
        let ledger = calc
            .annual_ledger(&person_at_30(), &salary(dec!(35000)), &econ())
            .unwrap();
        assert_eq!(ledger[0].taxable_income, dec!(0));
        assert_eq!(ledger[0].tax, dec!(0));
    }

    #[test]
    fn test_top_window_average() {
        let history: Vec<Money> = [
            dec!(10000),
            dec!(20000),
            dec!(30000),
            dec!(40000),
            dec!(50000),
            dec!(60000),
            dec!(70000),
        ]
        .into();
        // 60 months = the five best years: (30+40+50+60+70)k / 5.
        assert_eq!(top_window_average(&history, 60), dec!(50000));
        // Shorter careers use every year they have.
        assert_eq!(top_window_average(&history[..3], 60), dec!(20000));
        assert_eq!(top_window_average(&[], 60), dec!(0));
        // A 13-month window still spans two calendar years.
        assert_eq!(top_window_average(&history, 13), dec!(65000));
    }

    #[test]
    fn test_benefit_combines_annuity_and_account() {
        let calc = Taiwan::default();
        let result = calc
            .calculate(&person_at_30(), &salary(dec!(40000)), &econ())
            .unwrap();
        // Flat career: the best-60-months average is the insured salary
        // itself, so the Labor Insurance tier is exactly
        // 40000 * 35 * 0.0155 = 21700, plus the funded account on top.
        assert!(result.monthly_pension > dec!(21700));
        assert_eq!(result.retirement_age, 65);
        assert_eq!(result.schedule.end_age(), Some(90));
    }

    #[test]
    fn test_annuity_base_uses_peak_insured_window() {
        let calc = Taiwan::default();
        // Declining career: insured salary peaks in the first five years.
        let declining = SalaryProfile {
            monthly_salary: dec!(45000),
            annual_growth: dec!(-0.05),
            contribution_start_age: 30,
        };
        let ledger = calc
            .annual_ledger(&person_at_30(), &declining, &econ())
            .unwrap();
        let insured: Vec<Money> = ledger
            .iter()
            .map(|e| e.contribution_base / dec!(12))
            .collect();
        let peak_avg = top_window_average(&insured, 60);
        let career_avg: Money =
            insured.iter().copied().sum::<Money>() / Decimal::from(insured.len() as u64);
        assert!(peak_avg > career_avg);

        let result = calc.calculate(&person_at_30(), &declining, &econ()).unwrap();
        // The Labor Insurance tier alone already exceeds what a career-wide
        // average would pay.
        let years = Decimal::from(insured.len() as u64);
        let li_from_peak = peak_avg * years * dec!(0.0155);
        let li_from_career = career_avg * years * dec!(0.0155);
        assert!(result.monthly_pension > li_from_peak);
        assert!(li_from_peak > li_from_career);
        // And the peak window is exactly what the calculator used: strip the
        // funded-account annuity back out.
        let lp_monthly = crate::kernel::monthly_annuity(
            ledger.last().unwrap().balances["labor_pension_account"],
            dec!(0.03),
            (90 - 65) * 12,
        );
        assert!(
            (result.monthly_pension - lp_monthly - li_from_peak).abs() < dec!(0.01),
            "got {}",
            result.monthly_pension
        );
    }

    #[test]
    fn test_net_identity() {
        let calc = Taiwan::default();
        let ledger = calc
            .annual_ledger(&person_at_30(), &salary(dec!(90000)), &econ())
            .unwrap();
        for entry in &ledger {
            assert_eq!(
                entry.net_income,
                entry.gross_salary - entry.employee.total() - entry.tax
            );
            assert!(entry.net_income <= entry.gross_salary);
        }
    }
}
