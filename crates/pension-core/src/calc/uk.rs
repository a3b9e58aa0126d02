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
pub struct UkParams {
    pub ni_primary_threshold: YearSeries,
    pub ni_upper_earnings_limit: YearSeries,
    pub ni_main_rate: Rate,
    pub ni_upper_rate: Rate,
    pub ni_employer_rate: Rate,
    pub ni_secondary_threshold: Money,
    /// Auto-enrolment qualifying earnings band.
    pub ae_lower: YearSeries,
    pub ae_upper: YearSeries,
    pub ae_employee_rate: Rate,
    pub ae_employer_rate: Rate,
    pub personal_allowance: YearSeries,
    /// Allowance tapers £1 per £2 of income above this.
    pub allowance_taper_threshold: Money,
    /// Schedule over income above the (tapered) allowance.
    pub brackets: Vec<Bracket>,
    pub state_pension_weekly: YearSeries,
    pub qualifying_years_cap: u32,
    pub state_pension_age: u32,
    pub annuity_rate: Rate,
    pub annuity_months: u32,
}

impl Default for UkParams {
    fn default() -> Self {
        UkParams {
            ni_primary_threshold: YearSeries::new(
                "NI primary threshold",
                &[(2023, dec!(12570)), (2024, dec!(12570))],
            ),
            ni_upper_earnings_limit: YearSeries::new(
                "NI upper earnings limit",
                &[(2023, dec!(50270)), (2024, dec!(50270))],
            ),
            ni_main_rate: dec!(0.08),
            ni_upper_rate: dec!(0.02),
            ni_employer_rate: dec!(0.138),
            ni_secondary_threshold: dec!(9100),
            ae_lower: YearSeries::new(
                "auto-enrolment lower limit",
                &[(2023, dec!(6240)), (2024, dec!(6240))],
            ),
            ae_upper: YearSeries::new(
                "auto-enrolment upper limit",
                &[(2023, dec!(50270)), (2024, dec!(50270))],
            ),
            ae_employee_rate: dec!(0.05),
            ae_employer_rate: dec!(0.03),
            personal_allowance: YearSeries::new(
                "personal allowance",
                &[(2023, dec!(12570)), (2024, dec!(12570))],
            ),
            allowance_taper_threshold: dec!(100000),
            brackets: vec![
                Bracket { over: dec!(0), rate: dec!(0.20) },
                Bracket { over: dec!(37700), rate: dec!(0.40) },
                Bracket { over: dec!(112570), rate: dec!(0.45) },
            ],
            state_pension_weekly: YearSeries::new(
                "new State Pension weekly amount",
                &[(2023, dec!(203.85)), (2024, dec!(221.20))],
            ),
            qualifying_years_cap: 35,
            state_pension_age: 67,
            annuity_rate: dec!(0.03),
            annuity_months: 300,
        }
    }
}

/// National Insurance, auto-enrolment workplace pension, and the flat new
/// State Pension prorated over qualifying years.
#[derive(Debug, Clone, Default)]
pub struct Uk {
    pub params: UkParams,
}

struct Projection {
    ledger: Vec<YearLedgerEntry>,
    dc_pot: Money,
}

impl Uk {
    pub fn with_params(params: UkParams) -> Self {
        Uk { params }
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
        let mut dc_pot = Decimal::ZERO;

        for age in span {
            let year = person.year_at_age(age);
            let gross = salary.monthly_in(age - start_age) * dec!(12);

            let primary = p.ni_primary_threshold.amount_for(year, econ.inflation)?;
            let upper = p.ni_upper_earnings_limit.amount_for(year, econ.inflation)?;
            let main_band = (gross.min(upper) - primary).max(Decimal::ZERO);
            let upper_band = (gross - upper).max(Decimal::ZERO);
            let ni_employee = main_band * p.ni_main_rate + upper_band * p.ni_upper_rate;
            let ni_employer =
                (gross - p.ni_secondary_threshold).max(Decimal::ZERO) * p.ni_employer_rate;

            let ae_lower = p.ae_lower.amount_for(year, econ.inflation)?;
            let ae_upper = p.ae_upper.amount_for(year, econ.inflation)?;
            let qualifying = (gross.min(ae_upper) - ae_lower).max(Decimal::ZERO);
            let dc_employee = qualifying * p.ae_employee_rate;
            let dc_employer = qualifying * p.ae_employer_rate;

            let full_allowance = p.personal_allowance.amount_for(year, econ.inflation)?;
            let taper = ((gross - p.allowance_taper_threshold).max(Decimal::ZERO)) / dec!(2);
            let allowance = (full_allowance - taper).max(Decimal::ZERO);
            let taxable = (gross - allowance - dc_employee).max(Decimal::ZERO);
            let tax = marginal_tax(taxable, &p.brackets);
            let net = gross - ni_employee - dc_employee - tax;

            dc_pot = dc_pot * (Decimal::ONE + econ.investment_return) + dc_employee + dc_employer;

            let mut balances = BTreeMap::new();
            balances.insert("workplace_pension".to_string(), dc_pot);

            ledger.push(YearLedgerEntry {
                year,
                age,
                gross_salary: gross,
                contribution_base: qualifying,
                employee: ContributionLines {
                    pension: ni_employee,
                    other: dc_employee,
                    ..Default::default()
                },
                employer: ContributionLines {
                    pension: ni_employer,
                    other: dc_employer,
                    ..Default::default()
                },
                taxable_income: taxable,
                tax,
                net_income: net,
                balances,
            });
        }

        Ok(Projection { ledger, dc_pot })
    }
}

impl Calculator for Uk {
    fn country_code(&self) -> &'static str {
        "UK"
    }

    fn currency(&self) -> Currency {
        Currency::GBP
    }

    fn retirement_age(&self, _person: &Person) -> u32 {
        self.params.state_pension_age
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

        let weekly = p
            .state_pension_weekly
            .amount_for(retirement_year, econ.inflation)?;
        let qualifying_years =
            Decimal::from((projection.ledger.len() as u32).min(p.qualifying_years_cap));
        let state_monthly = weekly * dec!(52) / dec!(12) * qualifying_years
            / Decimal::from(p.qualifying_years_cap);
        let annuity_monthly =
            kernel::monthly_annuity(projection.dc_pot, p.annuity_rate, p.annuity_months);

        let annuity_end = retirement_age + p.annuity_months / 12;
        let mut schedule = RetirementSchedule::default();
        if econ.terminal_age <= annuity_end {
            schedule.push(retirement_age, econ.terminal_age, state_monthly + annuity_monthly);
        } else {
            schedule.push(retirement_age, annuity_end, state_monthly + annuity_monthly);
            schedule.push(annuity_end, econ.terminal_age, state_monthly);
        }

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
