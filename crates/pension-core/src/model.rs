use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::PensionSimError;
use crate::kernel;
use crate::types::{Currency, Money, Rate};
use crate::PensionSimResult;

pub const DEFAULT_TERMINAL_AGE: u32 = 90;
pub const MIN_WORKING_AGE: u32 = 16;

const RATE_FLOOR: Decimal = dec!(-0.5);
const RATE_CEILING: Decimal = dec!(1.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Employment {
    Employee,
    CivilServant,
    SelfEmployed,
    Farmer,
}

/// Immutable descriptor of the person being simulated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Person {
    pub birth_year: i32,
    pub gender: Gender,
    pub employment: Employment,
    pub start_work_year: i32,
}

impl Person {
    pub fn validate(&self) -> PensionSimResult<()> {
        if self.start_work_year < self.birth_year + MIN_WORKING_AGE as i32 {
            return Err(PensionSimError::invalid_profile(
                "start_work_year",
                format!(
                    "must be at least birth_year + {MIN_WORKING_AGE} (got {} for birth year {})",
                    self.start_work_year, self.birth_year
                ),
            ));
        }
        Ok(())
    }

    pub fn age_in(&self, year: i32) -> u32 {
        (year - self.birth_year).max(0) as u32
    }

    pub fn year_at_age(&self, age: u32) -> i32 {
        self.birth_year + age as i32
    }
}

/// Salary trajectory: a starting monthly salary growing geometrically from
/// the contribution start year.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SalaryProfile {
    pub monthly_salary: Money,
    pub annual_growth: Rate,
    /// Age at which contributions begin. Always supplied by the caller.
    pub contribution_start_age: u32,
}

impl SalaryProfile {
    pub fn validate(&self) -> PensionSimResult<()> {
        if self.monthly_salary < Decimal::ZERO {
            return Err(PensionSimError::invalid_profile(
                "monthly_salary",
                "must be non-negative",
            ));
        }
        if self.annual_growth < RATE_FLOOR || self.annual_growth > RATE_CEILING {
            return Err(PensionSimError::invalid_profile(
                "annual_growth",
                "must lie in [-0.5, 1.0]",
            ));
        }
        if self.contribution_start_age < MIN_WORKING_AGE {
            return Err(PensionSimError::invalid_profile(
                "contribution_start_age",
                format!("must be at least {MIN_WORKING_AGE}"),
            ));
        }
        Ok(())
    }

    /// Monthly salary `years_in` years after the contribution start.
    pub fn monthly_in(&self, years_in: u32) -> Money {
        self.monthly_salary * kernel::compound(self.annual_growth, years_in)
    }
}

/// Macro-economic assumptions plus the simulation horizon knobs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EconomicFactors {
    pub inflation: Rate,
    pub investment_return: Rate,
    /// Notional interest credited on social-security individual accounts.
    pub ss_return: Rate,
    pub base_currency: Currency,
    pub display_currency: Currency,
    pub retirement_age_override: Option<u32>,
    pub terminal_age: u32,
}

impl EconomicFactors {
    pub fn with_defaults(base_currency: Currency, display_currency: Currency) -> Self {
        EconomicFactors {
            inflation: dec!(0.02),
            investment_return: dec!(0.07),
            ss_return: dec!(0.025),
            base_currency,
            display_currency,
            retirement_age_override: None,
            terminal_age: DEFAULT_TERMINAL_AGE,
        }
    }

    pub fn validate(&self) -> PensionSimResult<()> {
        for (name, rate) in [
            ("inflation", self.inflation),
            ("investment_return", self.investment_return),
            ("ss_return", self.ss_return),
        ] {
            if rate < RATE_FLOOR || rate > RATE_CEILING {
                return Err(PensionSimError::invalid_profile(
                    name,
                    "must lie in [-0.5, 1.0]",
                ));
            }
        }
        if self.terminal_age == 0 || self.terminal_age > 120 {
            return Err(PensionSimError::invalid_profile(
                "terminal_age",
                "must lie in (0, 120]",
            ));
        }
        Ok(())
    }
}

/// Contribution line items for one side (employee or employer) of one year.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ContributionLines {
    pub pension: Money,
    pub medical: Money,
    pub unemployment: Money,
    pub housing_fund: Money,
    pub other: Money,
}

impl ContributionLines {
    pub fn total(&self) -> Money {
        self.pension + self.medical + self.unemployment + self.housing_fund + self.other
    }
}

/// One working year of the cash-flow ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearLedgerEntry {
    pub year: i32,
    pub age: u32,
    pub gross_salary: Money,
    pub contribution_base: Money,
    pub employee: ContributionLines,
    pub employer: ContributionLines,
    pub taxable_income: Money,
    pub tax: Money,
    pub net_income: Money,
    /// End-of-year balances keyed by sub-account label.
    pub balances: BTreeMap<String, Money>,
}

/// A run of months with a level payout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PayoutPhase {
    pub from_age: u32,
    /// Exclusive upper age bound.
    pub to_age: u32,
    pub monthly: Money,
}

/// Monthly payouts from retirement onward, as contiguous level phases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetirementSchedule {
    pub phases: Vec<PayoutPhase>,
}

impl RetirementSchedule {
    pub fn level(from_age: u32, to_age: u32, monthly: Money) -> Self {
        RetirementSchedule {
            phases: vec![PayoutPhase {
                from_age,
                to_age,
                monthly,
            }],
        }
    }

    pub fn push(&mut self, from_age: u32, to_age: u32, monthly: Money) {
        if from_age < to_age {
            self.phases.push(PayoutPhase {
                from_age,
                to_age,
                monthly,
            });
        }
    }

    pub fn first_monthly(&self) -> Money {
        self.phases.first().map(|p| p.monthly).unwrap_or_default()
    }

    pub fn monthly_at(&self, age: u32) -> Money {
        self.phases
            .iter()
            .find(|p| p.from_age <= age && age < p.to_age)
            .map(|p| p.monthly)
            .unwrap_or_default()
    }

    pub fn start_age(&self) -> Option<u32> {
        self.phases.first().map(|p| p.from_age)
    }

    pub fn end_age(&self) -> Option<u32> {
        self.phases.last().map(|p| p.to_age)
    }

    pub fn total_paid(&self) -> Money {
        self.phases
            .iter()
            .map(|p| p.monthly * dec!(12) * Decimal::from(p.to_age - p.from_age))
            .sum()
    }
}

/// The full outcome of one jurisdiction's simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PensionResult {
    pub country: String,
    pub currency: Currency,
    pub retirement_age: u32,
    pub monthly_pension: Money,
    pub employee_contributions: Money,
    pub employer_contributions: Money,
    pub total_contributions: Money,
    pub lump_sum_at_retirement: Money,
    pub total_benefits: Money,
    pub roi: Option<Rate>,
    pub irr: Option<Rate>,
    pub payback_age: Option<Decimal>,
    pub ledger: Vec<YearLedgerEntry>,
    pub schedule: RetirementSchedule,
}

impl PensionResult {
    /// Copy with money rounded half-even to cents and metrics to 6 places,
    /// for display and serialization.
    pub fn rounded(&self) -> PensionResult {
        let money = |v: Money| v.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
        let metric = |v: Rate| v.round_dp_with_strategy(6, RoundingStrategy::MidpointNearestEven);
        PensionResult {
            country: self.country.clone(),
            currency: self.currency,
            retirement_age: self.retirement_age,
            monthly_pension: money(self.monthly_pension),
            employee_contributions: money(self.employee_contributions),
            employer_contributions: money(self.employer_contributions),
            total_contributions: money(self.total_contributions),
            lump_sum_at_retirement: money(self.lump_sum_at_retirement),
            total_benefits: money(self.total_benefits),
            roi: self.roi.map(metric),
            irr: self.irr.map(metric),
            payback_age: self.payback_age.map(|v| {
                v.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
            }),
            ledger: self
                .ledger
                .iter()
                .map(|e| YearLedgerEntry {
                    year: e.year,
                    age: e.age,
                    gross_salary: money(e.gross_salary),
                    contribution_base: money(e.contribution_base),
                    employee: round_lines(&e.employee),
                    employer: round_lines(&e.employer),
                    taxable_income: money(e.taxable_income),
                    tax: money(e.tax),
                    net_income: money(e.net_income),
                    balances: e.balances.iter().map(|(k, v)| (k.clone(), money(*v))).collect(),
                })
                .collect(),
            schedule: RetirementSchedule {
                phases: self
                    .schedule
                    .phases
                    .iter()
                    .map(|p| PayoutPhase {
                        from_age: p.from_age,
                        to_age: p.to_age,
                        monthly: money(p.monthly),
                    })
                    .collect(),
            },
        }
    }
}

fn round_lines(lines: &ContributionLines) -> ContributionLines {
    let money = |v: Money| v.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
    ContributionLines {
        pension: money(lines.pension),
        medical: money(lines.medical),
        unemployment: money(lines.unemployment),
        housing_fund: money(lines.housing_fund),
        other: money(lines.other),
    }
}

/// Validate the three-part input contract shared by every calculator.
pub fn validate_inputs(
    person: &Person,
    salary: &SalaryProfile,
    econ: &EconomicFactors,
) -> PensionSimResult<()> {
    person.validate()?;
    salary.validate()?;
    econ.validate()
}

/// Assemble a `PensionResult` from a ledger and a payout schedule.
///
/// Derives contribution totals, benefit totals, ROI, the signed yearly IRR
/// stream (contributions negative while working, receipts positive in
/// retirement, lump sum in the first retirement year) and the interpolated
/// payback age. Every calculator funnels through here so the summary metrics
/// are computed identically across jurisdictions.
pub fn summarize(
    country: &str,
    currency: Currency,
    retirement_age: u32,
    ledger: Vec<YearLedgerEntry>,
    schedule: RetirementSchedule,
    lump_sum_at_retirement: Money,
) -> PensionResult {
    let employee_contributions: Money = ledger.iter().map(|e| e.employee.total()).sum();
    let employer_contributions: Money = ledger.iter().map(|e| e.employer.total()).sum();
    let total_benefits = lump_sum_at_retirement + schedule.total_paid();

    let roi = if employee_contributions > Decimal::ZERO {
        Some((total_benefits - employee_contributions) / employee_contributions)
    } else {
        None
    };

    let first_age = ledger.first().map(|e| e.age).unwrap_or(retirement_age);
    let end_age = schedule.end_age().unwrap_or(retirement_age);

    // Payback tracks the recurring pension stream against contributions;
    // one-off disbursements still count toward totals and the IRR stream.
    let mut cash_flows: Vec<Money> = Vec::new();
    let mut cumulative_contrib: Vec<(u32, Money)> = Vec::new();
    let mut cumulative_benefit: Vec<(u32, Money)> = Vec::new();
    let mut contrib_sum = Decimal::ZERO;
    let mut benefit_sum = Decimal::ZERO;
    for age in first_age..end_age {
        let paid_in: Money = ledger
            .iter()
            .filter(|e| e.age == age)
            .map(|e| e.employee.total())
            .sum();
        let recurring = schedule.monthly_at(age) * dec!(12);
        let received = if age == retirement_age {
            recurring + lump_sum_at_retirement
        } else {
            recurring
        };
        cash_flows.push(received - paid_in);
        contrib_sum += paid_in;
        benefit_sum += recurring;
        cumulative_contrib.push((age, contrib_sum));
        cumulative_benefit.push((age, benefit_sum));
    }

    let irr = kernel::irr(&cash_flows);
    let payback_age = kernel::payback_age(&cumulative_contrib, &cumulative_benefit);
    let monthly_pension = schedule.first_monthly();

    PensionResult {
        country: country.to_string(),
        currency,
        retirement_age,
        monthly_pension,
        employee_contributions,
        employer_contributions,
        total_contributions: employee_contributions + employer_contributions,
        lump_sum_at_retirement,
        total_benefits,
        roi,
        irr,
        payback_age,
        ledger,
        schedule,
    }
}
