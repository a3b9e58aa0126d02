use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

use crate::calc::{effective_retirement_age, working_span, Calculator};
use crate::error::PensionSimError;
use crate::kernel;
use crate::model::{
    summarize, validate_inputs, ContributionLines, EconomicFactors, PensionResult, Person,
    RetirementSchedule, SalaryProfile, YearLedgerEntry,
};
use crate::params::{index_brackets, marginal_tax, Bracket, YearSeries};
use crate::types::{Currency, Money, Rate};
use crate::PensionSimResult;

/// One employer-match tier: `match_rate` applies to deferrals covering the
/// next `up_to_salary_pct` of pay.
#[derive(Debug, Clone, Copy)]
pub struct MatchTier {
    pub match_rate: Rate,
    pub up_to_salary_pct: Rate,
}

#[derive(Debug, Clone)]
pub struct UsParams {
    pub oasdi_rate: Rate,
    pub medicare_rate: Rate,
    pub additional_medicare_rate: Rate,
    pub ss_wage_base: YearSeries,
    /// Statutorily unindexed single-filer surtax threshold.
    pub medicare_surtax_threshold: Money,
    pub deferral_rate: Rate,
    pub deferral_limit: YearSeries,
    pub catchup: YearSeries,
    pub enhanced_catchup: YearSeries,
    pub catchup_age: u32,
    pub enhanced_catchup_ages: (u32, u32),
    /// §415(c)-style combined employee + employer ceiling.
    pub combined_limit: YearSeries,
    pub standard_deduction: YearSeries,
    /// Single-filer schedules by year; later years index the latest
    /// schedule's thresholds by inflation.
    pub brackets: BTreeMap<i32, Vec<Bracket>>,
    pub match_tiers: Vec<MatchTier>,
    pub full_retirement_age: u32,
    pub pia_bend_1: YearSeries,
    pub pia_bend_2: YearSeries,
    pub pia_rates: (Rate, Rate, Rate),
    pub top_years: usize,
    pub distribution_rate: Rate,
    pub distribution_months: u32,
}

impl Default for UsParams {
    fn default() -> Self {
        let mut brackets = BTreeMap::new();
        brackets.insert(
            2024,
            vec![
                Bracket { over: dec!(0), rate: dec!(0.10) },
                Bracket { over: dec!(11600), rate: dec!(0.12) },
                Bracket { over: dec!(47150), rate: dec!(0.22) },
                Bracket { over: dec!(100525), rate: dec!(0.24) },
                Bracket { over: dec!(191950), rate: dec!(0.32) },
                Bracket { over: dec!(243725), rate: dec!(0.35) },
                Bracket { over: dec!(609350), rate: dec!(0.37) },
            ],
        );
        brackets.insert(
            2025,
            vec![
                Bracket { over: dec!(0), rate: dec!(0.10) },
                Bracket { over: dec!(11925), rate: dec!(0.12) },
                Bracket { over: dec!(48475), rate: dec!(0.22) },
                Bracket { over: dec!(103350), rate: dec!(0.24) },
                Bracket { over: dec!(197300), rate: dec!(0.32) },
                Bracket { over: dec!(250525), rate: dec!(0.35) },
                Bracket { over: dec!(626350), rate: dec!(0.37) },
            ],
        );
        UsParams {
            oasdi_rate: dec!(0.062),
            medicare_rate: dec!(0.0145),
            additional_medicare_rate: dec!(0.009),
            ss_wage_base: YearSeries::new(
                "social security wage base",
                &[(2023, dec!(160200)), (2024, dec!(168600)), (2025, dec!(176100))],
            ),
            medicare_surtax_threshold: dec!(200000),
            deferral_rate: dec!(0.08),
            deferral_limit: YearSeries::new(
                "401(k) elective deferral limit",
                &[(2023, dec!(22500)), (2024, dec!(23000)), (2025, dec!(23500))],
            ),
            catchup: YearSeries::new(
                "401(k) catch-up",
                &[(2023, dec!(7500)), (2025, dec!(7500))],
            ),
            enhanced_catchup: YearSeries::new(
                "401(k) enhanced catch-up",
                &[(2025, dec!(11250))],
            ),
            catchup_age: 50,
            enhanced_catchup_ages: (60, 63),
            combined_limit: YearSeries::new(
                "annual additions limit",
                &[(2023, dec!(66000)), (2024, dec!(69000)), (2025, dec!(70000))],
            ),
            standard_deduction: YearSeries::new(
                "standard deduction (single)",
                &[(2023, dec!(13850)), (2024, dec!(14600)), (2025, dec!(15000))],
            ),
            brackets,
            match_tiers: vec![
                MatchTier { match_rate: dec!(1.0), up_to_salary_pct: dec!(0.03) },
                MatchTier { match_rate: dec!(0.5), up_to_salary_pct: dec!(0.02) },
            ],
            full_retirement_age: 67,
            pia_bend_1: YearSeries::new("PIA first bend point", &[(2025, dec!(1226))]),
            pia_bend_2: YearSeries::new("PIA second bend point", &[(2025, dec!(7391))]),
            pia_rates: (dec!(0.90), dec!(0.32), dec!(0.15)),
            top_years: 35,
            distribution_rate: dec!(0.03),
            distribution_months: 300,
        }
    }
}

impl UsParams {
    fn brackets_for(&self, year: i32, inflation: Rate) -> PensionSimResult<Vec<Bracket>> {
        let first = *self
            .brackets
            .keys()
            .next()
            .ok_or_else(|| PensionSimError::Config {
                what: "federal tax brackets".into(),
                year,
                nearest: None,
            })?;
        if year < first {
            return Err(PensionSimError::Config {
                what: "federal tax brackets".into(),
                year,
                nearest: Some(first),
            });
        }
        let (known_year, schedule) = self
            .brackets
            .range(..=year)
            .next_back()
            .expect("range is non-empty past the first-year check");
        Ok(index_brackets(
            schedule,
            inflation,
            (year - known_year) as u32,
        ))
    }

    fn catchup_for(&self, age: u32, year: i32) -> PensionSimResult<Money> {
        if age < self.catchup_age {
            return Ok(Decimal::ZERO);
        }
        let (lo, hi) = self.enhanced_catchup_ages;
        if age >= lo && age <= hi && self.enhanced_catchup.first_year().is_some_and(|y| year >= y)
        {
            return self.enhanced_catchup.amount_for(year, Decimal::ZERO);
        }
        self.catchup.amount_for(year, Decimal::ZERO)
    }

    fn employer_match(&self, gross: Money, deferral: Money) -> Money {
        if gross <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let mut remaining_pct = deferral / gross;
        let mut matched = Decimal::ZERO;
        for tier in &self.match_tiers {
            if remaining_pct <= Decimal::ZERO {
                break;
            }
            let pct = remaining_pct.min(tier.up_to_salary_pct);
            matched += gross * pct * tier.match_rate;
            remaining_pct -= pct;
        }
        matched
    }

    /// Claim-age scaling of the PIA: full at FRA, 5/9% per month for the
    /// first 36 early months then 5/12%, 2/3% per delayed month.
    fn claim_factor(&self, claim_age: u32) -> Rate {
        let months = (claim_age as i64 - self.full_retirement_age as i64) * 12;
        if months == 0 {
            return Decimal::ONE;
        }
        if months < 0 {
            let early = Decimal::from(-months);
            let first = early.min(dec!(36));
            let rest = (early - dec!(36)).max(Decimal::ZERO);
            return Decimal::ONE - first * dec!(5) / dec!(900) - rest * dec!(5) / dec!(1200);
        }
        Decimal::ONE + Decimal::from(months) * dec!(2) / dec!(300)
    }
}

/// FICA payroll taxes, traditional 401(k) with a tiered employer match, and
/// a bend-point Social Security benefit.
#[derive(Debug, Clone, Default)]
pub struct Usa {
    pub params: UsParams,
}

struct Projection {
    ledger: Vec<YearLedgerEntry>,
    balance_401k: Money,
    /// Capped earnings per year, input to the top-35 indexed average.
    capped_earnings: Vec<(i32, Money)>,
}

impl Usa {
    pub fn with_params(params: UsParams) -> Self {
        Usa { params }
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
        let mut balance = Decimal::ZERO;
        let mut capped_earnings = Vec::with_capacity(span.len());

        for age in span {
            let year = person.year_at_age(age);
            let gross = salary.monthly_in(age - start_age) * dec!(12);

            let wage_base = p.ss_wage_base.amount_for(year, econ.inflation)?;
            let ss_earnings = gross.min(wage_base);
            let oasdi = ss_earnings * p.oasdi_rate;
            let surtax = (gross - p.medicare_surtax_threshold).max(Decimal::ZERO)
                * p.additional_medicare_rate;
            let medicare = gross * p.medicare_rate + surtax;

            let deferral_cap =
                p.deferral_limit.amount_for(year, econ.inflation)? + p.catchup_for(age, year)?;
            let deferral = (gross * p.deferral_rate).min(deferral_cap);
            let mut employer_match = p.employer_match(gross, deferral);
            let combined_cap =
                p.combined_limit.amount_for(year, econ.inflation)? + p.catchup_for(age, year)?;
            if deferral + employer_match > combined_cap {
                employer_match = (combined_cap - deferral).max(Decimal::ZERO);
            }

            let deduction = p.standard_deduction.amount_for(year, econ.inflation)?;
            let taxable = (gross - deduction - deferral).max(Decimal::ZERO);
            let tax = marginal_tax(taxable, &p.brackets_for(year, econ.inflation)?);
            let net = gross - oasdi - medicare - deferral - tax;

            balance = balance * (Decimal::ONE + econ.investment_return) + deferral + employer_match;
            capped_earnings.push((year, ss_earnings));

            let mut balances = BTreeMap::new();
            balances.insert("401k".to_string(), balance);

            ledger.push(YearLedgerEntry {
                year,
                age,
                gross_salary: gross,
                contribution_base: ss_earnings,
                employee: ContributionLines {
                    pension: oasdi,
                    medical: medicare,
                    unemployment: Decimal::ZERO,
                    housing_fund: Decimal::ZERO,
                    other: deferral,
                },
                employer: ContributionLines {
                    pension: oasdi,
                    medical: gross * p.medicare_rate,
                    unemployment: Decimal::ZERO,
                    housing_fund: Decimal::ZERO,
                    other: employer_match,
                },
                taxable_income: taxable,
                tax,
                net_income: net,
                balances,
            });
        }

        Ok(Projection {
            ledger,
            balance_401k: balance,
            capped_earnings,
        })
    }

    /// AIME from the top-N indexed years, then the three-segment PIA.
    fn social_security_monthly(
        &self,
        projection: &Projection,
        econ: &EconomicFactors,
        retirement_year: i32,
        claim_age: u32,
    ) -> PensionSimResult<Money> {
        let p = &self.params;
        let mut indexed: Vec<Money> = projection
            .capped_earnings
            .iter()
            .map(|(year, earnings)| {
                *earnings * kernel::compound(econ.inflation, (retirement_year - year).max(0) as u32)
            })
            .collect();
        indexed.sort();
        indexed.reverse();
        indexed.truncate(p.top_years);
        let total: Money = indexed.iter().sum();
        let aime = total / (Decimal::from(p.top_years as u64) * dec!(12));

        let bend_1 = p.pia_bend_1.amount_for(retirement_year, econ.inflation)?;
        let bend_2 = p.pia_bend_2.amount_for(retirement_year, econ.inflation)?;
        let (r1, r2, r3) = p.pia_rates;
        let pia = r1 * aime.min(bend_1)
            + r2 * (aime.min(bend_2) - bend_1).max(Decimal::ZERO)
            + r3 * (aime - bend_2).max(Decimal::ZERO);
        Ok(pia * p.claim_factor(claim_age))
    }
}

impl Calculator for Usa {
    fn country_code(&self) -> &'static str {
        "US"
    }

    fn currency(&self) -> Currency {
        Currency::USD
    }

    fn retirement_age(&self, _person: &Person) -> u32 {
        self.params.full_retirement_age
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

        let ss_monthly =
            self.social_security_monthly(&projection, econ, retirement_year, retirement_age)?;
        let annuity_monthly = kernel::monthly_annuity(
            projection.balance_401k,
            p.distribution_rate,
            p.distribution_months,
        );

        let annuity_end = retirement_age + p.distribution_months / 12;
        let mut schedule = RetirementSchedule::default();
        if econ.terminal_age <= annuity_end {
            schedule.push(retirement_age, econ.terminal_age, ss_monthly + annuity_monthly);
        } else {
            schedule.push(retirement_age, annuity_end, ss_monthly + annuity_monthly);
            schedule.push(annuity_end, econ.terminal_age, ss_monthly);
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
