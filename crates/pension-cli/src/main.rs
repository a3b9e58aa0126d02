mod output;

use clap::{Parser, ValueEnum};
use colored::Colorize;
use rust_decimal::Decimal;
use std::process;

use pension_core::fx::{default_fetchers, parse_amount, CurrencyConverter, FxConfig};
use pension_core::model::{Employment, Gender};
use pension_core::registry::Registry;
use pension_core::runner::{AnalysisOptions, AnalysisRunner};
use pension_core::types::Currency;
use pension_core::PensionSimError;

const EXIT_PARSE: i32 = 2;
const EXIT_UNKNOWN_COUNTRY: i32 = 3;
const EXIT_UNEXPECTED: i32 = 4;

/// Multi-jurisdiction retirement contribution and pension comparison
#[derive(Parser)]
#[command(
    name = "pensim",
    version,
    about = "Multi-jurisdiction retirement contribution and pension comparison",
    long_about = "Simulates social-security contributions, income tax, take-home pay and \
                  retirement benefits across jurisdictions from a single salary input, \
                  with decimal precision and daily-cached currency conversion."
)]
struct Cli {
    /// Salary amount, e.g. "cny15000", "8000usd", "S$6,000" or bare digits (CNY)
    amount: Option<String>,

    /// Comma-separated country codes (e.g. CN,US,SG); defaults to all registered
    #[arg(short, long, value_delimiter = ',')]
    countries: Vec<String>,

    /// Age at which contributions begin (required for simulations)
    #[arg(long)]
    start_age: Option<u32>,

    /// Current age
    #[arg(long, default_value_t = 30)]
    age: u32,

    #[arg(long, value_enum, default_value = "male")]
    gender: GenderArg,

    #[arg(long, value_enum, default_value = "employee")]
    employment: EmploymentArg,

    /// Yearly salary growth rate
    #[arg(long, default_value = "0.02")]
    salary_growth: Decimal,

    /// Inflation rate override
    #[arg(long)]
    inflation: Option<Decimal>,

    /// Investment return override
    #[arg(long)]
    investment_return: Option<Decimal>,

    /// Social-security notional interest override
    #[arg(long)]
    ss_return: Option<Decimal>,

    /// Retirement age override
    #[arg(long)]
    retirement_age: Option<u32>,

    /// Terminal age of the projection
    #[arg(long)]
    terminal_age: Option<u32>,

    /// Currency for the cross-country comparison block
    #[arg(long, default_value = "CNY")]
    display_currency: String,

    /// Include the year-by-year ledger in the output
    #[arg(long)]
    annual: bool,

    /// List registered country calculators
    #[arg(long)]
    list_plugins: bool,

    /// Run every registered calculator against a canned profile
    #[arg(long)]
    test_plugins: bool,

    /// List supported currency codes
    #[arg(long)]
    supported_currencies: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "json")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GenderArg {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EmploymentArg {
    Employee,
    CivilServant,
    SelfEmployed,
    Farmer,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

impl From<GenderArg> for Gender {
    fn from(value: GenderArg) -> Self {
        match value {
            GenderArg::Male => Gender::Male,
            GenderArg::Female => Gender::Female,
        }
    }
}

impl From<EmploymentArg> for Employment {
    fn from(value: EmploymentArg) -> Self {
        match value {
            EmploymentArg::Employee => Employment::Employee,
            EmploymentArg::CivilServant => Employment::CivilServant,
            EmploymentArg::SelfEmployed => Employment::SelfEmployed,
            EmploymentArg::Farmer => Employment::Farmer,
        }
    }
}

fn exit_code(err: &PensionSimError) -> i32 {
    match err {
        PensionSimError::Parse { .. } | PensionSimError::UnknownCurrency { .. } => EXIT_PARSE,
        PensionSimError::UnknownCountry { .. } => EXIT_UNKNOWN_COUNTRY,
        _ => EXIT_UNEXPECTED,
    }
}

fn fail(err: &PensionSimError) -> ! {
    eprintln!("{}: {}", "error".red().bold(), err);
    process::exit(exit_code(err));
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let registry = Registry::with_defaults();

    if cli.list_plugins {
        for code in registry.codes() {
            let calculator = registry.get(&code).expect("listed code resolves");
            println!("{}  {}", code, calculator.currency());
        }
        return;
    }

    if cli.supported_currencies {
        for currency in Currency::ALL {
            println!("{currency}");
        }
        return;
    }

    let config = FxConfig::default();
    let fetchers = default_fetchers(config.timeout);
    let converter = CurrencyConverter::load(&config, &fetchers);
    let runner = AnalysisRunner::new(&registry, &converter);

    if cli.test_plugins {
        process::exit(run_plugin_tests(&registry, &runner));
    }

    let Some(ref raw_amount) = cli.amount else {
        fail(&PensionSimError::Parse {
            input: String::new(),
            reason: "a salary amount is required".into(),
        });
    };
    let Some(start_age) = cli.start_age else {
        fail(&PensionSimError::Parse {
            input: raw_amount.clone(),
            reason: "--start-age is required".into(),
        });
    };

    let salary = match parse_amount(raw_amount) {
        Ok(amount) => amount,
        Err(err) => fail(&err),
    };
    let display_currency = match cli.display_currency.parse::<Currency>() {
        Ok(currency) => currency,
        Err(err) => fail(&err),
    };

    let mut options = AnalysisOptions::new(start_age);
    options.current_age = cli.age;
    options.gender = cli.gender.into();
    options.employment = cli.employment.into();
    options.annual_growth = cli.salary_growth;
    options.display_currency = display_currency;
    options.inflation = cli.inflation;
    options.investment_return = cli.investment_return;
    options.ss_return = cli.ss_return;
    options.retirement_age = cli.retirement_age;
    options.terminal_age = cli.terminal_age;

    let codes = if cli.countries.is_empty() {
        registry.codes()
    } else {
        cli.countries.clone()
    };

    let mut report = match runner.run(&salary, &codes, &options) {
        Ok(report) => report,
        Err(err) => fail(&err),
    };
    for country in &mut report.countries {
        country.result = country.result.rounded();
    }

    let mut value = match serde_json::to_value(&report) {
        Ok(value) => value,
        Err(err) => {
            eprintln!("{}: {}", "error".red().bold(), err);
            process::exit(EXIT_UNEXPECTED);
        }
    };
    if !cli.annual {
        strip_ledgers(&mut value);
    }

    output::format_output(&cli.output, &value);
}

/// Run every calculator once with a canned mid-career profile and report
/// per-code success.
fn run_plugin_tests(registry: &Registry, runner: &AnalysisRunner) -> i32 {
    let salary = parse_amount("cny15000").expect("canned amount parses");
    let options = AnalysisOptions::new(30);
    let mut failures = 0;
    for code in registry.codes() {
        match runner.run(&salary, &[code.clone()], &options) {
            Ok(report) => {
                let result = &report.countries[0].result;
                println!(
                    "{} {code}: monthly pension {} {}",
                    "ok".green().bold(),
                    result.monthly_pension.round_dp(2),
                    result.currency
                );
            }
            Err(err) => {
                failures += 1;
                println!("{} {code}: {err}", "fail".red().bold());
            }
        }
    }
    if failures == 0 {
        0
    } else {
        EXIT_UNEXPECTED
    }
}

/// Drop the year-by-year arrays from a report value for the compact view.
fn strip_ledgers(value: &mut serde_json::Value) {
    if let Some(countries) = value
        .get_mut("countries")
        .and_then(|c| c.as_array_mut())
    {
        for country in countries {
            if let Some(result) = country.get_mut("result") {
                if let Some(map) = result.as_object_mut() {
                    map.remove("ledger");
                }
            }
        }
    }
}
