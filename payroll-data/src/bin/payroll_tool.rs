use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use payroll_core::{
    ContributionKind, PayPeriod, PayrollInputs, PcbBreakdown, PcbCalculator, StateCode, TaxConfig,
    WorkingDayClassifier,
};
use payroll_data::{
    ContributionTableParser, HolidayCsvLoader, TaxBracketLoader, TaxConfigLoader,
    extend_multi_day_holidays,
};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

/// Malaysian payroll utilities: PCB withholding, contribution schedules and
/// working-day counts.
#[derive(Parser, Debug)]
#[command(name = "payroll-tool")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the monthly PCB breakdown for one employee
    Pcb(PcbArgs),
    /// Parse an EPF/EIS contribution schedule exported as CSV or a workbook
    Contributions(ContributionArgs),
    /// Count deductible working days in a date range
    WorkingDays(WorkingDayArgs),
}

#[derive(clap::Args, Debug)]
struct PcbArgs {
    /// TOML tax configuration (defaults to the built-in LHDN 2025 snapshot)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CSV bracket schedule replacing the configuration's table
    #[arg(short, long)]
    brackets: Option<PathBuf>,

    /// Pay period as MM/YYYY
    #[arg(short, long)]
    period: PayPeriod,

    /// Gross remuneration for the current month
    #[arg(short, long)]
    gross: Decimal,

    /// Employee EPF contribution for the current month
    #[arg(short, long, default_value_t = Decimal::ZERO)]
    epf: Decimal,

    /// Gross paid earlier in the year
    #[arg(long, default_value_t = Decimal::ZERO)]
    accumulated_gross: Decimal,

    /// EPF contributed earlier in the year
    #[arg(long, default_value_t = Decimal::ZERO)]
    accumulated_epf: Decimal,

    /// PCB already withheld earlier in the year
    #[arg(long, default_value_t = Decimal::ZERO)]
    accumulated_pcb: Decimal,

    /// Zakat paid earlier in the year
    #[arg(long, default_value_t = Decimal::ZERO)]
    accumulated_zakat: Decimal,

    /// Zakat paid this month
    #[arg(long, default_value_t = Decimal::ZERO)]
    zakat: Decimal,

    /// Number of qualifying children
    #[arg(long, default_value_t = 0)]
    children: u32,

    /// Claim the spouse rebate
    #[arg(long, default_value_t = false)]
    spouse_rebate: bool,

    /// Treat the employee as a non-resident
    #[arg(long, default_value_t = false)]
    non_resident: bool,

    /// Relief claim as CATEGORY=AMOUNT (repeatable)
    #[arg(long = "claim", value_parser = parse_claim)]
    claims: Vec<(String, Decimal)>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Epf,
    Eis,
    Socso,
}

impl From<KindArg> for ContributionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Epf => ContributionKind::Epf,
            KindArg::Eis => ContributionKind::Eis,
            KindArg::Socso => ContributionKind::Socso,
        }
    }
}

#[derive(clap::Args, Debug)]
struct ContributionArgs {
    /// CSV or workbook (.xlsx, .xls, .ods) export of the published schedule
    #[arg(short, long)]
    file: PathBuf,

    /// Which scheme the schedule belongs to
    #[arg(short, long, value_enum)]
    kind: KindArg,

    /// Category for rows before any PART marker (defaults to the scheme's
    /// first category, e.g. "A" for EPF)
    #[arg(short, long)]
    category: Option<String>,

    /// Look up the row covering this wage after parsing
    #[arg(short, long)]
    wage: Option<Decimal>,
}

#[derive(clap::Args, Debug)]
struct WorkingDayArgs {
    /// Holiday CSV (date,name,state,kind,origin,action)
    #[arg(long)]
    holidays: PathBuf,

    /// First day of the range (YYYY-MM-DD)
    #[arg(long)]
    start: NaiveDate,

    /// Last day of the range, inclusive (YYYY-MM-DD)
    #[arg(long)]
    end: NaiveDate,

    /// States whose holidays apply, comma-separated (omit for nationwide)
    #[arg(long, value_delimiter = ',')]
    states: Vec<StateCode>,

    /// Deduct on observance days
    #[arg(long, default_value_t = false)]
    skip_observances: bool,

    /// Deduct on nationwide provider holidays
    #[arg(long, default_value_t = false)]
    skip_national: bool,

    /// Add a second day after Chinese New Year and Hari Raya when missing
    #[arg(long, default_value_t = false)]
    extend_multi_day: bool,

    /// Print each deductible date
    #[arg(long, default_value_t = false)]
    list: bool,
}

fn parse_claim(s: &str) -> Result<(String, Decimal), String> {
    let (category, amount) = s
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=AMOUNT, got '{s}'"))?;
    let amount = amount
        .trim()
        .parse::<Decimal>()
        .map_err(|e| format!("invalid amount in '{s}': {e}"))?;
    Ok((category.trim().to_string(), amount))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    match args.command {
        Command::Pcb(args) => run_pcb(args),
        Command::Contributions(args) => run_contributions(args),
        Command::WorkingDays(args) => run_working_days(args),
    }
}

fn load_config(config: Option<&Path>, brackets: Option<&Path>) -> Result<TaxConfig> {
    let mut config = match config {
        Some(path) => TaxConfigLoader::from_path(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => TaxConfig::lhdn_2025(),
    };

    if let Some(path) = brackets {
        let file =
            File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
        let records = TaxBracketLoader::parse(file)
            .with_context(|| format!("Failed to parse CSV: {}", path.display()))?;
        config.brackets = TaxBracketLoader::build_table(&records, config.tax_year)
            .with_context(|| format!("Invalid bracket schedule: {}", path.display()))?;
    }

    Ok(config)
}

fn run_pcb(args: PcbArgs) -> Result<()> {
    let config = load_config(args.config.as_deref(), args.brackets.as_deref())?;
    let calculator = PcbCalculator::from_config(&config).context("Invalid tax configuration")?;

    let mut inputs = PayrollInputs {
        accumulated_gross_ytd: args.accumulated_gross,
        accumulated_epf_ytd: args.accumulated_epf,
        accumulated_pcb_ytd: args.accumulated_pcb,
        accumulated_zakat_ytd: args.accumulated_zakat,
        current_month_zakat: args.zakat,
        child_count: args.children,
        claims_spouse_rebate: args.spouse_rebate,
        is_resident: !args.non_resident,
        ..PayrollInputs::default()
    };
    for (category, amount) in args.claims {
        inputs = inputs.with_claim(&category, amount);
    }

    let breakdown = calculator
        .calculate(&inputs, args.gross, args.epf, args.period)
        .with_context(|| format!("Failed to compute PCB for {}", args.period))?;

    print_breakdown(&config, &breakdown);
    Ok(())
}

fn print_breakdown(config: &TaxConfig, b: &PcbBreakdown) {
    println!("Configuration:        {} ({})", config.version, config.tax_year);
    println!("Period:               {}", b.period);
    println!("Resident:             {}", b.is_resident);
    println!("Remaining months:     {}", b.remaining_months);
    println!("Projected gross:      {}", b.projected_gross);
    println!("EPF relief:           {}", b.epf_relief.total);
    for (category, amount) in &b.reliefs {
        println!("  {category:<20}{amount}");
    }
    println!("Child relief:         {}", b.child_relief);
    println!("Total reliefs:        {}", b.total_reliefs);
    println!("Chargeable income:    {}", b.chargeable_income);
    println!("Tax before rebate:    {}", b.annual_tax_before_rebate);
    println!("Rebate:               {}", b.rebate);
    println!("Annual tax:           {}", b.annual_tax_after_rebate);
    println!("Monthly PCB:          {}", b.monthly_pcb);
    println!("Monthly preview:      {}", b.monthly_preview);
    println!("Withholding:          {}", b.withholding);
    println!("Remaining liability:  {}", b.remaining_liability);
}

fn run_contributions(args: ContributionArgs) -> Result<()> {
    let parser = match &args.category {
        Some(category) => ContributionTableParser::new(args.kind.into(), category),
        None => ContributionTableParser::for_kind(args.kind.into()),
    };
    let report = parser
        .parse_file(&args.file)
        .with_context(|| format!("Failed to parse schedule: {}", args.file.display()))?;

    println!(
        "Parsed {} rows in categories {:?} ({} duplicates skipped, {} failures)",
        report.rows.len(),
        report.categories(),
        report.duplicates,
        report.failures.len()
    );
    for failure in &report.failures {
        println!("  line {}: {} [{}]", failure.line, failure.reason, failure.raw);
    }

    if let Some(wage) = args.wage {
        for category in report.categories() {
            match report.table_for(category).lookup(wage) {
                Some(row) => println!(
                    "[{category}] Wage {wage}: employer {}, employee {}, total {}",
                    row.employer, row.employee, row.total
                ),
                None => println!("[{category}] Wage {wage}: no matching band"),
            }
        }
    }

    Ok(())
}

fn run_working_days(args: WorkingDayArgs) -> Result<()> {
    let file = File::open(&args.holidays)
        .with_context(|| format!("Failed to open: {}", args.holidays.display()))?;
    let records = HolidayCsvLoader::parse(file)
        .with_context(|| format!("Failed to parse CSV: {}", args.holidays.display()))?;
    let mut holidays = HolidayCsvLoader::build_set(&records)
        .with_context(|| format!("Invalid holiday data: {}", args.holidays.display()))?;

    if args.extend_multi_day {
        let added = extend_multi_day_holidays(&mut holidays);
        println!("Added {added} second-day entries");
    }

    let classifier = WorkingDayClassifier::new(&holidays);
    let states = (!args.states.is_empty()).then_some(args.states.as_slice());
    let days = classifier.deductible_days(
        args.start,
        args.end,
        states,
        !args.skip_observances,
        !args.skip_national,
    );

    println!(
        "{} deductible days between {} and {}",
        days.len(),
        args.start,
        args.end
    );
    if args.list {
        for day in &days {
            println!("  {}", day.format("%a %Y-%m-%d"));
        }
    }

    Ok(())
}
