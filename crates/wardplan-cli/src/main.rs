use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use wardplan_core::{
    AllocationEvaluator, CapacityAnalysis, CapacityComparison, ConfigurationOptimizer, CrossCheck,
    DEFAULT_ROLLING_WINDOW, DemandSeries, EvaluationSeries, ModelComparison, RoomConfiguration, WardConfig,
    WasteAnalysis, census, monthly_trends, report, rolling_efficiency, sweep,
};

#[derive(Parser)]
#[command(name = "wardplan")]
#[command(about = "Size single/double room mixes for a ward from daily census data", long_about = None)]
struct Cli {
    /// Log solver and per-day detail
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Input {
    /// Census CSV with date, single_demand, double_demand and optional closed_rooms columns
    census: PathBuf,
    /// Ward configuration (TOML); defaults describe a 26-bed ward
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Only use census days from these years
    #[arg(long = "year")]
    years: Vec<i32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the room mix minimizing weighted waste
    Optimize {
        #[command(flatten)]
        input: Input,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Evaluate a given room mix day by day
    Evaluate {
        #[command(flatten)]
        input: Input,
        /// Number of single rooms
        #[arg(long)]
        single: u32,
        /// Number of double rooms
        #[arg(long)]
        double: u32,
        /// Write the per-day outcomes to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the full evaluation as JSON
        #[arg(long)]
        json: bool,
    },
    /// Evaluate every feasible room mix
    Sweep {
        #[command(flatten)]
        input: Input,
        /// Write one row per candidate to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compare a room mix (given, or the optimizer's) against the all-double baseline
    Compare {
        #[command(flatten)]
        input: Input,
        #[arg(long, requires = "double")]
        single: Option<u32>,
        #[arg(long, requires = "single")]
        double: Option<u32>,
        /// Print the comparison as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Optimize { input, json } => {
            let (config, series) = load(&input)?;
            let result = ConfigurationOptimizer::new(config.clone()).optimize(&series)?;

            if json {
                println!("{}", report::to_json(&result)?);
                return Ok(());
            }

            println!("Status: {}", result.status.as_str().to_uppercase());
            println!("Configuration: {}", describe(&result.configuration));
            println!("Objective: {:.2}", result.objective_value);
            println!("Branch-and-bound nodes: {}", result.nodes);
            println!();

            let evaluation = AllocationEvaluator::new(&config).evaluate(&result.configuration, &series)?;
            print_evaluation(&evaluation);
        }
        Commands::Evaluate {
            input,
            single,
            double,
            output,
            json,
        } => {
            let (config, series) = load(&input)?;
            let configuration = RoomConfiguration::new(single, double, config.ward.total_beds)?;
            let evaluation = AllocationEvaluator::new(&config).evaluate(&configuration, &series)?;

            if let Some(path) = &output {
                report::write_outcomes_csv(report::create_file(path)?, &evaluation)
                    .with_context(|| format!("writing {}", path.display()))?;
            }

            if json {
                println!("{}", report::to_json(&evaluation)?);
                return Ok(());
            }

            println!("Configuration: {}", describe(&configuration));
            println!();
            print_evaluation(&evaluation);
            print_trends(&evaluation);
        }
        Commands::Sweep { input, output, json } => {
            let (config, series) = load(&input)?;
            let sweep_report = sweep(&config, &series)?;

            if let Some(path) = &output {
                report::write_sweep_csv(report::create_file(path)?, &sweep_report)
                    .with_context(|| format!("writing {}", path.display()))?;
            }

            if json {
                println!("{}", report::to_json(&sweep_report)?);
                return Ok(());
            }

            println!(
                "{:>8} {:>8} {:>12} {:>12} {:>12} {:>10}",
                "single", "double", "wasted", "potential", "weighted", "efficiency"
            );
            for candidate in &sweep_report.candidates {
                let marker = if candidate.configuration == sweep_report.best.configuration {
                    " *"
                } else {
                    ""
                };
                let summary = &candidate.summary;
                println!(
                    "{:>8} {:>8} {:>12} {:>12} {:>12.2} {:>9.2}%{}",
                    candidate.configuration.single_rooms(),
                    candidate.configuration.double_rooms(),
                    summary.total_wasted_beds,
                    summary.total_wasted_potential,
                    summary.weighted_waste,
                    summary.cumulative_efficiency * 100.0,
                    marker
                );
            }
            println!();
            println!("Best: {}", describe(&sweep_report.best.configuration));
        }
        Commands::Compare {
            input,
            single,
            double,
            json,
        } => {
            let (config, series) = load(&input)?;
            let evaluator = AllocationEvaluator::new(&config);

            let optimized = ConfigurationOptimizer::new(config.clone()).optimize(&series)?;
            let candidate = match (single, double) {
                (Some(single), Some(double)) => RoomConfiguration::new(single, double, config.ward.total_beds)?,
                (None, None) => optimized.configuration,
                _ => bail!("--single and --double must be given together"),
            };

            let baseline = evaluator.evaluate(&RoomConfiguration::all_double(config.ward.total_beds), &series)?;
            let evaluation = evaluator.evaluate(&candidate, &series)?;
            let comparison = ModelComparison::new(&baseline, &evaluation);
            let capacity = CapacityComparison::new(
                &CapacityAnalysis::from_series(&baseline),
                &CapacityAnalysis::from_series(&evaluation),
            );
            let cross_check = CrossCheck::new(&optimized, &sweep(&config, &series)?);

            if json {
                let value = serde_json::json!({
                    "comparison": comparison,
                    "capacity": capacity,
                    "cross_check": cross_check,
                });
                println!("{}", report::to_json(&value)?);
                return Ok(());
            }

            println!("Baseline:  {}", describe(&comparison.baseline));
            println!("Candidate: {}", describe(&comparison.candidate));
            println!();
            println!("Wasted beds reduced by:      {}", comparison.wasted_bed_reduction);
            println!("Wasted potential reduced by: {}", comparison.wasted_potential_reduction);
            println!("Total waste reduced by:      {}", comparison.total_waste_reduction);
            println!(
                "Cumulative efficiency:       {:.2}% -> {:.2}% ({:+.2} points)",
                baseline.cumulative_efficiency() * 100.0,
                evaluation.cumulative_efficiency() * 100.0,
                comparison.cumulative_efficiency_gain * 100.0
            );
            println!(
                "Mean daily efficiency gain:  {:+.2} points",
                comparison.mean_daily_efficiency_gain * 100.0
            );
            println!("Over-capacity days change:   {:+}", comparison.over_capacity_day_difference);
            println!("Max-capacity days reduced:   {}", capacity.max_capacity_day_reduction);
            println!("Turn-away days reduced:      {}", capacity.turn_away_day_reduction);
            println!("Mean utilization gain:       {:+.2} points", capacity.utilization_gain * 100.0);
            println!();
            println!("Cross-check: {}", cross_check);
        }
    }
    Ok(())
}

fn load(input: &Input) -> Result<(WardConfig, DemandSeries)> {
    let config = match &input.config {
        Some(path) => WardConfig::from_file(path)?,
        None => WardConfig::default(),
    };
    tracing::debug!(?config, "Ward configuration");

    let mut series = read_census(&input.census)?;
    if !input.years.is_empty() {
        series = series.filter_years(&input.years);
        if series.is_empty() {
            bail!("no census days fall in {:?}", input.years);
        }
    }
    Ok((config, series))
}

fn read_census(path: &Path) -> Result<DemandSeries> {
    census::read_csv(path).with_context(|| format!("loading census {}", path.display()))
}

fn describe(configuration: &RoomConfiguration) -> String {
    format!(
        "{} single rooms, {} double rooms ({} beds)",
        configuration.single_rooms(),
        configuration.double_rooms(),
        configuration.total_beds()
    )
}

fn print_evaluation(evaluation: &EvaluationSeries) {
    let summary = evaluation.summary();
    println!("Days:                  {}", summary.days);
    println!("Cumulative efficiency: {:.2}%", summary.cumulative_efficiency * 100.0);
    println!("Mean daily efficiency: {:.2}%", summary.mean_daily_efficiency * 100.0);
    println!(
        "Daily efficiency range: {:.2}% - {:.2}%",
        summary.min_daily_efficiency * 100.0,
        summary.max_daily_efficiency * 100.0
    );
    println!("Wasted beds:           {}", summary.total_wasted_beds);
    println!("Wasted potential:      {}", summary.total_wasted_potential);
    println!("Weighted waste:        {:.2}", summary.weighted_waste);
    if summary.total_doubles_in_singles > 0 {
        println!("Paired in single rooms: {}", summary.total_doubles_in_singles);
    }
    if summary.over_capacity_days > 0 {
        println!(
            "Over-capacity days:    {} ({} patients turned away)",
            summary.over_capacity_days, summary.total_turned_away
        );
    }

    let analysis = WasteAnalysis::from_series(evaluation);
    if let Some(peak) = analysis.peak_wasted_beds {
        println!("Peak wasted beds:      {} on {}", peak.value, peak.date);
    }
    if analysis.longest_bed_waste_streak > 1 {
        println!("Longest waste streak:  {} days", analysis.longest_bed_waste_streak);
    }

    let capacity = CapacityAnalysis::from_series(evaluation);
    println!(
        "Mean utilization:      {:.2}% (sd {:.2})",
        capacity.mean_utilization * 100.0,
        capacity.utilization_std_dev * 100.0
    );
    println!("Days at max capacity:  {}", capacity.max_capacity_dates.len());
    if let Some(first) = capacity.turn_away_dates.first() {
        println!(
            "Turn-away days:        {} (first on {})",
            capacity.turn_away_dates.len(),
            first
        );
    }

    let rolling = rolling_efficiency(evaluation, DEFAULT_ROLLING_WINDOW);
    if let Some(worst) = rolling.iter().min_by(|a, b| a.efficiency.total_cmp(&b.efficiency)) {
        println!(
            "Worst {}-day efficiency: {:.2}% ending {}",
            worst.days,
            worst.efficiency * 100.0,
            worst.date
        );
    }
}

fn print_trends(evaluation: &EvaluationSeries) {
    let trends = monthly_trends(evaluation);
    if trends.len() < 2 {
        return;
    }
    println!();
    println!("{:>8} {:>5} {:>8} {:>10} {:>11}", "month", "days", "wasted", "potential", "efficiency");
    for trend in &trends {
        println!(
            "{:>8} {:>5} {:>8} {:>10} {:>10.2}%",
            trend.label(),
            trend.days,
            trend.wasted_beds,
            trend.wasted_potential,
            trend.period_efficiency * 100.0
        );
    }
}
