//! Hospital Outcomes CLI
//!
//! Queries hospital 30-day mortality rankings from a quality-of-care CSV.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use hospital_outcomes::charts::HistogramRenderer;
use hospital_outcomes::data::{
    ColumnBindings, MeasuresLoader, OutcomeMeasure, Reshaper, DEFAULT_NA_TOKEN,
};
use hospital_outcomes::query::{RankSelector, Rankings};
use hospital_outcomes::stats::{RateStats, StatsCalculator};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "hospital-outcomes",
    version,
    about = "Hospital 30-day mortality rankings from quality-of-care measures"
)]
struct Cli {
    /// Path to the quality-of-care measures CSV
    #[arg(short, long)]
    data: PathBuf,

    /// Token marking missing rate values in the source file
    #[arg(long, default_value = DEFAULT_NA_TOKEN)]
    na_token: String,

    /// JSON file overriding the default column bindings
    #[arg(long)]
    columns: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print row count and column names of the raw file
    Inspect,
    /// Best hospital in a state for an outcome
    Best {
        #[arg(short, long)]
        state: String,
        #[arg(short, long)]
        outcome: String,
    },
    /// Hospital at a given rank in a state for an outcome
    Rank {
        #[arg(short, long)]
        state: String,
        #[arg(short, long)]
        outcome: String,
        /// A positive integer, "best" or "worst"
        #[arg(short, long)]
        num: String,
    },
    /// Hospital at a given rank in every recognized state for an outcome
    RankAll {
        #[arg(short, long)]
        outcome: String,
        /// A positive integer, "best" or "worst"
        #[arg(short, long)]
        num: String,
    },
    /// Descriptive statistics of the 30-day rates for an outcome
    Summary {
        #[arg(short, long)]
        outcome: String,
        /// Restrict to a single state
        #[arg(short, long)]
        state: Option<String>,
    },
    /// Render the rate distribution for an outcome as a PNG histogram
    Plot {
        #[arg(short, long)]
        outcome: String,
        /// Output PNG path
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 800)]
        width: u32,
        #[arg(long, default_value_t = 600)]
        height: u32,
    },
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let cli = Cli::parse();

    let mut loader = MeasuresLoader::new().with_na_token(&cli.na_token);
    let data_path = cli.data.to_string_lossy();
    loader
        .load_csv(&data_path)
        .with_context(|| format!("loading {}", cli.data.display()))?;

    let bindings = match &cli.columns {
        Some(path) => ColumnBindings::from_json_file(path)
            .with_context(|| format!("reading column bindings from {}", path.display()))?,
        None => ColumnBindings::default(),
    };

    let raw = loader.get_dataframe().context("no data loaded")?;
    let table = Reshaper::build_outcome_table(raw, &bindings)?;

    match cli.command {
        Command::Inspect => {
            println!("rows: {}", loader.get_row_count());
            for name in loader.get_columns() {
                println!("{name}");
            }
        }
        Command::Best { state, outcome } => {
            print_hospital(Rankings::best(&table, &state, &outcome)?);
        }
        Command::Rank {
            state,
            outcome,
            num,
        } => {
            let rank: RankSelector = num.parse()?;
            print_hospital(Rankings::rank_hospital(&table, &state, &outcome, rank)?);
        }
        Command::RankAll { outcome, num } => {
            let rank: RankSelector = num.parse()?;
            for entry in Rankings::rank_all(&table, &outcome, rank)? {
                println!("{}  {}", entry.state, entry.hospital.as_deref().unwrap_or("-"));
            }
        }
        Command::Summary { outcome, state } => {
            let measure = parse_measure(&outcome)?;
            match state {
                Some(state) => {
                    let rates = StatsCalculator::rates_for_state_and_outcome(
                        &table, &state, measure,
                    );
                    print_summary(&state, &StatsCalculator::compute_rate_stats(&rates));
                }
                None => {
                    for (state, stats) in StatsCalculator::state_summaries(&table, measure) {
                        print_summary(&state, &stats);
                    }
                }
            }
        }
        Command::Plot {
            outcome,
            out,
            width,
            height,
        } => {
            let measure = parse_measure(&outcome)?;
            HistogramRenderer::render_rate_histogram(&table, measure, &out, width, height)?;
            println!("wrote {}", out.display());
        }
    }

    Ok(())
}

fn parse_measure(outcome: &str) -> Result<OutcomeMeasure> {
    OutcomeMeasure::from_name(outcome).ok_or_else(|| anyhow!("invalid outcome '{outcome}'"))
}

fn print_hospital(hospital: Option<String>) {
    match hospital {
        Some(name) => println!("{name}"),
        None => println!("no matching hospital"),
    }
}

fn print_summary(state: &str, stats: &RateStats) {
    println!(
        "{state}: n={} mean={:.2} median={:.2} std={:.2} p05={:.2} p95={:.2} min={:.2} max={:.2}",
        stats.count,
        stats.mean,
        stats.median,
        stats.std,
        stats.p05,
        stats.p95,
        stats.min,
        stats.max
    );
}
