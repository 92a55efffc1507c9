use autodash::filter::{PriceRange, TypeSelection, YearRange};
use autodash::prepare::{PrepareOptions, DEFAULT_REFERENCE_YEAR};
use autodash::runner::{self, RunOverrides};
use clap::{Parser, Subcommand, ValueEnum};
use miette::Result;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Clone, ValueEnum, Debug)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "autodash")]
#[command(version = "0.1.0")]
#[command(about = "Vehicle listings dashboard: clean, filter and chart a listings CSV", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase logging verbosity (Info -> Debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Silence all logs
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format (text or json)
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Year vehicle age is measured from
    #[arg(long, global = true)]
    reference_year: Option<i64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one dashboard pass from a YAML dashboard file
    Run {
        /// Path to the dashboard YAML file
        #[arg(value_name = "DASHBOARD_FILE")]
        dashboard: PathBuf,

        /// Vehicle type to show ("All" for every type)
        #[arg(long = "type", value_name = "TYPE")]
        selected_type: Option<String>,

        /// Inclusive price range, e.g. 1000,20000
        #[arg(long, value_name = "MIN,MAX", value_parser = parse_range::<f64>)]
        price_range: Option<(f64, f64)>,

        /// Inclusive model year range, e.g. 2005,2020
        #[arg(long, value_name = "MIN,MAX", value_parser = parse_range::<i64>)]
        year_range: Option<(i64, i64)>,
    },
    /// Clean a listings CSV and print the sidebar choices it offers
    Inspect {
        #[arg(value_name = "CSV")]
        input: PathBuf,
    },
}

fn parse_range<T: FromStr + Clone + Send + Sync + 'static>(
    s: &str,
) -> std::result::Result<(T, T), String> {
    let (min, max) = s
        .split_once(',')
        .ok_or_else(|| format!("expected MIN,MAX but got '{}'", s))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<T>()
            .map_err(|_| format!("'{}' is not a valid number", v.trim()))
    };
    Ok((parse(min)?, parse(max)?))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    // AUTODASH_LOG wins over the CLI flags
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var("AUTODASH_LOG")
        .from_env_lossy();

    let run_id = Uuid::new_v4();

    match cli.log_format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_span_list(false)
                .with_current_span(false)
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    let _span = tracing::info_span!("root", run_id = %run_id).entered();

    match cli.command {
        Commands::Run {
            dashboard,
            selected_type,
            price_range,
            year_range,
        } => {
            let overrides = RunOverrides {
                selected_type: selected_type.map(TypeSelection::from),
                price_range: price_range.map(PriceRange::from),
                year_range: year_range.map(YearRange::from),
                reference_year: cli.reference_year,
            };
            let report = runner::execution_pipeline(&dashboard, run_id, overrides)?;
            println!(
                "{} of {} listings shown",
                report.metrics.rows_shown, report.metrics.rows_cleaned
            );
        }
        Commands::Inspect { input } => {
            let options = PrepareOptions {
                reference_year: cli.reference_year.unwrap_or(DEFAULT_REFERENCE_YEAR),
            };
            let (rows, sidebar) = runner::inspect(&input, options)?;
            println!("Cleaned listings: {}", rows);
            println!("Vehicle types:    {}", sidebar.type_options.join(", "));
            match sidebar.price_bounds {
                Some(range) => println!("Price range:      {} - {}", range.min, range.max),
                None => println!("Price range:      n/a"),
            }
            match sidebar.year_bounds {
                Some(range) => println!("Model year range: {} - {}", range.min, range.max),
                None => println!("Model year range: n/a"),
            }
        }
    }

    Ok(())
}
