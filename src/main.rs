//! CLI entry point for the traffic LOS tool.
//!
//! `calc` turns a raw 15-minute volume export into the hourly LOS table;
//! the other subcommands each read that table and report on it.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use traffic_los::analyzers::aggregate::{classify_intervals, compute_hourly_los, sort_hourly};
use traffic_los::analyzers::average::compute_intersection_averages;
use traffic_los::analyzers::extremes::{DEFAULT_TOP, build_overall, build_per_intersection};
use traffic_los::analyzers::grade::{AVERAGE_BANDS, VOLUME_THRESHOLDS};
use traffic_los::analyzers::profile::compute_hourly_profile;
use traffic_los::analyzers::types::Extreme;
use traffic_los::error::LosError;
use traffic_los::output::{
    load_hourly_results, load_hourly_volumes, write_extremes, write_hourly_results,
    write_intervals, write_rows,
};
use traffic_los::parser::load_and_prepare;
use traffic_los::report::{render_averages, render_extremes, render_hourly, render_profile};

#[derive(Parser)]
#[command(name = "traffic_los")]
#[command(about = "Hourly Level-of-Service grading for intersection volume counts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute hourly LOS by intersection from a raw 15-minute volume export
    Calc {
        /// Path to the raw volume CSV
        #[arg(long, default_value = "volumes.csv", env = "LOS_INPUT_CSV")]
        csv: PathBuf,

        /// Where to write the hourly results table
        #[arg(long, default_value = "los_results.csv", env = "LOS_RESULTS_CSV")]
        out: PathBuf,

        /// Optional: also write the classified 15-minute intervals
        #[arg(long)]
        intervals_out: Option<PathBuf>,
    },
    /// Average hourly LOS score per intersection (no rounding)
    Average {
        /// Hourly LOS results produced by `calc`
        #[arg(long, default_value = "los_results.csv", env = "LOS_RESULTS_CSV")]
        source: PathBuf,

        #[arg(long, default_value = "average_los_by_intersection.csv")]
        out: PathBuf,
    },
    /// Best LOS hours per intersection and overall
    Best {
        /// Hourly LOS results produced by `calc`
        #[arg(long, default_value = "los_results.csv", env = "LOS_RESULTS_CSV")]
        source: PathBuf,

        #[arg(long, default_value = "best_los_summary.csv")]
        out: PathBuf,

        /// Top-N overall entries to display
        #[arg(long, default_value_t = DEFAULT_TOP)]
        top: usize,
    },
    /// Worst LOS hours per intersection and overall
    Worst {
        /// Hourly LOS results produced by `calc`
        #[arg(long, default_value = "los_results.csv", env = "LOS_RESULTS_CSV")]
        source: PathBuf,

        #[arg(long, default_value = "worst_los_summary.csv")]
        out: PathBuf,

        /// Top-N overall entries to display
        #[arg(long, default_value_t = DEFAULT_TOP)]
        top: usize,
    },
    /// Average volume per intersection for each hour of the day
    Profile {
        /// Hourly LOS results produced by `calc`
        #[arg(long, default_value = "los_results.csv", env = "LOS_RESULTS_CSV")]
        source: PathBuf,

        #[arg(long, default_value = "hourly_volume_profile.csv")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    // LOS_INPUT_CSV / LOS_RESULTS_CSV may come from a local .env
    dotenvy::dotenv().ok();

    let file_guard = init_logging()?;
    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        if let Some(LosError::SourceNotFound { .. }) = e.downcast_ref::<LosError>() {
            error!(error = %e, "Upstream hourly results missing");
            println!("{e}");
            drop(file_guard);
            std::process::exit(1);
        }
        return Err(e);
    }

    Ok(())
}

/// Per-stage row counts go to coloured stderr at `info`. The daily JSON file
/// under `LOG_FILE_PATH` also keeps `debug` detail such as dropped rows.
fn init_logging() -> Result<WorkerGuard> {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/traffic_los.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("traffic_los.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(file_guard)
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Calc {
            csv,
            out,
            intervals_out,
        } => {
            let records = load_and_prepare(&csv)?;
            let intervals = classify_intervals(&VOLUME_THRESHOLDS, records);
            if let Some(path) = intervals_out {
                write_intervals(&path, &intervals)?;
            }

            let mut hourly = compute_hourly_los(&intervals);
            sort_hourly(&mut hourly);

            print!("{}", render_hourly(&hourly));
            write_hourly_results(&out, &hourly)?;
            println!("Saved results to {}", out.display());
        }
        Commands::Average { source, out } => {
            let rows = load_hourly_results(&source)?;
            let averages = compute_intersection_averages(&AVERAGE_BANDS, &rows);

            write_rows(&out, &averages)?;
            print!("{}", render_averages(&averages));
            println!("\nSaved intersection averages to {}", out.display());
        }
        Commands::Best { source, out, top } => {
            summarize_extremes(Extreme::Best, &source, &out, top)?;
        }
        Commands::Worst { source, out, top } => {
            summarize_extremes(Extreme::Worst, &source, &out, top)?;
        }
        Commands::Profile { source, out } => {
            let volumes = load_hourly_volumes(&source)?;
            let profile = compute_hourly_profile(&volumes);

            write_rows(&out, &profile)?;
            print!("{}", render_profile(&profile));
            println!("\nSaved hourly volume profile to {}", out.display());
        }
    }

    Ok(())
}

#[tracing::instrument(skip(source, out))]
fn summarize_extremes(extreme: Extreme, source: &Path, out: &Path, top: usize) -> Result<()> {
    let rows = load_hourly_results(source)?;
    let per_intersection = build_per_intersection(extreme, &rows);
    let overall = build_overall(extreme, &rows, top);
    info!(
        intersections = per_intersection.len(),
        overall = overall.len(),
        "Summary built"
    );

    write_extremes(out, extreme, &per_intersection)?;
    print!("{}", render_extremes(extreme, &per_intersection, &overall));
    println!(
        "\nSaved per-intersection {} summary to {}",
        extreme.prefix(),
        out.display()
    );
    Ok(())
}
