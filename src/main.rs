use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use alloc_diff::{
    alloc::{self, Allocator, MemoryStats},
    report::{self, ReportError},
    threshold::{SlowdownError, SlowdownThreshold, ThresholdFor},
    BenchError, DualAllocatorDriver, RunConfig, RunConfigBuilder, RunSummary, SizeMode,
};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Run(#[from] BenchError),
    #[error("regression detected: {0}")]
    Regression(#[from] SlowdownError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Candidate {
    /// Platform allocator with memory accounting
    Tracing,
    /// Plain platform allocator
    System,
}

/// Compares a candidate allocator against the platform allocator on a
/// randomized allocate/free workload.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Block sizes: 1/small (20-39 B), 2/large (100-1000 B), 3/random (16 B-16 KiB)
    #[arg(short, long, env = "ALLOC_DIFF_MODE")]
    mode: SizeMode,
    /// Number of allocate/free requests, at most 100000
    #[arg(short = 'n', long, env = "ALLOC_DIFF_OPERATIONS")]
    operations: usize,
    /// Seed for a reproducible workload; the wall clock is used otherwise
    #[arg(short, long, env = "ALLOC_DIFF_SEED")]
    seed: Option<u64>,
    #[arg(short, long, value_enum, default_value_t = Candidate::Tracing)]
    candidate: Candidate,
    /// Fail if the candidate is slower than the baseline by more than this percentage
    #[arg(long, value_name = "PERCENT")]
    max_slowdown: Option<u64>,
    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
    /// Write the summary to a TOML file
    #[arg(long, value_name = "FILE")]
    save_report: Option<PathBuf>,
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), CliError> {
    let mut builder = RunConfigBuilder::default();
    builder.mode(args.mode).operation_count(args.operations);
    if let Some(seed) = args.seed {
        builder.seed(seed);
    }
    let config = builder
        .build()
        .unwrap_or_else(|e| unreachable!("every field of the config is set: {e}"));
    config.validate()?;

    let summary = match args.candidate {
        Candidate::Tracing => {
            let mut driver =
                DualAllocatorDriver::from_config(&config, alloc::tracing_system(), alloc::system());
            let summary = driver.run(config.mode, config.operation_count)?;
            let stats = driver.candidate().inner().hooks().stats();
            print_stats(&stats);
            summary
        }
        Candidate::System => run_with(&config, alloc::system())?,
    };

    if args.json {
        println!("{}", report::to_json(&summary)?);
    } else {
        println!("Test case finished successfully.\n{summary}");
    }

    if let Some(path) = &args.save_report {
        report::save_report(&summary, path)?;
        info!(path = %path.display(), "saved run report");
    }

    if let Some(percent) = args.max_slowdown {
        SlowdownThreshold::percent(percent).check_threshold(&summary.result)?;
    }
    Ok(())
}

fn run_with<C: Allocator>(config: &RunConfig, candidate: C) -> Result<RunSummary, BenchError> {
    DualAllocatorDriver::from_config(config, candidate, alloc::system())
        .run(config.mode, config.operation_count)
}

fn print_stats(stats: &MemoryStats) {
    info!("candidate memory profile:\n{stats}");
}
