// Main entrypoint for the oocmeans CLI.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use oocmeans::config::Configuration;
use oocmeans::distance::DistanceKind;
use oocmeans::paths::{derived_path, result_path};
use oocmeans::seeding::SeederKind;
use oocmeans::storage::StorageFormat;
use oocmeans::{driver, Lloyd, Progress};

/// oocmeans - out-of-core k-means over columnar shards
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Points file (.parquet, .arrow, .arrows or .csv)
    #[arg(long, value_name = "FILE")]
    input: PathBuf,

    /// Number of clusters (>= 2)
    #[arg(long)]
    k: usize,

    /// Feature column; repeatable. Defaults to every non-reserved column of
    /// the first shard.
    #[arg(long = "columns", value_name = "NAME")]
    columns: Vec<String>,

    /// Seeding algorithm: afk-mc2, k-mc2, k-means++, k-means||, naive
    #[arg(long, default_value = "afk-mc2")]
    seeder: String,

    /// Distance function: emd, euclidean, manhattan, chebyshev
    #[arg(long, default_value = "emd")]
    distance: String,

    /// Working storage format: parquet, arrow, arrows, csv
    #[arg(long, default_value = "parquet")]
    format: String,

    /// Markov chain length m for the mc² seeders
    #[arg(long = "chain-length", value_name = "M")]
    chain_length: Option<usize>,

    /// Dataset size estimate n̂ when the format cannot count rows cheaply
    #[arg(long = "size-estimate", value_name = "N")]
    size_estimate: Option<u64>,

    /// Lloyd iteration cap
    #[arg(long = "max-iterations", default_value_t = 100)]
    max_iterations: usize,

    /// RNG seed; fixing it makes seeding reproducible
    #[arg(long)]
    seed: Option<u64>,

    /// Force the scalar distance path
    #[arg(long = "no-accelerator")]
    no_accelerator: bool,

    /// Suppress the progress bar
    #[arg(long)]
    quiet: bool,
}

/// Logs go to stderr; stdout is reserved for the progress bar.
fn configure_logger() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(args: &Args) -> Result<Configuration> {
    let distance = DistanceKind::from_key(&args.distance)?;
    let mut config = Configuration::new(&args.input, args.k).with_distance(distance);
    config.seeder = SeederKind::from_key(&args.seeder)?;
    config.format = StorageFormat::from_key(&args.format)?;
    config.chain_length = args.chain_length;
    config.size_estimate = args.size_estimate;
    config.columns = args.columns.clone();
    config.max_iterations = args.max_iterations;
    config.rng_seed = args.seed;
    if args.no_accelerator {
        config.use_accelerator = false;
    }
    config.validate()?;
    Ok(config)
}

fn run(args: Args) -> Result<()> {
    let config = build_config(&args)?;
    let format = config.format;
    let input = config.input.clone();

    let progress = if args.quiet {
        Progress::hidden()
    } else {
        Progress::stdout()
    };
    let result = Lloyd::from_path(config)
        .context("failed to start the run")?
        .with_progress(progress)
        .run()
        .context("clustering failed")?;

    let centroids_out = derived_path(&input, "centroids", format);
    driver::write_centroids(&result, &centroids_out)
        .with_context(|| format!("failed to write {}", centroids_out.display()))?;

    let assignments_out = derived_path(&input, "assignments", format);
    driver::write_assignments(&result, &input, &assignments_out)
        .with_context(|| format!("failed to write {}", assignments_out.display()))?;

    let result_out = result_path(&input);
    result
        .save(&result_out)
        .with_context(|| format!("failed to write {}", result_out.display()))?;

    info!(
        component = "main",
        event = "run_complete",
        cost = result.cost,
        centroids = %centroids_out.display(),
        assignments = %assignments_out.display(),
        result = %result_out.display(),
        "clustering finished"
    );
    Ok(())
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version print on stdout and succeed; everything
            // else is a usage error.
            let usage = e.use_stderr();
            let _ = e.print();
            std::process::exit(if usage { 1 } else { 0 });
        }
    };

    configure_logger();
    if let Err(e) = run(args) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
