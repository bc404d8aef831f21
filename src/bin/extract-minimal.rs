use anyhow::{Context, Result};
use clap::Parser;
use jsonl_tools::{extract_file, logging, Config};
use std::path::PathBuf;
use tracing::info;

/// Extract a minimal barcode -> (score, name) mapping from an Open Food Facts dump.
#[derive(Parser, Debug)]
#[command(
    name = "extract-minimal",
    version,
    about = "Extract minimal barcode→(score,name) mapping from Open Food Facts dump"
)]
struct Cli {
    /// Path to openfoodfacts-products.jsonl dump
    input: PathBuf,

    /// Path to write minimal JSONL mapping
    output: PathBuf,

    /// Optional TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Flush the output every N written entries (overrides config)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    flush_every: Option<u64>,

    /// Also write JSON logs to a daily-rotated file in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Print the per-reason breakdown of skipped lines
    #[arg(long)]
    stats: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    let _guard = logging::init_logging(args.log_dir.as_deref(), "extract-minimal");

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(n) = args.flush_every {
        config.extract.flush_every = n;
    }
    info!(flush_every = config.extract.flush_every, "Starting extract");

    let summary = extract_file(&args.input, &args.output, &config).with_context(|| {
        format!(
            "Failed to extract {} into {}",
            args.input.display(),
            args.output.display()
        )
    })?;

    println!("{summary}");
    if args.stats {
        println!("{}", summary.stats);
    }
    Ok(())
}
