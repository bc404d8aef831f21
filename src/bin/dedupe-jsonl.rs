use anyhow::{Context, Result};
use clap::Parser;
use jsonl_tools::{dedupe_file, logging, Config};
use std::path::PathBuf;
use tracing::info;

/// Dedupe JSONL entries by their 'code' field, keeping the first occurrence.
#[derive(Parser, Debug)]
#[command(name = "dedupe-jsonl", version, about = "Dedupe JSONL entries by 'code' field")]
struct Cli {
    /// Input JSONL path
    input: PathBuf,

    /// Output JSONL path (truncated if it exists)
    output: PathBuf,

    /// Optional TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write JSON logs to a daily-rotated file in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Print the per-reason breakdown of skipped lines
    #[arg(long)]
    stats: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    let _guard = logging::init_logging(args.log_dir.as_deref(), "dedupe-jsonl");

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    info!(key_field = %config.dedupe.key_field, "Starting dedupe");

    let summary = dedupe_file(&args.input, &args.output, &config).with_context(|| {
        format!(
            "Failed to dedupe {} into {}",
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
