use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use legal_ner_trainer::convert::convert_indian;
use tracing_subscriber::EnvFilter;

/// Convert Indian judgement documents to pre-tokenized JSON Lines
#[derive(Debug, Parser)]
#[command(name = "convert_dataset")]
#[command(version)]
struct Args {
    /// JSON array of documents (Label Studio export or flat form)
    #[arg(long)]
    input: PathBuf,

    /// Output JSON Lines file
    #[arg(long)]
    output: PathBuf,

    /// Relabel into the common type set of the combined dataset
    #[arg(long)]
    common: bool,

    /// Write alignment warnings as JSON to this file
    #[arg(long)]
    warnings: Option<PathBuf>,
}

fn convert(args: &Args) -> anyhow::Result<()> {
    let summary = convert_indian(&args.input, &args.output, args.common)?;
    if let Some(path) = &args.warnings {
        let json = serde_json::to_string_pretty(&summary.warnings)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    }
    println!(
        "Wrote {} sequences to {} ({} skipped, {} warnings)",
        summary.sequences,
        args.output.display(),
        summary.skipped,
        summary.warnings.len()
    );
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = convert(&Args::parse()) {
        eprintln!("Conversion failed: {e:#}");
        std::process::exit(1);
    }
}
