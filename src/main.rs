use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use appcast_extract::{extract_releases, parse_document, FeedNamespaces, ParseMode};

#[derive(Parser, Debug)]
#[command(
    name = "appcast-extract",
    about = "Extracts release metadata from a Sparkle appcast feed as compact JSON",
    version
)]
struct Args {
    /// Path to the appcast XML file
    path: PathBuf,

    /// Reject the document on the first structural error instead of
    /// attempting best-effort repair
    #[arg(long)]
    strict: bool,
}

fn main() -> Result<()> {
    // Logging goes to stderr; stdout carries only the JSON result.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let bytes = std::fs::read(&args.path)
        .with_context(|| format!("Failed to read feed file '{}'", args.path.display()))?;

    let mode = if args.strict {
        ParseMode::Strict
    } else {
        ParseMode::Recover
    };
    let root = parse_document(&bytes, mode)
        .with_context(|| format!("Failed to parse feed '{}'", args.path.display()))?;

    let namespaces = FeedNamespaces::resolve(&bytes, &root);
    let releases = extract_releases(&root, &namespaces);
    tracing::debug!(count = releases.len(), "extraction finished");

    let json = serde_json::to_string(&releases).context("Failed to serialize releases")?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", json).context("Failed to write output")?;

    Ok(())
}
