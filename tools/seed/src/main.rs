//! Seeding tool for the Otosearch specification store.
//!
//! Batch-parses the Stanford Cars specification CSV and upserts one
//! record per car into the keyed store, keyed with the same
//! sanitization rule the lookup path uses. Run once after the store
//! comes up; records are read-only afterwards.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use otosearch_specs::dataset::{read_spec_csv, record_from_row};
use otosearch_specs::{RedisSpecStore, SpecStore};

/// Seed the specification store from CSV
#[derive(Parser, Debug)]
#[command(name = "seed")]
#[command(about = "Seed the Otosearch specification store from a CSV dataset")]
struct Cli {
    /// Path to the specification CSV
    #[arg(short, long)]
    csv: PathBuf,

    /// Redis URL for the specification store
    #[arg(long, env = "REDIS_URL", default_value = "redis://localhost:6379")]
    redis_url: String,

    /// Parse and print records without writing to the store
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .compact()
        .init();

    let rows = read_spec_csv(&cli.csv)
        .with_context(|| format!("reading spec CSV from {}", cli.csv.display()))?;
    info!("Loaded {} rows from {}", rows.len(), cli.csv.display());

    if cli.dry_run {
        for row in &rows {
            let (key, record) = record_from_row(row);
            println!(
                "{} -> {} {} ({}) [{}]",
                key, record.make, record.model, record.year, record.body_type
            );
        }
        info!("Dry run: parsed {} records, nothing written", rows.len());
        return Ok(());
    }

    let store = RedisSpecStore::new(&cli.redis_url)
        .await
        .with_context(|| format!("connecting to spec store at {}", cli.redis_url))?;

    let progress = ProgressBar::new(rows.len() as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("#>-"),
    );

    let mut written = 0usize;
    for row in &rows {
        let (key, record) = record_from_row(row);
        store
            .put(&key, &record)
            .await
            .with_context(|| format!("writing record for {}", key))?;
        written += 1;
        progress.inc(1);
    }
    progress.finish_with_message("done");

    info!("Seeded {} car records into the spec store", written);
    Ok(())
}
