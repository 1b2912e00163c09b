//! Import command implementation

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use cadence_core::db::{Database, InsertStats};
use cadence_core::import::{self, ImportFormat};

pub fn cmd_import(db: &Database, file: &Path, format: Option<&str>) -> Result<InsertStats> {
    let format = match format {
        Some(f) => f.parse::<ImportFormat>().map_err(|e| anyhow::anyhow!(e))?,
        None => ImportFormat::from_path(file).ok_or_else(|| {
            anyhow::anyhow!(
                "Could not guess the format of {}.\n\
                 Specify --format with one of: csv, json",
                file.display()
            )
        })?,
    };

    println!(
        "📥 Importing {} from {}...",
        format.as_str().to_uppercase(),
        file.display()
    );

    let reader = BufReader::new(
        File::open(file).with_context(|| format!("Failed to open file: {}", file.display()))?,
    );
    let transactions = import::parse(reader, format)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    let stats = db
        .insert_transactions(&transactions)
        .context("Failed to store transactions")?;

    println!("   Parsed: {}", transactions.len());
    println!("   ✅ Imported: {}", stats.inserted);
    if stats.skipped > 0 {
        println!("   ⏭️  Skipped (already imported): {}", stats.skipped);
    }
    println!();
    println!("Next: cadence detect");

    Ok(stats)
}
