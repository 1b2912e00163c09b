//! Transaction import from CSV and JSON exports
//!
//! CSV files need `date`, `description` and `amount` columns (any order, any
//! case); `category` and `id` are optional. Rows without an id get one derived
//! from a SHA-256 of date, description and amount, so re-importing the same
//! file doesn't duplicate rows.
//!
//! JSON files are an array of transaction objects.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{parse_date, Category, Transaction};

/// Supported import formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Csv,
    Json,
}

impl ImportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        ext.parse().ok()
    }
}

impl std::str::FromStr for ImportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown import format: {}", s)),
        }
    }
}

/// Parse transactions in the given format
pub fn parse<R: Read>(reader: R, format: ImportFormat) -> Result<Vec<Transaction>> {
    match format {
        ImportFormat::Csv => parse_csv(reader),
        ImportFormat::Json => parse_json(reader),
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    id: Option<String>,
    date: String,
    description: String,
    amount: String,
    category: Option<String>,
}

/// Parse a CSV export
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    // Match columns case-insensitively
    let headers: csv::StringRecord = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    for required in ["date", "description", "amount"] {
        if !headers.iter().any(|h| h == required) {
            return Err(Error::InvalidData(format!(
                "CSV is missing a {:?} column",
                required
            )));
        }
    }
    rdr.set_headers(headers);

    let mut transactions = Vec::new();
    for (idx, result) in rdr.deserialize::<CsvRow>().enumerate() {
        // Header is line 1
        let line = idx + 2;
        let row = result?;

        let date = parse_date(&row.date)
            .map_err(|_| Error::InvalidData(format!("Line {}: invalid date {:?}", line, row.date)))?;
        let amount = parse_amount(&row.amount).ok_or_else(|| {
            Error::InvalidData(format!("Line {}: invalid amount {:?}", line, row.amount))
        })?;

        let id = match row.id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => transaction_hash(&row.date, &row.description, amount),
        };

        transactions.push(Transaction {
            id,
            amount,
            date,
            description: row.description,
            category: row
                .category
                .as_deref()
                .map(Category::from_label)
                .unwrap_or_default(),
        });
    }

    info!("Parsed {} transactions from CSV", transactions.len());
    Ok(transactions)
}

/// Parse a JSON array of transactions
pub fn parse_json<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let transactions: Vec<Transaction> = serde_json::from_reader(reader)?;
    info!("Parsed {} transactions from JSON", transactions.len());
    Ok(transactions)
}

/// Parse an amount like "-15.99", "$1,299.00" or "(42.10)"
fn parse_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let (negative, body) = match trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };

    let cleaned: String = body.chars().filter(|c| *c != '$' && *c != ',').collect();
    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// Stable id for a transaction that arrived without one
pub fn transaction_hash(date: &str, description: &str, amount: f64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}|{}|{:.2}", date.trim(), description.trim(), amount));
    let hash = hex::encode(hasher.finalize());
    debug!("Synthesized transaction id {}", &hash[..16]);
    format!("tx-{}", &hash[..16])
}
