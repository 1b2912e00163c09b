//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_config` - Shared utility to load detection thresholds
//! - `cmd_init` - Initialize the database
//! - `cmd_detect` - Run subscription detection
//! - `cmd_summary` - Print cost totals

use std::path::Path;

use anyhow::{Context, Result};
use cadence_core::{db::Database, summarize, DetectionConfig, SubscriptionDetector};
use tracing::debug;

use super::subscriptions::print_subscriptions;

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .with_context(|| format!("Database path is not valid UTF-8: {}", db_path.display()))?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Load detection thresholds (explicit path, env, data dir, or defaults)
pub fn load_config(path: Option<&Path>) -> Result<DetectionConfig> {
    let config = DetectionConfig::load(path).context("Failed to load detection config")?;
    config.validate().context("Invalid detection config")?;
    debug!("Detection config: {:?}", config);
    Ok(config)
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;
    let count = db.count_transactions()?;
    println!("   Transactions stored: {}", count);

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Import transactions: cadence import --file statement.csv");
    println!("  2. Find subscriptions:  cadence detect");

    Ok(())
}

pub fn cmd_detect(
    db: &Database,
    config: &DetectionConfig,
    limit: Option<usize>,
    dry_run: bool,
) -> Result<()> {
    let limit = limit.unwrap_or(config.transaction_limit).max(1);
    println!("🔍 Scanning the {} most recent transactions...", limit);

    let transactions = db.list_recent_transactions(limit)?;
    if transactions.is_empty() {
        println!("No transactions yet. Run:");
        println!("  cadence import --file statement.csv");
        return Ok(());
    }

    let detected = SubscriptionDetector::with_config(config.clone()).detect(&transactions);

    let subscriptions = if dry_run {
        println!("   Dry run: nothing will be saved");
        detected
    } else {
        let ids = db
            .upsert_subscriptions(&detected)
            .context("Failed to save subscriptions")?;
        let mut stored = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(sub) = db.get_subscription(id)? {
                stored.push(sub);
            }
        }
        stored
    };

    println!();
    println!("📊 Detection Results");
    println!("   ─────────────────────────────");
    println!("   Transactions scanned: {}", transactions.len());
    println!("   Subscriptions found:  {}", subscriptions.len());

    if subscriptions.is_empty() {
        println!();
        println!("✅ No recurring charges found.");
        return Ok(());
    }

    print_subscriptions(&subscriptions);

    let summary = summarize(&subscriptions, config);
    println!();
    println!(
        "   💰 Monthly total: ${:.2} ({} active)",
        summary.total_monthly, summary.active_count
    );

    Ok(())
}

pub fn cmd_summary(db: &Database, config: &DetectionConfig) -> Result<()> {
    let subscriptions = db.list_subscriptions(None)?;
    let summary = summarize(&subscriptions, config);

    println!();
    println!("💰 Subscription Costs");
    println!("   ─────────────────────────────");
    println!("   Active subscriptions: {}", summary.active_count);
    println!("   Monthly:  ${:>10.2}", summary.total_monthly);
    println!("   Yearly:   ${:>10.2}", summary.total_yearly);

    let inactive = subscriptions.len() - summary.active_count;
    if inactive > 0 {
        println!("   ({} paused or cancelled, not counted)", inactive);
    }

    Ok(())
}
