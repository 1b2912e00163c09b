//! Subscription command implementations

use anyhow::{Context, Result};
use cadence_core::db::Database;
use cadence_core::detect_price_increases;
use cadence_core::models::{Subscription, SubscriptionStatus};

use super::truncate;

/// Print one line per subscription
pub fn print_subscriptions(subscriptions: &[Subscription]) {
    println!();
    println!("📋 Subscriptions");
    println!("   ─────────────────────────────────────────────────────────────");

    for sub in subscriptions {
        let status_icon = match sub.status {
            SubscriptionStatus::Active => "✅",
            SubscriptionStatus::Paused => "⏸️ ",
            SubscriptionStatus::Cancelled => "❌",
        };

        println!(
            "   {} {:20} │ {:>8}/{:<7} │ next {} │ {}",
            status_icon,
            truncate(&sub.merchant, 20),
            format!("${:.2}", sub.amount),
            sub.frequency.as_str(),
            sub.next_charge,
            sub.id
        );
    }
}

pub fn cmd_subscriptions_list(db: &Database) -> Result<()> {
    let subscriptions = db.list_subscriptions(None)?;

    if subscriptions.is_empty() {
        println!("No subscriptions detected yet. Run:");
        println!("  cadence detect");
        return Ok(());
    }

    print_subscriptions(&subscriptions);
    Ok(())
}

pub fn cmd_subscriptions_increases(db: &Database) -> Result<()> {
    let subscriptions = db.list_subscriptions(Some(SubscriptionStatus::Active))?;
    let increases = detect_price_increases(&subscriptions);

    if increases.is_empty() {
        println!("✅ No price increases on active subscriptions.");
        return Ok(());
    }

    println!();
    println!("📈 Price Increases");
    println!("   ─────────────────────────────────────────────────────────────");

    for (sub, increase) in increases {
        let percent = if increase.percent_increase.is_finite() {
            format!("+{:.1}%", increase.percent_increase)
        } else {
            "new charge".to_string()
        };

        println!(
            "   {:20} │ ${:.2} → ${:.2} │ {}",
            truncate(&sub.merchant, 20),
            increase.old_price,
            increase.new_price,
            percent
        );
    }

    Ok(())
}

pub fn cmd_subscriptions_set_status(
    db: &Database,
    id: &str,
    status: SubscriptionStatus,
) -> Result<()> {
    db.update_subscription_status(id, status)
        .with_context(|| format!("Failed to update subscription {}", id))?;

    println!("✅ Subscription {} marked {}", id, status.as_str());
    if status == SubscriptionStatus::Active {
        println!("   It counts toward your totals again.");
    } else {
        println!("   It no longer counts toward your totals.");
    }

    Ok(())
}

pub fn cmd_subscriptions_delete(db: &Database, id: &str) -> Result<()> {
    db.delete_subscription(id)
        .with_context(|| format!("Failed to delete subscription {}", id))?;

    println!("🗑️  Deleted subscription {}", id);
    println!("   It will come back on the next 'cadence detect' if the charges keep recurring.");

    Ok(())
}
