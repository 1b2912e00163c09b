//! Cadence Core Library
//!
//! Shared functionality for the Cadence recurring-charge tracker:
//! - Merchant normalization and subscription detection
//! - Monthly cost normalization and price increase checks
//! - Detection thresholds loaded from TOML
//! - Database access and migrations
//! - CSV and JSON transaction import

pub mod config;
pub mod cost;
pub mod db;
pub mod detect;
pub mod error;
pub mod import;
pub mod models;

pub use config::DetectionConfig;
pub use cost::{calculate_monthly_total, calculate_monthly_total_with, summarize};
pub use db::Database;
pub use detect::{
    detect_price_increase, detect_price_increases, detect_subscriptions, normalize_merchant,
    SubscriptionDetector,
};
pub use error::{Error, Result};
pub use models::{
    Category, Frequency, PriceIncrease, PricePoint, Subscription, SubscriptionStatus,
    SubscriptionSummary, Transaction,
};
