//! Domain models for Cadence

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// A bank or manually entered transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    /// Signed amount in currency units
    pub amount: f64,
    #[serde(deserialize_with = "deserialize_date")]
    pub date: NaiveDate,
    pub description: String,
    #[serde(default)]
    pub category: Category,
}

/// Parse a transaction date.
///
/// Accepts `YYYY-MM-DD` and RFC 3339 timestamps (the calendar date is kept).
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .map_err(|_| Error::InvalidData(format!("Invalid date: {:?}", s)))
}

fn deserialize_date<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).map_err(serde::de::Error::custom)
}

/// Spending category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Food,
    Shopping,
    Transportation,
    Entertainment,
    Utilities,
    Housing,
    Health,
    Education,
    Travel,
    Software,
    Income,
    Transfer,
    #[default]
    #[serde(other)]
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Shopping => "shopping",
            Self::Transportation => "transportation",
            Self::Entertainment => "entertainment",
            Self::Utilities => "utilities",
            Self::Housing => "housing",
            Self::Health => "health",
            Self::Education => "education",
            Self::Travel => "travel",
            Self::Software => "software",
            Self::Income => "income",
            Self::Transfer => "transfer",
            Self::Other => "other",
        }
    }

    /// Map a free-form category label (our own names or common bank export
    /// labels like "Food & Drink") onto a category. Unknown labels map to `Other`.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        match label.as_str() {
            "food" | "food & drink" | "groceries" | "restaurants" | "dining" => Self::Food,
            "shopping" | "merchandise" => Self::Shopping,
            "transportation" | "gas" | "automotive" | "auto & transport" => Self::Transportation,
            "entertainment" | "streaming" | "music" => Self::Entertainment,
            "utilities" | "bills & utilities" | "phone" | "internet" => Self::Utilities,
            "housing" | "home" | "rent" | "mortgage" => Self::Housing,
            "health" | "health & wellness" | "fitness" | "medical" => Self::Health,
            "education" => Self::Education,
            "travel" => Self::Travel,
            "software" | "subscriptions" | "professional services" => Self::Software,
            "income" | "payroll" | "deposit" => Self::Income,
            "transfer" | "payment" => Self::Transfer,
            _ => Self::Other,
        }
    }
}

/// A detected recurring charge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    /// Normalized merchant key the subscription was grouped by
    pub merchant: String,
    /// Average of the contributing transaction amounts
    pub amount: f64,
    pub frequency: Frequency,
    pub next_charge: NaiveDate,
    pub category: Category,
    pub status: SubscriptionStatus,
    pub first_detected: DateTime<Utc>,
    pub last_charge: NaiveDate,
    /// Contributing transaction ids, oldest first
    pub transaction_ids: Vec<String>,
    pub cancellable: bool,
    /// One entry per contributing transaction, oldest first
    pub price_history: Vec<PricePoint>,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }
}

/// Subscription billing frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(format!("Unknown frequency: {}", s)),
        }
    }
}

/// Subscription status
///
/// Detection only ever emits `Active`; the other states are set by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Paused,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown subscription status: {}", s)),
        }
    }
}

/// A single observed charge for a subscription
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub amount: f64,
    pub date: NaiveDate,
}

/// Result of comparing the two most recent charges of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceIncrease {
    pub increased: bool,
    pub old_price: f64,
    pub new_price: f64,
    pub percent_increase: f64,
}

/// Cost summary over a set of subscriptions
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionSummary {
    pub total_monthly: f64,
    pub total_yearly: f64,
    pub active_count: usize,
}
