//! Detection configuration
//!
//! Thresholds are carried in an explicit [`DetectionConfig`] that callers pass
//! into the detector and cost functions.
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. An explicit path, or the override in the data dir
//!    (~/.local/share/cadence/config/detection.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Keys missing from an override file keep their default values.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/detection.toml");

/// Environment variable naming a config file to load
pub const CONFIG_ENV: &str = "CADENCE_CONFIG";

/// Thresholds for subscription detection and cost normalization
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
    /// Minimum transactions from one merchant to establish recurrence
    pub min_transactions: usize,
    /// Maximum distance (days) of any gap from the average gap
    pub interval_tolerance_days: f64,
    /// Maximum relative distance of any amount from the average amount
    pub amount_tolerance: f64,
    /// Average gaps below this many days are weekly
    pub weekly_max_interval: f64,
    /// Average gaps below this many days (and not weekly) are monthly
    pub monthly_max_interval: f64,
    /// Multiplier turning a weekly amount into a monthly one
    pub weeks_per_month: f64,
    /// Most recent transactions fetched per detection run
    pub transaction_limit: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_transactions: 2,
            interval_tolerance_days: 7.0,
            amount_tolerance: 0.10,
            weekly_max_interval: 10.0,
            monthly_max_interval: 35.0,
            weeks_per_month: 4.33,
            transaction_limit: 500,
        }
    }
}

impl DetectionConfig {
    /// Load config from an explicit path, `CADENCE_CONFIG`, the data-dir
    /// override, or the embedded defaults, in that order.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let candidate = path
            .map(Path::to_path_buf)
            .or(env_path)
            .or_else(|| default_config_path().filter(|p| p.exists()));

        match candidate {
            Some(path) => Self::from_file(&path),
            None => Self::from_toml(DEFAULT_CONFIG),
        }
    }

    /// Load config from a TOML file layered over the embedded defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::InvalidData(format!(
                "Failed to read config {}: {}",
                path.display(),
                e
            ))
        })?;
        debug!("Loaded detection config from {}", path.display());
        Self::from_toml(&content)
    }

    /// Parse config from TOML content, keeping defaults for missing keys
    pub fn from_toml(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;
        let mut config = Self::default();

        if let Some(grouping) = raw.grouping {
            if let Some(min) = grouping.min_transactions {
                config.min_transactions = min;
            }
        }

        if let Some(interval) = raw.interval {
            if let Some(days) = interval.tolerance_days {
                config.interval_tolerance_days = days;
            }
            if let Some(days) = interval.weekly_max_days {
                config.weekly_max_interval = days;
            }
            if let Some(days) = interval.monthly_max_days {
                config.monthly_max_interval = days;
            }
        }

        if let Some(amount) = raw.amount {
            if let Some(tolerance) = amount.tolerance {
                config.amount_tolerance = tolerance;
            }
        }

        if let Some(cost) = raw.cost {
            if let Some(weeks) = cost.weeks_per_month {
                config.weeks_per_month = weeks;
            }
        }

        if let Some(fetch) = raw.fetch {
            if let Some(limit) = fetch.transaction_limit {
                config.transaction_limit = limit;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject threshold combinations the detector cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.min_transactions < 2 {
            return Err(Error::InvalidData(
                "min_transactions must be at least 2".to_string(),
            ));
        }
        if !(self.interval_tolerance_days >= 0.0) {
            return Err(Error::InvalidData(
                "interval tolerance_days must be non-negative".to_string(),
            ));
        }
        if !(self.amount_tolerance >= 0.0) {
            return Err(Error::InvalidData(
                "amount tolerance must be non-negative".to_string(),
            ));
        }
        if !(self.weekly_max_interval > 0.0 && self.weekly_max_interval < self.monthly_max_interval)
        {
            return Err(Error::InvalidData(format!(
                "weekly_max_days ({}) must be positive and below monthly_max_days ({})",
                self.weekly_max_interval, self.monthly_max_interval
            )));
        }
        if !(self.weeks_per_month > 0.0) {
            return Err(Error::InvalidData(
                "weeks_per_month must be positive".to_string(),
            ));
        }
        if self.transaction_limit == 0 {
            return Err(Error::InvalidData(
                "transaction_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("cadence").join("config").join("detection.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    grouping: Option<RawGrouping>,
    interval: Option<RawInterval>,
    amount: Option<RawAmount>,
    cost: Option<RawCost>,
    fetch: Option<RawFetch>,
}

#[derive(Debug, Deserialize)]
struct RawGrouping {
    min_transactions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawInterval {
    tolerance_days: Option<f64>,
    weekly_max_days: Option<f64>,
    monthly_max_days: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawAmount {
    tolerance: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawCost {
    weeks_per_month: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawFetch {
    transaction_limit: Option<usize>,
}
