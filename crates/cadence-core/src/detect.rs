//! Recurring charge detection
//!
//! Detects:
//! - Subscriptions: charges from one merchant at regular intervals with stable amounts
//! - Price increases: subscriptions whose latest charge is higher than the one before
//!
//! Detection is a pure pass over in-memory transactions. Groups that don't
//! look recurring are dropped silently (logged at debug level), so ambiguous
//! merchants read as "not a subscription" rather than as errors.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::config::DetectionConfig;
use crate::models::{
    Frequency, PriceIncrease, PricePoint, Subscription, SubscriptionStatus, Transaction,
};

/// Reduce a transaction description to a merchant grouping key
///
/// Lowercases, drops digits and anything outside `a-z` and whitespace, then
/// keeps the first two words. Punctuation is removed without splitting, so
/// "NETFLIX.COM" becomes "netflixcom" rather than "netflix com".
pub fn normalize_merchant(description: &str) -> String {
    let cleaned: String = description
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_whitespace())
        .collect();

    cleaned
        .split_whitespace()
        .take(2)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build a subscription id from the merchant key and detection time
pub fn subscription_id(merchant: &str, detected_at: DateTime<Utc>) -> String {
    let slug = merchant.split_whitespace().collect::<Vec<_>>().join("-");
    format!("{}-{}", slug, detected_at.timestamp_millis())
}

/// Detect subscriptions with default thresholds, stamped with the current time
pub fn detect_subscriptions(transactions: &[Transaction]) -> Vec<Subscription> {
    SubscriptionDetector::new().detect(transactions)
}

/// Groups transactions by merchant and keeps the groups that recur
#[derive(Debug, Clone, Default)]
pub struct SubscriptionDetector {
    config: DetectionConfig,
}

impl SubscriptionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Run detection stamped with the current time
    pub fn detect(&self, transactions: &[Transaction]) -> Vec<Subscription> {
        self.detect_at(transactions, Utc::now())
    }

    /// Run detection with an explicit detection timestamp
    ///
    /// The timestamp feeds `first_detected` and the synthesized ids, so a fixed
    /// value makes the output fully deterministic. Results are ordered by
    /// merchant key.
    pub fn detect_at(
        &self,
        transactions: &[Transaction],
        detected_at: DateTime<Utc>,
    ) -> Vec<Subscription> {
        let mut by_merchant: BTreeMap<String, Vec<&Transaction>> = BTreeMap::new();
        for tx in transactions {
            by_merchant
                .entry(normalize_merchant(&tx.description))
                .or_default()
                .push(tx);
        }

        let groups = by_merchant.len();
        let subscriptions: Vec<Subscription> = by_merchant
            .into_iter()
            .filter_map(|(merchant, txs)| self.detect_group(merchant, txs, detected_at))
            .collect();

        info!(
            "Detection complete: {} transactions, {} merchants, {} subscriptions",
            transactions.len(),
            groups,
            subscriptions.len()
        );

        subscriptions
    }

    fn detect_group(
        &self,
        merchant: String,
        mut txs: Vec<&Transaction>,
        detected_at: DateTime<Utc>,
    ) -> Option<Subscription> {
        if txs.len() < self.config.min_transactions {
            debug!(
                "Skipping {:?} - {} transaction(s), need {}",
                merchant,
                txs.len(),
                self.config.min_transactions
            );
            return None;
        }

        txs.sort_by_key(|tx| tx.date);

        let gaps: Vec<f64> = txs
            .windows(2)
            .map(|w| (w[1].date - w[0].date).num_days() as f64)
            .collect();
        let avg_interval = mean(&gaps);

        if let Some(gap) = gaps
            .iter()
            .find(|&&gap| (gap - avg_interval).abs() > self.config.interval_tolerance_days)
        {
            debug!(
                "Skipping {:?} - irregular interval ({} days vs {:.1} average)",
                merchant, gap, avg_interval
            );
            return None;
        }

        let frequency = self.classify_frequency(avg_interval);

        let amounts: Vec<f64> = txs.iter().map(|tx| tx.amount).collect();
        let avg_amount = mean(&amounts);
        if avg_amount == 0.0 {
            debug!("Skipping {:?} - average amount is zero", merchant);
            return None;
        }

        let allowed = self.config.amount_tolerance * avg_amount.abs();
        if let Some(amount) = amounts
            .iter()
            .find(|&&amount| (amount - avg_amount).abs() > allowed)
        {
            debug!(
                "Skipping {:?} - unstable amount ({:.2} vs {:.2} average)",
                merchant, amount, avg_amount
            );
            return None;
        }

        // Non-empty: at least min_transactions (>= 2) entries
        let last = *txs.last()?;
        let Some(next_charge) = last
            .date
            .checked_add_signed(Duration::days(avg_interval.round() as i64))
        else {
            debug!(
                "Skipping {:?} - next charge after {} is out of range",
                merchant, last.date
            );
            return None;
        };

        debug!(
            "Found subscription: {:?} @ {:.2}/{}",
            merchant,
            avg_amount,
            frequency.as_str()
        );

        Some(Subscription {
            id: subscription_id(&merchant, detected_at),
            merchant,
            amount: avg_amount,
            frequency,
            next_charge,
            category: last.category,
            status: SubscriptionStatus::Active,
            first_detected: detected_at,
            last_charge: last.date,
            transaction_ids: txs.iter().map(|tx| tx.id.clone()).collect(),
            cancellable: true,
            price_history: txs
                .iter()
                .map(|tx| PricePoint {
                    amount: tx.amount,
                    date: tx.date,
                })
                .collect(),
        })
    }

    fn classify_frequency(&self, avg_interval: f64) -> Frequency {
        if avg_interval < self.config.weekly_max_interval {
            Frequency::Weekly
        } else if avg_interval < self.config.monthly_max_interval {
            Frequency::Monthly
        } else {
            Frequency::Yearly
        }
    }
}

/// Compare the two most recent charges of a subscription
///
/// History is ordered by date before comparing, so the stored order doesn't
/// matter. Returns `None` with fewer than two charges or when the latest charge
/// is not strictly higher. A previous price of zero reports an infinite
/// percentage.
pub fn detect_price_increase(subscription: &Subscription) -> Option<PriceIncrease> {
    if subscription.price_history.len() < 2 {
        return None;
    }

    let mut history = subscription.price_history.clone();
    history.sort_by_key(|p| p.date);

    let [.., old, new] = history.as_slice() else {
        return None;
    };

    if new.amount <= old.amount {
        return None;
    }

    let percent_increase = if old.amount == 0.0 {
        f64::INFINITY
    } else {
        (new.amount - old.amount) / old.amount.abs() * 100.0
    };

    Some(PriceIncrease {
        increased: true,
        old_price: old.amount,
        new_price: new.amount,
        percent_increase,
    })
}

/// Price increases across all active subscriptions
pub fn detect_price_increases(subscriptions: &[Subscription]) -> Vec<(&Subscription, PriceIncrease)> {
    subscriptions
        .iter()
        .filter(|sub| sub.is_active())
        .filter_map(|sub| detect_price_increase(sub).map(|inc| (sub, inc)))
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use chrono::{NaiveDate, TimeZone};

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(offset)
    }

    fn tx(id: &str, description: &str, amount: f64, offset: i64) -> Transaction {
        Transaction {
            id: id.to_string(),
            amount,
            date: day(offset),
            description: description.to_string(),
            category: Category::Entertainment,
        }
    }

    fn detected_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn detect(transactions: &[Transaction]) -> Vec<Subscription> {
        SubscriptionDetector::new().detect_at(transactions, detected_at())
    }

    #[test]
    fn test_normalize_merchant() {
        assert_eq!(normalize_merchant("NETFLIX.COM #4421"), "netflixcom");
        assert_eq!(normalize_merchant("Netflix   998"), "netflix");
        assert_eq!(normalize_merchant("Netflix 123"), "netflix");
        assert_eq!(normalize_merchant("SPOTIFY USA 8888 NY"), "spotify usa");
        assert_eq!(normalize_merchant("  Apple   Music  Family "), "apple music");
    }

    #[test]
    fn test_normalize_merchant_punctuation_does_not_collapse() {
        assert_ne!(
            normalize_merchant("NETFLIX.COM #4421"),
            normalize_merchant("Netflix   998")
        );
    }

    #[test]
    fn test_normalize_merchant_empty_key() {
        assert_eq!(normalize_merchant("12345 #99"), "");
        assert_eq!(normalize_merchant(""), "");
        assert_eq!(normalize_merchant("Café Nero"), "caf nero");
    }

    #[test]
    fn test_no_groups_with_two_members() {
        let txs = vec![
            tx("1", "Netflix", 15.99, 0),
            tx("2", "Spotify", 9.99, 3),
            tx("3", "Hulu", 7.99, 10),
        ];
        assert!(detect(&txs).is_empty());
        assert!(detect(&[]).is_empty());
    }

    #[test]
    fn test_irregular_interval_rejected() {
        let txs = vec![
            tx("1", "Gym Club", 40.0, 0),
            tx("2", "Gym Club", 40.0, 30),
            tx("3", "Gym Club", 40.0, 90),
        ];
        assert!(detect(&txs).is_empty());
    }

    #[test]
    fn test_regular_monthly_detection() {
        let txs = vec![
            tx("a", "Netflix 123", 15.99, 0),
            tx("b", "Netflix 123", 15.99, 30),
            tx("c", "Netflix 123", 15.99, 61),
        ];

        let subs = detect(&txs);
        assert_eq!(subs.len(), 1);

        let sub = &subs[0];
        assert_eq!(sub.merchant, "netflix");
        assert_eq!(sub.frequency, Frequency::Monthly);
        assert!((sub.amount - 15.99).abs() < 1e-9);
        assert_eq!(sub.transaction_ids, vec!["a", "b", "c"]);
        assert_eq!(sub.price_history.len(), 3);
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert!(sub.cancellable);
        assert_eq!(sub.last_charge, day(61));
        // 61 + round(30.5)
        assert_eq!(sub.next_charge, day(92));
        assert_eq!(sub.first_detected, detected_at());
        assert_eq!(sub.id, format!("netflix-{}", detected_at().timestamp_millis()));
    }

    #[test]
    fn test_unsorted_input_is_ordered_by_date() {
        let txs = vec![
            tx("c", "Netflix", 15.99, 61),
            tx("a", "Netflix", 15.99, 0),
            tx("b", "Netflix", 15.99, 30),
        ];

        let subs = detect(&txs);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].transaction_ids, vec!["a", "b", "c"]);
        let dates: Vec<_> = subs[0].price_history.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day(0), day(30), day(61)]);
    }

    #[test]
    fn test_unstable_amount_rejected() {
        let txs = vec![
            tx("1", "Netflix 123", 10.0, 0),
            tx("2", "Netflix 123", 10.0, 30),
            tx("3", "Netflix 123", 50.0, 61),
        ];
        assert!(detect(&txs).is_empty());
    }

    #[test]
    fn test_amount_within_ten_percent_accepted() {
        let txs = vec![
            tx("1", "Cloud Storage", 10.0, 0),
            tx("2", "Cloud Storage", 10.0, 30),
            tx("3", "Cloud Storage", 11.0, 60),
        ];
        let subs = detect(&txs);
        assert_eq!(subs.len(), 1);
        assert!((subs[0].amount - 31.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_amounts_use_magnitude_for_tolerance() {
        let txs = vec![
            tx("1", "Spotify", -9.99, 0),
            tx("2", "Spotify", -9.99, 31),
            tx("3", "Spotify", -10.49, 59),
        ];
        let subs = detect(&txs);
        assert_eq!(subs.len(), 1);
        assert!(subs[0].amount < 0.0);
    }

    #[test]
    fn test_zero_average_rejected() {
        let txs = vec![tx("1", "Refund Co", 5.0, 0), tx("2", "Refund Co", -5.0, 30)];
        assert!(detect(&txs).is_empty());
    }

    #[test]
    fn test_frequency_classification() {
        let weekly = vec![
            tx("1", "Meal Kit", 60.0, 0),
            tx("2", "Meal Kit", 60.0, 7),
            tx("3", "Meal Kit", 60.0, 14),
        ];
        assert_eq!(detect(&weekly)[0].frequency, Frequency::Weekly);

        let yearly = vec![
            tx("1", "Domain Renewal", 12.0, 0),
            tx("2", "Domain Renewal", 12.0, 365),
        ];
        let subs = detect(&yearly);
        assert_eq!(subs[0].frequency, Frequency::Yearly);
        assert_eq!(subs[0].next_charge, day(730));

        // Boundaries: 10 days is no longer weekly, 35 days is no longer monthly
        let ten = vec![tx("1", "Boundary", 1.0, 0), tx("2", "Boundary", 1.0, 10)];
        assert_eq!(detect(&ten)[0].frequency, Frequency::Monthly);
        let thirty_five = vec![tx("1", "Boundary", 1.0, 0), tx("2", "Boundary", 1.0, 35)];
        assert_eq!(detect(&thirty_five)[0].frequency, Frequency::Yearly);
    }

    #[test]
    fn test_next_charge_out_of_range_skipped() {
        let far = |id: &str, date: &str| Transaction {
            id: id.to_string(),
            amount: 15.99,
            date: crate::models::parse_date(date).unwrap(),
            description: "Netflix".to_string(),
            category: Category::Entertainment,
        };
        let txs = vec![far("1", "-200000-01-01"), far("2", "+200000-01-01")];
        assert!(detect(&txs).is_empty());
        assert!(detect_subscriptions(&txs).is_empty());
    }

    #[test]
    fn test_interval_tolerance_is_inclusive() {
        // Gaps 23 and 37 average 30; both sit exactly 7 days off
        let at_limit = vec![
            tx("1", "Gym Club", 20.0, 0),
            tx("2", "Gym Club", 20.0, 23),
            tx("3", "Gym Club", 20.0, 60),
        ];
        assert_eq!(detect(&at_limit).len(), 1);

        // Gaps 23 and 38 average 30.5; both sit 7.5 days off
        let past_limit = vec![
            tx("1", "Gym Club", 20.0, 0),
            tx("2", "Gym Club", 20.0, 23),
            tx("3", "Gym Club", 20.0, 61),
        ];
        assert!(detect(&past_limit).is_empty());
    }

    #[test]
    fn test_amount_tolerance_is_inclusive() {
        // Mean 10, both amounts exactly 10% away
        let at_limit = vec![tx("1", "Cloud Box", 9.0, 0), tx("2", "Cloud Box", 11.0, 30)];
        assert_eq!(detect(&at_limit).len(), 1);

        let past_limit = vec![tx("1", "Cloud Box", 9.0, 0), tx("2", "Cloud Box", 11.5, 30)];
        assert!(detect(&past_limit).is_empty());
    }

    #[test]
    fn test_timestamps_count_calendar_days() {
        // Times of day are dropped, so late night to early morning spans 7 days
        let stamped = |id: &str, date: &str| Transaction {
            id: id.to_string(),
            amount: 4.0,
            date: crate::models::parse_date(date).unwrap(),
            description: "Paper Route".to_string(),
            category: Category::Other,
        };
        let txs = vec![
            stamped("1", "2024-01-01T23:30:00Z"),
            stamped("2", "2024-01-08T00:30:00Z"),
            stamped("3", "2024-01-15T00:30:00Z"),
        ];
        let subs = detect(&txs);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].frequency, Frequency::Weekly);
        assert_eq!(subs[0].next_charge, day(21));
    }

    #[test]
    fn test_two_transactions_always_regular() {
        // A single gap equals its own average
        let txs = vec![tx("1", "Magazine", 5.0, 0), tx("2", "Magazine", 5.0, 200)];
        let subs = detect(&txs);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].frequency, Frequency::Yearly);
    }

    #[test]
    fn test_category_from_most_recent_transaction() {
        let mut txs = vec![
            tx("1", "Adobe", 54.99, 0),
            tx("2", "Adobe", 54.99, 30),
        ];
        txs[1].category = Category::Software;
        // Put the most recent first to check we don't use input order
        txs.reverse();

        let subs = detect(&txs);
        assert_eq!(subs[0].category, Category::Software);
    }

    #[test]
    fn test_multiple_merchants_ordered_by_key() {
        let txs = vec![
            tx("s1", "Spotify", 9.99, 0),
            tx("n1", "Netflix", 15.99, 2),
            tx("s2", "Spotify", 9.99, 30),
            tx("n2", "Netflix", 15.99, 32),
            tx("g1", "Grocery Mart", 82.10, 5),
        ];

        let subs = detect(&txs);
        let merchants: Vec<_> = subs.iter().map(|s| s.merchant.as_str()).collect();
        assert_eq!(merchants, vec!["netflix", "spotify"]);
        for sub in &subs {
            assert_eq!(sub.transaction_ids.len(), sub.price_history.len());
            assert!(sub.transaction_ids.len() >= 2);
        }
    }

    #[test]
    fn test_empty_key_groups_together() {
        // Purely numeric descriptions all share the empty key
        let txs = vec![tx("1", "0042", 20.0, 0), tx("2", "#7781", 20.0, 30)];
        let subs = detect(&txs);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].merchant, "");
    }

    #[test]
    fn test_custom_config() {
        let config = DetectionConfig {
            min_transactions: 3,
            ..Default::default()
        };
        let detector = SubscriptionDetector::with_config(config);
        let txs = vec![tx("1", "Netflix", 15.99, 0), tx("2", "Netflix", 15.99, 30)];
        assert!(detector.detect_at(&txs, detected_at()).is_empty());
    }

    fn sub_with_history(history: Vec<PricePoint>) -> Subscription {
        Subscription {
            id: "netflix-1".to_string(),
            merchant: "netflix".to_string(),
            amount: 11.0,
            frequency: Frequency::Monthly,
            next_charge: day(60),
            category: Category::Entertainment,
            status: SubscriptionStatus::Active,
            first_detected: detected_at(),
            last_charge: day(30),
            transaction_ids: history.iter().map(|p| p.date.to_string()).collect(),
            cancellable: true,
            price_history: history,
        }
    }

    #[test]
    fn test_price_increase_detected() {
        let sub = sub_with_history(vec![
            PricePoint {
                amount: 10.0,
                date: day(0),
            },
            PricePoint {
                amount: 12.0,
                date: day(30),
            },
        ]);

        let inc = detect_price_increase(&sub).unwrap();
        assert!(inc.increased);
        assert_eq!(inc.old_price, 10.0);
        assert_eq!(inc.new_price, 12.0);
        assert!((inc.percent_increase - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_price_increase_uses_chronological_order() {
        let sub = sub_with_history(vec![
            PricePoint {
                amount: 12.0,
                date: day(30),
            },
            PricePoint {
                amount: 10.0,
                date: day(0),
            },
        ]);

        let inc = detect_price_increase(&sub).unwrap();
        assert_eq!(inc.old_price, 10.0);
        assert_eq!(inc.new_price, 12.0);
    }

    #[test]
    fn test_price_decrease_or_flat_is_none() {
        let decrease = sub_with_history(vec![
            PricePoint {
                amount: 12.0,
                date: day(0),
            },
            PricePoint {
                amount: 10.0,
                date: day(30),
            },
        ]);
        assert_eq!(detect_price_increase(&decrease), None);

        let flat = sub_with_history(vec![
            PricePoint {
                amount: 10.0,
                date: day(0),
            },
            PricePoint {
                amount: 10.0,
                date: day(30),
            },
        ]);
        assert_eq!(detect_price_increase(&flat), None);
    }

    #[test]
    fn test_price_increase_compares_two_most_recent() {
        // An old spike doesn't matter, only the last two charges
        let sub = sub_with_history(vec![
            PricePoint {
                amount: 20.0,
                date: day(0),
            },
            PricePoint {
                amount: 10.0,
                date: day(30),
            },
            PricePoint {
                amount: 11.0,
                date: day(60),
            },
        ]);
        let inc = detect_price_increase(&sub).unwrap();
        assert_eq!(inc.old_price, 10.0);
        assert_eq!(inc.new_price, 11.0);
    }

    #[test]
    fn test_price_increase_needs_two_entries() {
        let sub = sub_with_history(vec![PricePoint {
            amount: 10.0,
            date: day(0),
        }]);
        assert_eq!(detect_price_increase(&sub), None);
    }

    #[test]
    fn test_detect_price_increases_skips_inactive() {
        let history = vec![
            PricePoint {
                amount: 10.0,
                date: day(0),
            },
            PricePoint {
                amount: 12.0,
                date: day(30),
            },
        ];
        let active = sub_with_history(history.clone());
        let mut cancelled = sub_with_history(history);
        cancelled.id = "cancelled-1".to_string();
        cancelled.status = SubscriptionStatus::Cancelled;

        let subs = vec![active, cancelled];
        let increases = detect_price_increases(&subs);
        assert_eq!(increases.len(), 1);
        assert_eq!(increases[0].0.id, "netflix-1");
    }
}
