//! Subscription operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use super::{conversion_error, parse_date_column, parse_timestamp_column, Database};
use crate::error::{Error, Result};
use crate::models::{Category, Frequency, PricePoint, Subscription, SubscriptionStatus};

const SELECT_COLUMNS: &str = r#"
    SELECT id, merchant, amount, frequency, next_charge, category, status,
           first_detected, last_charge, transaction_ids, cancellable, price_history
    FROM subscriptions
"#;

impl Database {
    /// Upsert a detected subscription, returning the stored id
    ///
    /// A stored subscription with the same id, or failing that the same
    /// merchant, is updated in place: it keeps its id, status and
    /// `first_detected`, and takes the new detection fields. Otherwise the
    /// subscription is inserted as-is.
    pub fn upsert_subscription(&self, sub: &Subscription) -> Result<String> {
        let conn = self.conn()?;
        upsert_with(&conn, sub)
    }

    /// Upsert the results of a detection run in one database transaction
    pub fn upsert_subscriptions(&self, subs: &[Subscription]) -> Result<Vec<String>> {
        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;

        let ids = subs
            .iter()
            .map(|sub| upsert_with(&db_tx, sub))
            .collect::<Result<Vec<_>>>()?;

        db_tx.commit()?;
        Ok(ids)
    }

    /// List subscriptions, optionally filtered by status
    pub fn list_subscriptions(
        &self,
        status: Option<SubscriptionStatus>,
    ) -> Result<Vec<Subscription>> {
        let conn = self.conn()?;

        let subscriptions = if let Some(status) = status {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE status = ? ORDER BY merchant, id",
                SELECT_COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![status.as_str()], row_to_subscription)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        } else {
            let mut stmt = conn.prepare(&format!("{} ORDER BY merchant, id", SELECT_COLUMNS))?;
            let rows = stmt
                .query_map([], row_to_subscription)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        Ok(subscriptions)
    }

    /// Get a subscription by id
    pub fn get_subscription(&self, id: &str) -> Result<Option<Subscription>> {
        let conn = self.conn()?;
        let sub = conn
            .query_row(
                &format!("{} WHERE id = ?", SELECT_COLUMNS),
                params![id],
                row_to_subscription,
            )
            .optional()?;
        Ok(sub)
    }

    /// Update subscription status
    pub fn update_subscription_status(&self, id: &str, status: SubscriptionStatus) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE subscriptions SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![status.as_str(), id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Subscription {}", id)));
        }
        Ok(())
    }

    /// Delete a subscription
    pub fn delete_subscription(&self, id: &str) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM subscriptions WHERE id = ?", params![id])?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Subscription {}", id)));
        }
        Ok(())
    }
}

fn upsert_with(conn: &Connection, sub: &Subscription) -> Result<String> {
    let existing: Option<String> = conn
        .query_row(
            r#"
            SELECT id FROM subscriptions
            WHERE id = ?1 OR merchant = ?2
            ORDER BY (id = ?1) DESC, first_detected ASC
            LIMIT 1
            "#,
            params![sub.id, sub.merchant],
            |row| row.get(0),
        )
        .optional()?;

    let transaction_ids = serde_json::to_string(&sub.transaction_ids)?;
    let price_history = serde_json::to_string(&sub.price_history)?;

    if let Some(id) = existing {
        debug!("Updating subscription {} ({})", id, sub.merchant);
        conn.execute(
            r#"
            UPDATE subscriptions
            SET merchant = ?, amount = ?, frequency = ?, next_charge = ?, category = ?,
                last_charge = ?, transaction_ids = ?, cancellable = ?, price_history = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![
                sub.merchant,
                sub.amount,
                sub.frequency.as_str(),
                sub.next_charge.to_string(),
                sub.category.as_str(),
                sub.last_charge.to_string(),
                transaction_ids,
                sub.cancellable,
                price_history,
                id,
            ],
        )?;
        return Ok(id);
    }

    debug!("Inserting subscription {} ({})", sub.id, sub.merchant);
    conn.execute(
        r#"
        INSERT INTO subscriptions (
            id, merchant, amount, frequency, next_charge, category, status,
            first_detected, last_charge, transaction_ids, cancellable, price_history
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            sub.id,
            sub.merchant,
            sub.amount,
            sub.frequency.as_str(),
            sub.next_charge.to_string(),
            sub.category.as_str(),
            sub.status.as_str(),
            sub.first_detected.to_rfc3339(),
            sub.last_charge.to_string(),
            transaction_ids,
            sub.cancellable,
            price_history,
        ],
    )?;

    Ok(sub.id.clone())
}

fn row_to_subscription(row: &Row<'_>) -> rusqlite::Result<Subscription> {
    let frequency_str: String = row.get(3)?;
    let next_charge_str: String = row.get(4)?;
    let category_str: String = row.get(5)?;
    let status_str: String = row.get(6)?;
    let first_detected_str: String = row.get(7)?;
    let last_charge_str: String = row.get(8)?;
    let transaction_ids_str: String = row.get(9)?;
    let price_history_str: String = row.get(11)?;

    let transaction_ids: Vec<String> = serde_json::from_str(&transaction_ids_str)
        .map_err(|e| conversion_error(9, e.to_string()))?;
    let price_history: Vec<PricePoint> = serde_json::from_str(&price_history_str)
        .map_err(|e| conversion_error(11, e.to_string()))?;

    Ok(Subscription {
        id: row.get(0)?,
        merchant: row.get(1)?,
        amount: row.get(2)?,
        frequency: frequency_str
            .parse::<Frequency>()
            .map_err(|e| conversion_error(3, e))?,
        next_charge: parse_date_column(4, &next_charge_str)?,
        category: Category::from_label(&category_str),
        status: status_str
            .parse::<SubscriptionStatus>()
            .map_err(|e| conversion_error(6, e))?,
        first_detected: parse_timestamp_column(7, &first_detected_str)?,
        last_charge: parse_date_column(8, &last_charge_str)?,
        transaction_ids,
        cancellable: row.get(10)?,
        price_history,
    })
}
