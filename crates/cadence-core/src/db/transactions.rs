//! Transaction operations

use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::debug;

use super::{parse_date_column, Database};
use crate::error::Result;
use crate::models::{Category, Transaction};

/// Outcome of a bulk insert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InsertStats {
    pub inserted: usize,
    /// Rows whose id was already stored
    pub skipped: usize,
}

impl Database {
    /// Insert a transaction, returning false if its id already exists
    pub fn insert_transaction(&self, tx: &Transaction) -> Result<bool> {
        let conn = self.conn()?;
        insert_with(&conn, tx)
    }

    /// Insert many transactions in one database transaction
    pub fn insert_transactions(&self, txs: &[Transaction]) -> Result<InsertStats> {
        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;

        let mut stats = InsertStats::default();
        for tx in txs {
            if insert_with(&db_tx, tx)? {
                stats.inserted += 1;
            } else {
                debug!("Skipping duplicate transaction {}", tx.id);
                stats.skipped += 1;
            }
        }

        db_tx.commit()?;
        Ok(stats)
    }

    /// List the most recent transactions, newest first
    pub fn list_recent_transactions(&self, limit: usize) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, date, description, amount, category
            FROM transactions
            ORDER BY date DESC, id DESC
            LIMIT ?
            "#,
        )?;

        let transactions = stmt
            .query_map(params![limit as i64], |row| {
                let date_str: String = row.get(1)?;
                let category_str: String = row.get(4)?;
                Ok(Transaction {
                    id: row.get(0)?,
                    date: parse_date_column(1, &date_str)?,
                    description: row.get(2)?,
                    amount: row.get(3)?,
                    category: Category::from_label(&category_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Count stored transactions
    pub fn count_transactions(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn insert_with(conn: &Connection, tx: &Transaction) -> Result<bool> {
    let changed = conn.execute(
        r#"
        INSERT OR IGNORE INTO transactions (id, date, description, amount, category)
        VALUES (?, ?, ?, ?, ?)
        "#,
        params![
            tx.id,
            tx.date.to_string(),
            tx.description,
            tx.amount,
            tx.category.as_str(),
        ],
    )?;
    Ok(changed > 0)
}
