//! Transaction handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::{AppError, AppState, MAX_PAGE_LIMIT};
use cadence_core::db::InsertStats;
use cadence_core::models::Transaction;

/// Query parameters for listing transactions
#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

/// GET /api/transactions - Most recent transactions, newest first
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TransactionQuery>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    // Input validation: clamp pagination parameters
    let limit = params.limit.clamp(1, MAX_PAGE_LIMIT);

    let transactions = state.db.list_recent_transactions(limit)?;
    Ok(Json(transactions))
}

/// POST /api/transactions - Add transactions (duplicates by id are skipped)
pub async fn create_transactions(
    State(state): State<Arc<AppState>>,
    Json(transactions): Json<Vec<Transaction>>,
) -> Result<Json<InsertStats>, AppError> {
    if transactions.iter().any(|tx| tx.id.trim().is_empty()) {
        return Err(AppError::bad_request("Every transaction needs an id"));
    }

    let stats = state.db.insert_transactions(&transactions)?;
    info!(
        "Added transactions: {} inserted, {} skipped",
        stats.inserted, stats.skipped
    );

    Ok(Json(stats))
}
