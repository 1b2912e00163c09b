//! Subscription handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AppError, AppState, SuccessResponse};
use cadence_core::models::{PriceIncrease, Subscription, SubscriptionStatus, SubscriptionSummary};
use cadence_core::{detect_price_increases, summarize, SubscriptionDetector};

/// Upper bound on transactions scanned by one detection run
pub const MAX_DETECT_LIMIT: usize = 10_000;

/// Active subscriptions with their cost summary
#[derive(Serialize)]
pub struct SubscriptionsResponse {
    pub subscriptions: Vec<Subscription>,
    pub summary: SubscriptionSummary,
}

/// GET /api/subscriptions - Active subscriptions and totals
pub async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SubscriptionsResponse>, AppError> {
    let subscriptions = state
        .db
        .list_subscriptions(Some(SubscriptionStatus::Active))?;
    let summary = summarize(&subscriptions, &state.detection);

    Ok(Json(SubscriptionsResponse {
        subscriptions,
        summary,
    }))
}

/// Query params for a detection run
#[derive(Debug, Deserialize)]
pub struct DetectQuery {
    /// Most recent transactions to scan (defaults to the configured limit)
    pub limit: Option<usize>,
}

/// Result of a detection run
#[derive(Serialize)]
pub struct DetectResponse {
    pub transactions_scanned: usize,
    pub subscriptions: Vec<Subscription>,
    pub summary: SubscriptionSummary,
}

/// POST /api/subscriptions/detect - Re-run detection and persist the results
///
/// Returns the stored records, which keep the id and status of any
/// subscription that was already known for the same merchant.
pub async fn detect_subscriptions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DetectQuery>,
) -> Result<Json<DetectResponse>, AppError> {
    let limit = query
        .limit
        .unwrap_or(state.detection.transaction_limit)
        .clamp(1, MAX_DETECT_LIMIT);

    let transactions = state.db.list_recent_transactions(limit)?;
    let detected = SubscriptionDetector::with_config(state.detection.clone()).detect(&transactions);
    let ids = state.db.upsert_subscriptions(&detected)?;

    let mut subscriptions = Vec::with_capacity(ids.len());
    for id in &ids {
        if let Some(sub) = state.db.get_subscription(id)? {
            subscriptions.push(sub);
        }
    }
    let summary = summarize(&subscriptions, &state.detection);

    info!(
        "Detection run: {} transactions scanned, {} subscriptions stored",
        transactions.len(),
        subscriptions.len()
    );

    Ok(Json(DetectResponse {
        transactions_scanned: transactions.len(),
        subscriptions,
        summary,
    }))
}

/// A subscription whose latest charge went up
#[derive(Serialize)]
pub struct PriceIncreaseEntry {
    pub subscription_id: String,
    pub merchant: String,
    #[serde(flatten)]
    pub increase: PriceIncrease,
}

/// GET /api/subscriptions/price-increases - Active subscriptions that got pricier
pub async fn list_price_increases(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PriceIncreaseEntry>>, AppError> {
    let subscriptions = state
        .db
        .list_subscriptions(Some(SubscriptionStatus::Active))?;

    let entries = detect_price_increases(&subscriptions)
        .into_iter()
        .map(|(sub, increase)| PriceIncreaseEntry {
            subscription_id: sub.id.clone(),
            merchant: sub.merchant.clone(),
            increase,
        })
        .collect();

    Ok(Json(entries))
}

/// GET /api/subscriptions/:id - Get one subscription
pub async fn get_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Subscription>, AppError> {
    let subscription = state
        .db
        .get_subscription(&id)?
        .ok_or_else(|| AppError::not_found(&format!("Subscription {} not found", id)))?;

    Ok(Json(subscription))
}

/// Request body for a status change
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: SubscriptionStatus,
}

/// PUT /api/subscriptions/:id/status - Pause, cancel or reactivate
pub async fn update_subscription_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Subscription>, AppError> {
    state
        .db
        .get_subscription(&id)?
        .ok_or_else(|| AppError::not_found(&format!("Subscription {} not found", id)))?;

    state.db.update_subscription_status(&id, req.status)?;
    info!("Subscription {} marked {}", id, req.status.as_str());

    let updated = state
        .db
        .get_subscription(&id)?
        .ok_or_else(|| AppError::not_found(&format!("Subscription {} not found", id)))?;

    Ok(Json(updated))
}

/// DELETE /api/subscriptions/:id - Remove a subscription
///
/// A later detection run will recreate it if the charges still recur.
pub async fn delete_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state
        .db
        .get_subscription(&id)?
        .ok_or_else(|| AppError::not_found(&format!("Subscription {} not found", id)))?;

    state.db.delete_subscription(&id)?;

    Ok(Json(SuccessResponse { success: true }))
}
