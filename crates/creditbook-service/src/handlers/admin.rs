//! Admin balance overrides.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::handlers::credits::{parse_user_id, LedgerWriteResponse};
use crate::state::AppState;

/// Manual adjustment request.
#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    /// User to adjust.
    pub user_id: String,
    /// Signed change to the balance.
    pub delta: i64,
    /// Reason recorded on the transaction.
    pub reason: String,
    /// Idempotency key.
    pub reference_id: Option<String>,
}

/// Apply a signed correction. Negative deltas cannot take the balance below zero.
pub async fn adjust_credits(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(body): Json<AdjustRequest>,
) -> Result<Json<LedgerWriteResponse>, ApiError> {
    let user_id = parse_user_id(&body.user_id)?;

    tracing::info!(
        admin_id = %admin.admin_id,
        user_id = %user_id,
        delta = body.delta,
        "Admin adjustment requested"
    );

    let applied =
        state
            .ledger
            .adjust_credits(user_id, body.delta, body.reason, body.reference_id)?;

    Ok(Json(LedgerWriteResponse::from(&applied)))
}

/// Bonus grant request.
#[derive(Debug, Deserialize)]
pub struct BonusRequest {
    /// User to credit.
    pub user_id: String,
    /// Credits to grant.
    pub amount: i64,
    /// Reason recorded on the transaction.
    pub reason: String,
}

/// Grant promotional credits.
pub async fn grant_bonus(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(body): Json<BonusRequest>,
) -> Result<Json<LedgerWriteResponse>, ApiError> {
    let user_id = parse_user_id(&body.user_id)?;

    tracing::info!(
        admin_id = %admin.admin_id,
        user_id = %user_id,
        amount = body.amount,
        "Admin bonus requested"
    );

    let applied = state.credits.grant_bonus(user_id, body.amount, body.reason)?;

    Ok(Json(LedgerWriteResponse::from(&applied)))
}
