//! Subscription handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use creditbook_core::Plan;

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::handlers::credits::{parse_user_id, required_reference, TransactionResponse};
use crate::state::AppState;

/// Plan change request.
#[derive(Debug, Deserialize)]
pub struct UpgradeRequest {
    /// User whose subscription changed.
    pub user_id: String,
    /// Target plan (`free`, `starter`, `pro`, `business`).
    pub plan: String,
    /// Payment or subscription event ID, so retried events apply once.
    pub reference_id: String,
}

/// Plan change response.
#[derive(Debug, Serialize)]
pub struct UpgradeResponse {
    /// Plan before the change.
    pub previous_plan: String,
    /// Plan after the change.
    pub plan: String,
    /// Credits added by the change.
    pub credits_added: i64,
    /// Balance after the change.
    pub credits: i64,
    /// Whether the reference had already been applied.
    pub replayed: bool,
    /// The recorded transaction.
    pub transaction: TransactionResponse,
}

/// Apply a paid plan change, adding the plan's allocation to the balance.
///
/// Called by the payment webhook once the subscription payment has cleared.
pub async fn upgrade_subscription(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<UpgradeRequest>,
) -> Result<Json<UpgradeResponse>, ApiError> {
    let user_id = parse_user_id(&body.user_id)?;
    let plan: Plan = body.plan.parse()?;
    let reference_id = required_reference(body.reference_id)?;
    let upgrade = state
        .subscriptions
        .upgrade_subscription(user_id, plan, Some(reference_id))?;

    tracing::info!(
        service = %auth.service_name,
        user_id = %user_id,
        plan = %plan,
        replayed = upgrade.applied.replayed,
        "Subscription change recorded"
    );

    let applied = &upgrade.applied;
    Ok(Json(UpgradeResponse {
        previous_plan: upgrade.previous_plan.to_string(),
        plan: applied.account.plan.to_string(),
        credits_added: applied.transaction.amount,
        credits: applied.account.credits,
        replayed: applied.replayed,
        transaction: TransactionResponse::from(&applied.transaction),
    }))
}
