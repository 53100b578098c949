//! Pricing catalog handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use creditbook_core::PricingCatalog;

use crate::state::AppState;

/// The plans, packages, feature costs and referral rewards in effect.
pub async fn get_pricing(State(state): State<Arc<AppState>>) -> Json<PricingCatalog> {
    Json(state.ledger.catalog().clone())
}
