//! Account management handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use creditbook_core::Account;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Account response.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// User ID.
    pub user_id: String,
    /// Current balance in credits.
    pub credits: i64,
    /// Current plan.
    pub plan: String,
    /// Credits bought through packages.
    pub lifetime_purchased: i64,
    /// Credits granted by allocations, upgrades, rewards and refunds.
    pub lifetime_granted: i64,
    /// Credits spent.
    pub lifetime_used: i64,
    /// Created timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            user_id: account.user_id.to_string(),
            credits: account.credits,
            plan: account.plan.to_string(),
            lifetime_purchased: account.lifetime_purchased,
            lifetime_granted: account.lifetime_granted,
            lifetime_used: account.lifetime_used,
            created_at: account.created_at.to_rfc3339(),
            updated_at: account.updated_at.to_rfc3339(),
        }
    }
}

/// Open an account on the free plan with its opening allocation.
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let applied = state.ledger.open_account(auth.user_id)?;
    Ok(Json(AccountResponse::from(&applied.account)))
}

/// Get the current user's account.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.ledger.account(auth.user_id)?;
    Ok(Json(AccountResponse::from(&account)))
}
