//! Credit balance, transaction and feature usage handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use creditbook_core::{CreditTransaction, UserId, INSUFFICIENT_CREDITS_MESSAGE};
use creditbook_ledger::{Applied, ConsumeOutcome};

use crate::auth::{AuthUser, ServiceAuth};
use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Shared types
// ============================================================================

/// Transaction response.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Transaction ID.
    pub id: String,
    /// Signed amount (positive = credit, negative = debit).
    pub amount: i64,
    /// Transaction type.
    pub transaction_type: String,
    /// Balance after this transaction.
    pub balance_after: i64,
    /// Description.
    pub description: String,
    /// Idempotency key, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    /// Timestamp.
    pub created_at: String,
}

impl From<&CreditTransaction> for TransactionResponse {
    fn from(tx: &CreditTransaction) -> Self {
        Self {
            id: tx.id.to_string(),
            amount: tx.amount,
            transaction_type: tx.transaction_type.to_string(),
            balance_after: tx.balance_after,
            description: tx.description.clone(),
            reference_id: tx.reference_id.clone(),
            created_at: tx.created_at.to_rfc3339(),
        }
    }
}

/// Result of a ledger write.
#[derive(Debug, Serialize)]
pub struct LedgerWriteResponse {
    /// The recorded transaction (the original one on replay).
    pub transaction: TransactionResponse,
    /// Balance after the write.
    pub balance: i64,
    /// Whether the reference had already been applied.
    pub replayed: bool,
}

impl From<&Applied> for LedgerWriteResponse {
    fn from(applied: &Applied) -> Self {
        Self {
            transaction: TransactionResponse::from(&applied.transaction),
            balance: applied.account.credits,
            replayed: applied.replayed,
        }
    }
}

pub(crate) fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("Invalid user ID".into()))
}

/// Reject a blank `reference_id`.
pub(crate) fn required_reference(raw: String) -> Result<String, ApiError> {
    if raw.trim().is_empty() {
        return Err(ApiError::BadRequest("reference_id must not be empty".into()));
    }
    Ok(raw)
}

const fn default_quantity() -> u32 {
    1
}

// ============================================================================
// User endpoints
// ============================================================================

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Current balance in credits.
    pub credits: i64,
    /// Current plan.
    pub plan: String,
}

/// Get current credit balance.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let account = state.ledger.account(auth.user_id)?;

    Ok(Json(BalanceResponse {
        credits: account.credits,
        plan: account.plan.to_string(),
    }))
}

/// Transaction list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Maximum number of transactions to return (default: 50).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

const fn default_limit() -> usize {
    50
}

/// List transactions response.
#[derive(Debug, Serialize)]
pub struct ListTransactionsResponse {
    /// Transactions (newest first).
    pub transactions: Vec<TransactionResponse>,
    /// Whether there are more transactions.
    pub has_more: bool,
}

/// List transaction history.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<ListTransactionsResponse>, ApiError> {
    // Fetch one more than requested to determine has_more
    let limit = query.limit.min(100);
    let transactions = state
        .ledger
        .transactions(auth.user_id, limit + 1, query.offset)?;

    let has_more = transactions.len() > limit;
    let transactions = transactions
        .iter()
        .take(limit)
        .map(TransactionResponse::from)
        .collect();

    Ok(Json(ListTransactionsResponse {
        transactions,
        has_more,
    }))
}

/// Rollover response.
#[derive(Debug, Serialize)]
pub struct RolloverResponse {
    /// Unused credits from the previous allocation period.
    pub rollover: i64,
}

/// Report unused credits carried over from the previous allocation.
pub async fn get_rollover(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<RolloverResponse>, ApiError> {
    let rollover = state.credits.calculate_credit_rollover(auth.user_id)?;
    Ok(Json(RolloverResponse { rollover }))
}

// ============================================================================
// Service endpoints
// ============================================================================

/// Feature check request.
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    /// User to check.
    pub user_id: String,
    /// Feature identifier.
    pub feature: String,
    /// Number of units (default: 1).
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

/// Feature check response.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    /// Whether the balance covers the cost.
    pub allowed: bool,
    /// Credits the usage would cost.
    pub cost: i64,
    /// Current balance.
    pub balance: i64,
}

/// Check whether a user can afford a feature, without charging.
pub async fn check_credits(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(body): Json<CheckRequest>,
) -> Result<Json<CheckResponse>, ApiError> {
    let user_id = parse_user_id(&body.user_id)?;
    let allowed = state
        .credits
        .has_credits(user_id, &body.feature, body.quantity)?;
    let cost = state.credits.get_credit_cost(&body.feature, body.quantity)?;
    let balance = state.ledger.balance(user_id)?;

    Ok(Json(CheckResponse {
        allowed,
        cost,
        balance,
    }))
}

/// Feature consumption request.
#[derive(Debug, Deserialize)]
pub struct ConsumeRequest {
    /// User to charge.
    pub user_id: String,
    /// Feature identifier.
    pub feature: String,
    /// Number of units (default: 1).
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Description recorded on the transaction.
    pub description: Option<String>,
}

/// Feature consumption response.
#[derive(Debug, Serialize)]
pub struct ConsumeResponse {
    /// Whether credits were deducted.
    pub charged: bool,
    /// Credits charged, or that would have been charged.
    pub cost: i64,
    /// Balance after the attempt.
    pub balance: i64,
    /// Transaction ID when charged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// User-facing message when declined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Charge a user for feature usage.
///
/// A balance too low for the cost is not an error: the response reports
/// `charged: false` and nothing is written.
pub async fn consume_credits(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<ConsumeRequest>,
) -> Result<Json<ConsumeResponse>, ApiError> {
    let user_id = parse_user_id(&body.user_id)?;

    tracing::debug!(
        service = %auth.service_name,
        user_id = %user_id,
        feature = %body.feature,
        quantity = body.quantity,
        "Processing feature usage"
    );

    let outcome = state.ledger.consume_credits(
        user_id,
        &body.feature,
        body.quantity,
        body.description.as_deref(),
    )?;

    let response = match outcome {
        ConsumeOutcome::Charged(applied) => ConsumeResponse {
            charged: true,
            cost: -applied.transaction.amount,
            balance: applied.account.credits,
            transaction_id: Some(applied.transaction.id.to_string()),
            message: None,
        },
        ConsumeOutcome::Declined { balance, required } => ConsumeResponse {
            charged: false,
            cost: required,
            balance,
            transaction_id: None,
            message: Some(INSUFFICIENT_CREDITS_MESSAGE.to_string()),
        },
    };

    Ok(Json(response))
}

/// Direct deduction request.
#[derive(Debug, Deserialize)]
pub struct DeductRequest {
    /// User to charge.
    pub user_id: String,
    /// Credits to deduct.
    pub amount: i64,
    /// Description recorded on the transaction.
    pub description: String,
    /// Idempotency key.
    pub reference_id: Option<String>,
}

/// Deduct an explicit amount. Fails with `402` when the balance is too low.
pub async fn deduct_credits(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(body): Json<DeductRequest>,
) -> Result<Json<LedgerWriteResponse>, ApiError> {
    let user_id = parse_user_id(&body.user_id)?;
    let applied =
        state
            .ledger
            .deduct_credits(user_id, body.amount, body.description, body.reference_id)?;

    Ok(Json(LedgerWriteResponse::from(&applied)))
}

/// Verified package purchase handed off by the payment webhook.
#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    /// Buyer.
    pub user_id: String,
    /// Package identifier (`small`, `medium`, `large`).
    pub package_id: String,
    /// Payment identifier, used as the idempotency key.
    pub payment_reference: String,
}

/// Credit a purchased package.
pub async fn record_purchase(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<PurchaseRequest>,
) -> Result<Json<LedgerWriteResponse>, ApiError> {
    let user_id = parse_user_id(&body.user_id)?;
    let applied =
        state
            .credits
            .purchase_package(user_id, &body.package_id, &body.payment_reference)?;

    tracing::info!(
        service = %auth.service_name,
        user_id = %user_id,
        package_id = %body.package_id,
        payment_reference = %body.payment_reference,
        replayed = applied.replayed,
        "Package purchase recorded"
    );

    Ok(Json(LedgerWriteResponse::from(&applied)))
}

/// Refund request.
#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    /// User to refund.
    pub user_id: String,
    /// Credits to return.
    pub amount: i64,
    /// Reason recorded on the transaction.
    pub reason: String,
    /// Idempotency key.
    pub reference_id: Option<String>,
}

/// Return credits to a user.
pub async fn refund_credits(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(body): Json<RefundRequest>,
) -> Result<Json<LedgerWriteResponse>, ApiError> {
    let user_id = parse_user_id(&body.user_id)?;
    let applied =
        state
            .credits
            .refund_credits(user_id, body.amount, body.reason, body.reference_id)?;

    Ok(Json(LedgerWriteResponse::from(&applied)))
}

/// Monthly allocation request.
#[derive(Debug, Deserialize)]
pub struct AllocateRequest {
    /// User to allocate to.
    pub user_id: String,
    /// Any date in the period to allocate for (default: today).
    pub period: Option<NaiveDate>,
}

/// Grant the current plan's allocation for a period, at most once.
pub async fn allocate_credits(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(body): Json<AllocateRequest>,
) -> Result<Json<LedgerWriteResponse>, ApiError> {
    let user_id = parse_user_id(&body.user_id)?;
    let period = body.period.unwrap_or_else(|| Utc::now().date_naive());
    let applied = state.credits.grant_monthly_allocation(user_id, period)?;

    Ok(Json(LedgerWriteResponse::from(&applied)))
}

/// Referral reward request.
#[derive(Debug, Deserialize)]
pub struct ReferralRequest {
    /// User who completed the referral action.
    pub user_id: String,
    /// Reward type (`inviteFriend`, `submitFeedback`).
    pub reward: String,
    /// Referral event ID, so each event pays out once.
    pub reference_id: String,
}

/// Referral reward response.
#[derive(Debug, Serialize)]
pub struct ReferralResponse {
    /// Whether any credits were awarded.
    pub awarded: bool,
    /// Credits awarded.
    pub credits_awarded: i64,
    /// Balance after the award.
    pub balance: i64,
    /// Whether the referral event had already been paid out.
    pub replayed: bool,
}

/// Award the fixed credits for a verified referral action.
pub async fn award_referral(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<ReferralRequest>,
) -> Result<Json<ReferralResponse>, ApiError> {
    let user_id = parse_user_id(&body.user_id)?;
    let reference_id = required_reference(body.reference_id)?;

    let response = match state.credits.award_referral_credits(
        user_id,
        &body.reward,
        Some(reference_id),
    )? {
        Some(applied) => ReferralResponse {
            awarded: true,
            credits_awarded: applied.transaction.amount,
            balance: applied.account.credits,
            replayed: applied.replayed,
        },
        None => ReferralResponse {
            awarded: false,
            credits_awarded: 0,
            balance: state.ledger.balance(user_id)?,
            replayed: false,
        },
    };

    tracing::info!(
        service = %auth.service_name,
        user_id = %user_id,
        reward = %body.reward,
        awarded = response.awarded,
        "Referral reward processed"
    );

    Ok(Json(response))
}
