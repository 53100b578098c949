//! Request and response types for the creditbook API.

use creditbook_core::UserId;
use serde::{Deserialize, Serialize};

/// Feature check request.
#[derive(Debug, Clone, Serialize)]
pub struct CheckRequest {
    /// User to check.
    pub user_id: UserId,
    /// Feature identifier.
    pub feature: String,
    /// Number of units.
    pub quantity: u32,
}

/// Feature check response.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckResponse {
    /// Whether the balance covers the cost.
    pub allowed: bool,
    /// Credits the usage would cost.
    pub cost: i64,
    /// Current balance.
    pub balance: i64,
}

/// Feature consumption request.
#[derive(Debug, Clone, Serialize)]
pub struct ConsumeRequest {
    /// User to charge.
    pub user_id: UserId,
    /// Feature identifier.
    pub feature: String,
    /// Number of units.
    pub quantity: u32,
    /// Description recorded on the transaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Feature consumption response.
///
/// A declined charge is not an error: `charged` is `false` and `message`
/// carries the text to show the user.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsumeResponse {
    /// Whether credits were deducted.
    pub charged: bool,
    /// Credits charged, or that would have been charged.
    pub cost: i64,
    /// Balance after the attempt.
    pub balance: i64,
    /// Transaction ID when charged.
    pub transaction_id: Option<String>,
    /// User-facing message when declined.
    pub message: Option<String>,
}

/// Direct deduction request.
#[derive(Debug, Clone, Serialize)]
pub struct DeductRequest {
    /// User to charge.
    pub user_id: UserId,
    /// Credits to deduct.
    pub amount: i64,
    /// Description recorded on the transaction.
    pub description: String,
    /// Idempotency key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
}

/// Verified package purchase.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseRequest {
    /// Buyer.
    pub user_id: UserId,
    /// Package identifier.
    pub package_id: String,
    /// Payment identifier, used as the idempotency key.
    pub payment_reference: String,
}

/// Paid plan change.
#[derive(Debug, Clone, Serialize)]
pub struct UpgradeRequest {
    /// User whose subscription changed.
    pub user_id: UserId,
    /// Target plan (`free`, `starter`, `pro`, `business`).
    pub plan: String,
    /// Payment or subscription event ID.
    pub reference_id: String,
}

/// Result of a plan change.
#[derive(Debug, Clone, Deserialize)]
pub struct UpgradeResponse {
    /// Plan before the change.
    pub previous_plan: String,
    /// Plan after the change.
    pub plan: String,
    /// Credits added by the change.
    pub credits_added: i64,
    /// Balance after the change.
    pub credits: i64,
    /// Whether the event had already been applied.
    pub replayed: bool,
    /// The recorded transaction.
    pub transaction: Transaction,
}

/// Verified referral action.
#[derive(Debug, Clone, Serialize)]
pub struct ReferralRequest {
    /// User who earned the reward.
    pub user_id: UserId,
    /// Reward type (`inviteFriend`, `submitFeedback`).
    pub reward: String,
    /// Referral event ID.
    pub reference_id: String,
}

/// Result of a referral payout.
#[derive(Debug, Clone, Deserialize)]
pub struct ReferralResponse {
    /// Whether any credits were awarded.
    pub awarded: bool,
    /// Credits awarded.
    pub credits_awarded: i64,
    /// Balance after the award.
    pub balance: i64,
    /// Whether the event had already been paid out.
    pub replayed: bool,
}

/// A ledger transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
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
    pub reference_id: Option<String>,
    /// Timestamp (RFC 3339).
    pub created_at: String,
}

/// Result of a ledger write.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerWriteResponse {
    /// The recorded transaction (the original one on replay).
    pub transaction: Transaction,
    /// Balance after the write.
    pub balance: i64,
    /// Whether the reference had already been applied.
    pub replayed: bool,
}

/// Balance response.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceResponse {
    /// Current balance in credits.
    pub credits: i64,
    /// Current plan.
    pub plan: String,
}

/// API error response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorBody,
}

/// API error body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
    /// Additional details.
    pub details: Option<serde_json::Value>,
}
