//! Credit transaction types for creditbook.
//!
//! Every change to an account balance creates exactly one transaction record.
//! Records are append-only: they are never mutated or deleted once written.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{TransactionId, UserId};

/// A credit transaction representing a balance change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditTransaction {
    /// Unique transaction ID (ULID for time-ordering).
    pub id: TransactionId,

    /// The user whose balance was affected.
    pub user_id: UserId,

    /// Type of transaction.
    pub transaction_type: TransactionType,

    /// Signed amount. Positive = credit, negative = debit.
    pub amount: i64,

    /// Balance after this transaction was applied.
    pub balance_after: i64,

    /// Human-readable description.
    pub description: String,

    /// Caller-supplied idempotency/audit key, unique per user when present.
    pub reference_id: Option<String>,

    /// When the transaction was created.
    pub created_at: DateTime<Utc>,
}

impl CreditTransaction {
    /// Create a transaction record for a balance change that has just been
    /// applied.
    #[must_use]
    pub fn new(
        user_id: UserId,
        transaction_type: TransactionType,
        amount: i64,
        balance_after: i64,
        description: impl Into<String>,
        reference_id: Option<String>,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            user_id,
            transaction_type,
            amount,
            balance_after,
            description: description.into(),
            reference_id,
            created_at: Utc::now(),
        }
    }

    /// Whether this transaction added credits.
    #[must_use]
    pub const fn is_credit(&self) -> bool {
        self.amount > 0
    }

    /// Whether this transaction removed credits.
    #[must_use]
    pub const fn is_debit(&self) -> bool {
        self.amount < 0
    }
}

/// Type of credit transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Credits bought through a credit package.
    Purchase,

    /// Credits earned through referrals or feedback.
    Earned,

    /// Credits consumed by a feature.
    Used,

    /// Credits deducted directly by a caller.
    Spent,

    /// Credits returned to the user.
    Refund,

    /// Promotional credits.
    Bonus,

    /// Allocation granted on a plan change.
    SubscriptionUpgrade,

    /// Allocation granted for a billing period (also the signup grant).
    MonthlyAllocation,

    /// Privileged manual correction, positive or negative.
    AdminAdjustment,
}

impl TransactionType {
    /// Whether this type always adds credits.
    #[must_use]
    pub const fn is_credit(&self) -> bool {
        matches!(
            self,
            Self::Purchase
                | Self::Earned
                | Self::Refund
                | Self::Bonus
                | Self::SubscriptionUpgrade
                | Self::MonthlyAllocation
        )
    }

    /// Whether this type always removes credits.
    #[must_use]
    pub const fn is_debit(&self) -> bool {
        matches!(self, Self::Used | Self::Spent)
    }

    /// The wire name of this type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Earned => "earned",
            Self::Used => "used",
            Self::Spent => "spent",
            Self::Refund => "refund",
            Self::Bonus => "bonus",
            Self::SubscriptionUpgrade => "subscription_upgrade",
            Self::MonthlyAllocation => "monthly_allocation",
            Self::AdminAdjustment => "admin_adjustment",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debit_transaction_sign() {
        let tx = CreditTransaction::new(
            UserId::generate(),
            TransactionType::Used,
            -5,
            95,
            "imageGeneration x1",
            None,
        );

        assert!(tx.is_debit());
        assert!(!tx.is_credit());
        assert_eq!(tx.balance_after, 95);
    }

    #[test]
    fn transaction_type_direction() {
        assert!(TransactionType::Purchase.is_credit());
        assert!(TransactionType::SubscriptionUpgrade.is_credit());
        assert!(TransactionType::MonthlyAllocation.is_credit());
        assert!(TransactionType::Used.is_debit());
        assert!(TransactionType::Spent.is_debit());

        // Admin adjustments go either way.
        assert!(!TransactionType::AdminAdjustment.is_credit());
        assert!(!TransactionType::AdminAdjustment.is_debit());
    }

    #[test]
    fn transaction_type_wire_name_matches_serde() {
        let json = serde_json::to_string(&TransactionType::SubscriptionUpgrade).unwrap();
        assert_eq!(json, format!("\"{}\"", TransactionType::SubscriptionUpgrade));
    }
}
