//! Ledger write requests.
//!
//! A [`LedgerWrite`] describes one balance change as a signed delta. Backends
//! apply it with [`LedgerWrite::apply_to`] while holding the user's write lock,
//! then persist the updated account and the resulting transaction together.

use chrono::Utc;

use creditbook_core::{Account, CreditTransaction, Plan, TransactionType, UserId};

use crate::error::{Result, StoreError};

/// A single balance change to apply to an account.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerWrite {
    /// The account to change.
    pub user_id: UserId,
    /// Type recorded on the transaction.
    pub transaction_type: TransactionType,
    /// Signed change to the balance.
    pub delta: i64,
    /// Description recorded on the transaction.
    pub description: String,
    /// Idempotency key, unique per user.
    pub reference_id: Option<String>,
    /// Plan to switch to in the same write.
    pub plan: Option<Plan>,
}

impl LedgerWrite {
    /// A write that adds `amount` credits.
    #[must_use]
    pub fn credit(
        user_id: UserId,
        transaction_type: TransactionType,
        amount: i64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            transaction_type,
            delta: amount,
            description: description.into(),
            reference_id: None,
            plan: None,
        }
    }

    /// A write that removes `amount` credits.
    #[must_use]
    pub fn debit(
        user_id: UserId,
        transaction_type: TransactionType,
        amount: i64,
        description: impl Into<String>,
    ) -> Self {
        Self::credit(user_id, transaction_type, -amount, description)
    }

    /// Attach an idempotency key.
    #[must_use]
    pub fn with_reference(mut self, reference_id: Option<String>) -> Self {
        self.reference_id = reference_id;
        self
    }

    /// Switch the account to `plan` as part of this write.
    #[must_use]
    pub fn with_plan(mut self, plan: Plan) -> Self {
        self.plan = Some(plan);
        self
    }

    /// Apply this write to `account` and build the transaction that records it.
    ///
    /// The account is left untouched on error.
    ///
    /// # Errors
    ///
    /// - `StoreError::InsufficientCredits` if a debit would go below zero.
    /// - `StoreError::InvalidWrite` if the delta overflows the balance.
    pub fn apply_to(&self, account: &mut Account) -> Result<CreditTransaction> {
        let balance = account.credits;
        let new_balance = balance.checked_add(self.delta).ok_or_else(|| {
            StoreError::InvalidWrite(format!(
                "delta {} overflows balance {balance}",
                self.delta
            ))
        })?;

        if self.delta < 0 && new_balance < 0 {
            return Err(StoreError::InsufficientCredits {
                balance,
                required: -self.delta,
            });
        }

        account.credits = new_balance;
        match self.transaction_type {
            TransactionType::Purchase => account.lifetime_purchased += self.delta,
            _ if self.delta > 0 => account.lifetime_granted += self.delta,
            _ => account.lifetime_used -= self.delta,
        }
        if let Some(plan) = self.plan {
            account.plan = plan;
        }
        account.updated_at = Utc::now();

        Ok(CreditTransaction::new(
            self.user_id,
            self.transaction_type,
            self.delta,
            new_balance,
            self.description.clone(),
            self.reference_id.clone(),
        ))
    }
}

impl LedgerWrite {
    /// Resolve a write whose reference already recorded `transaction`.
    ///
    /// Only the same kind of write for the same amount counts as a replay.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ReferenceConflict` if `transaction` records a
    /// different write.
    pub(crate) fn replay(
        &self,
        transaction: CreditTransaction,
        account: Account,
    ) -> Result<Applied> {
        if transaction.transaction_type != self.transaction_type
            || transaction.amount != self.delta
        {
            return Err(StoreError::ReferenceConflict {
                reference_id: transaction.reference_id.clone().unwrap_or_default(),
                transaction_id: transaction.id.to_string(),
            });
        }

        tracing::debug!(
            user_id = %self.user_id,
            reference_id = ?self.reference_id,
            transaction_id = %transaction.id,
            "Ledger write replayed"
        );
        Ok(Applied {
            transaction,
            account,
            replayed: true,
        })
    }
}

/// The outcome of a ledger write.
#[derive(Debug, Clone)]
pub struct Applied {
    /// The transaction that recorded the write, or the original transaction
    /// when the write was a replay.
    pub transaction: CreditTransaction,
    /// The account after the write.
    pub account: Account,
    /// Whether the write was skipped because its reference was already used.
    pub replayed: bool,
}
