//! The credit ledger.
//!
//! Every operation here becomes exactly one [`LedgerWrite`], applied atomically
//! by the store: grants are `balance += amount`, debits are `balance -= amount`
//! with a floor at zero. Nothing assigns a balance.

use std::sync::Arc;

use creditbook_core::{
    Account, CreditTransaction, LedgerError, Plan, PricingCatalog, Result, TransactionType, UserId,
};
use creditbook_store::{Applied, LedgerWrite, Store, StoreError};

/// Reference used for the signup allocation, so it can only happen once.
pub const SIGNUP_REFERENCE: &str = "signup";

/// Result of a feature consumption attempt.
///
/// Running out of credits is a routine outcome for feature usage, so it is
/// reported as [`ConsumeOutcome::Declined`] rather than an error.
#[derive(Debug, Clone)]
pub enum ConsumeOutcome {
    /// The cost was deducted.
    Charged(Applied),
    /// The balance could not cover the cost. Nothing was written.
    Declined {
        /// Current balance.
        balance: i64,
        /// Credits the feature would have cost.
        required: i64,
    },
}

impl ConsumeOutcome {
    /// Whether credits were deducted.
    #[must_use]
    pub const fn is_charged(&self) -> bool {
        matches!(self, Self::Charged(_))
    }
}

/// The credit ledger.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn Store>,
    catalog: Arc<PricingCatalog>,
}

impl Ledger {
    /// Create a ledger over a store and a pricing catalog.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, catalog: Arc<PricingCatalog>) -> Self {
        Self { store, catalog }
    }

    /// The pricing catalog in use.
    #[must_use]
    pub fn catalog(&self) -> &PricingCatalog {
        &self.catalog
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Create an account on the free plan, opening with the free allocation.
    ///
    /// # Errors
    ///
    /// - `LedgerError::AccountExists` if the account already exists.
    /// - `LedgerError::UnknownPlan` if the catalog has no free plan.
    pub fn open_account(&self, user_id: UserId) -> Result<Applied> {
        let allocation = self.catalog.plan(Plan::Free)?.monthly_credits;
        let opening = LedgerWrite::credit(
            user_id,
            TransactionType::MonthlyAllocation,
            allocation,
            "Signup allocation",
        )
        .with_reference(Some(SIGNUP_REFERENCE.to_string()));

        let applied = self.store.create_account(&opening)?;
        tracing::info!(user_id = %user_id, credits = allocation, "Account opened");
        Ok(applied)
    }

    /// Get an account.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::AccountNotFound` if the account doesn't exist.
    pub fn account(&self, user_id: UserId) -> Result<Account> {
        self.store
            .get_account(&user_id)?
            .ok_or_else(|| LedgerError::AccountNotFound {
                user_id: user_id.to_string(),
            })
    }

    /// Current balance.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::AccountNotFound` if the account doesn't exist.
    pub fn balance(&self, user_id: UserId) -> Result<i64> {
        Ok(self.account(user_id)?.credits)
    }

    /// Transaction history, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn transactions(
        &self,
        user_id: UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>> {
        Ok(self
            .store
            .list_transactions_by_user(&user_id, limit, offset)?)
    }

    /// The transaction a reference already recorded, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn find_by_reference(
        &self,
        user_id: UserId,
        reference_id: &str,
    ) -> Result<Option<CreditTransaction>> {
        Ok(self.store.find_by_reference(&user_id, reference_id)?)
    }

    // =========================================================================
    // Balance changes
    // =========================================================================

    /// Add `amount` credits.
    ///
    /// A repeated `reference_id` returns the original transaction without
    /// changing the balance.
    ///
    /// # Errors
    ///
    /// - `LedgerError::InvalidAmount` if `amount <= 0` or `transaction_type` is
    ///   a debit type.
    /// - `LedgerError::AccountNotFound` if the account doesn't exist.
    pub fn add_credits(
        &self,
        user_id: UserId,
        amount: i64,
        transaction_type: TransactionType,
        description: impl Into<String>,
        reference_id: Option<String>,
    ) -> Result<Applied> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "credit grants must be positive, got {amount}"
            )));
        }
        if transaction_type.is_debit() {
            return Err(LedgerError::InvalidAmount(format!(
                "{transaction_type} cannot add credits"
            )));
        }

        self.write(
            LedgerWrite::credit(user_id, transaction_type, amount, description)
                .with_reference(reference_id),
        )
    }

    /// Charge for `quantity` uses of `feature`.
    ///
    /// The cost is `ceil(unit_cost * quantity)`. An uncovered cost is declined
    /// and leaves the balance untouched.
    ///
    /// # Errors
    ///
    /// - `LedgerError::UnknownFeature` if the feature is not priced.
    /// - `LedgerError::InvalidAmount` if `quantity` is zero.
    /// - `LedgerError::AccountNotFound` if the account doesn't exist.
    pub fn consume_credits(
        &self,
        user_id: UserId,
        feature: &str,
        quantity: u32,
        description: Option<&str>,
    ) -> Result<ConsumeOutcome> {
        if quantity == 0 {
            return Err(LedgerError::InvalidAmount("quantity must be at least 1".into()));
        }
        let cost = self.catalog.credit_cost(feature, quantity)?;
        let description = description.map_or_else(
            || format!("{feature} x{quantity}"),
            ToString::to_string,
        );

        match self.write(LedgerWrite::debit(
            user_id,
            TransactionType::Used,
            cost,
            description,
        )) {
            Ok(applied) => Ok(ConsumeOutcome::Charged(applied)),
            Err(LedgerError::InsufficientCredits { balance, required }) => {
                tracing::info!(
                    user_id = %user_id,
                    feature = %feature,
                    balance,
                    required,
                    "Feature usage declined"
                );
                Ok(ConsumeOutcome::Declined { balance, required })
            }
            Err(e) => Err(e),
        }
    }

    /// Deduct `amount` credits.
    ///
    /// # Errors
    ///
    /// - `LedgerError::InsufficientCredits` if the balance is below `amount`;
    ///   the balance is left untouched.
    /// - `LedgerError::InvalidAmount` if `amount <= 0`.
    /// - `LedgerError::AccountNotFound` if the account doesn't exist.
    pub fn deduct_credits(
        &self,
        user_id: UserId,
        amount: i64,
        description: impl Into<String>,
        reference_id: Option<String>,
    ) -> Result<Applied> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "deductions must be positive, got {amount}"
            )));
        }

        self.write(
            LedgerWrite::debit(user_id, TransactionType::Spent, amount, description)
                .with_reference(reference_id),
        )
    }

    /// Privileged manual correction in either direction.
    ///
    /// # Errors
    ///
    /// - `LedgerError::InvalidAmount` if `delta` is zero.
    /// - `LedgerError::InsufficientCredits` if a negative delta exceeds the
    ///   balance.
    /// - `LedgerError::AccountNotFound` if the account doesn't exist.
    pub fn adjust_credits(
        &self,
        user_id: UserId,
        delta: i64,
        reason: impl Into<String>,
        reference_id: Option<String>,
    ) -> Result<Applied> {
        if delta == 0 {
            return Err(LedgerError::InvalidAmount(
                "adjustment must be non-zero".into(),
            ));
        }

        let reason = reason.into();
        tracing::warn!(user_id = %user_id, delta, reason = %reason, "Admin credit adjustment");
        self.write(
            LedgerWrite::credit(user_id, TransactionType::AdminAdjustment, delta, reason)
                .with_reference(reference_id),
        )
    }

    /// Apply a write and log it.
    pub(crate) fn write(&self, write: LedgerWrite) -> Result<Applied> {
        let applied = self.store.apply(&write).map_err(|e| {
            if !matches!(e, StoreError::InsufficientCredits { .. }) {
                tracing::warn!(
                    user_id = %write.user_id,
                    transaction_type = %write.transaction_type,
                    delta = write.delta,
                    error = %e,
                    "Ledger write failed"
                );
            }
            LedgerError::from(e)
        })?;

        if applied.replayed {
            tracing::info!(
                user_id = %write.user_id,
                reference_id = ?write.reference_id,
                transaction_id = %applied.transaction.id,
                "Duplicate reference, ledger write skipped"
            );
        } else {
            tracing::info!(
                user_id = %write.user_id,
                transaction_type = %write.transaction_type,
                amount = applied.transaction.amount,
                balance = applied.account.credits,
                transaction_id = %applied.transaction.id,
                "Ledger write applied"
            );
        }

        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ledger, open};

    #[test]
    fn open_account_grants_free_allocation_once() {
        let ledger = ledger();
        let user_id = open(&ledger);

        assert_eq!(ledger.balance(user_id).unwrap(), 100);
        assert!(matches!(
            ledger.open_account(user_id),
            Err(LedgerError::AccountExists { .. })
        ));

        let history = ledger.transactions(user_id, 10, 0).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].transaction_type, TransactionType::MonthlyAllocation);
        assert_eq!(history[0].reference_id.as_deref(), Some(SIGNUP_REFERENCE));
    }

    #[test]
    fn add_credits_is_additive() {
        let ledger = ledger();
        let user_id = open(&ledger);

        ledger
            .add_credits(user_id, 250, TransactionType::Purchase, "medium", None)
            .unwrap();
        let applied = ledger
            .add_credits(user_id, 50, TransactionType::Earned, "inviteFriend", None)
            .unwrap();

        assert_eq!(applied.account.credits, 400);
        assert_eq!(applied.transaction.amount, 50);
    }

    #[test]
    fn add_credits_to_missing_account() {
        let ledger = ledger();
        let err = ledger
            .add_credits(UserId::generate(), 10, TransactionType::Bonus, "x", None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::AccountNotFound { .. }));
    }

    #[test]
    fn add_credits_rejects_non_positive_and_debit_types() {
        let ledger = ledger();
        let user_id = open(&ledger);

        for amount in [0, -5] {
            assert!(matches!(
                ledger.add_credits(user_id, amount, TransactionType::Bonus, "x", None),
                Err(LedgerError::InvalidAmount(_))
            ));
        }
        assert!(matches!(
            ledger.add_credits(user_id, 5, TransactionType::Used, "x", None),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert_eq!(ledger.balance(user_id).unwrap(), 100);
    }

    #[test]
    fn add_credits_with_same_reference_applies_once() {
        let ledger = ledger();
        let user_id = open(&ledger);

        let first = ledger
            .add_credits(
                user_id,
                500,
                TransactionType::Purchase,
                "medium",
                Some("pay_abc".into()),
            )
            .unwrap();
        let second = ledger
            .add_credits(
                user_id,
                500,
                TransactionType::Purchase,
                "medium",
                Some("pay_abc".into()),
            )
            .unwrap();

        assert!(second.replayed);
        assert_eq!(first.transaction.id, second.transaction.id);
        assert_eq!(ledger.balance(user_id).unwrap(), 600);
        assert_eq!(ledger.transactions(user_id, 10, 0).unwrap().len(), 2);
    }

    #[test]
    fn consume_charges_rounded_up_cost() {
        let ledger = ledger();
        let user_id = open(&ledger);

        let outcome = ledger
            .consume_credits(user_id, "captionGeneration", 3, None)
            .unwrap();

        let ConsumeOutcome::Charged(applied) = outcome else {
            panic!("expected a charge");
        };
        assert_eq!(applied.transaction.amount, -2);
        assert_eq!(applied.transaction.transaction_type, TransactionType::Used);
        assert_eq!(applied.transaction.description, "captionGeneration x3");
        assert_eq!(applied.account.credits, 98);
    }

    #[test]
    fn consume_declines_without_touching_balance() {
        let ledger = ledger();
        let user_id = open(&ledger);

        let outcome = ledger.consume_credits(user_id, "video", 3, None).unwrap();

        assert!(matches!(
            outcome,
            ConsumeOutcome::Declined {
                balance: 100,
                required: 150
            }
        ));
        assert_eq!(ledger.balance(user_id).unwrap(), 100);
        assert_eq!(ledger.transactions(user_id, 10, 0).unwrap().len(), 1);
    }

    #[test]
    fn consume_unknown_feature() {
        let ledger = ledger();
        let user_id = open(&ledger);
        assert!(matches!(
            ledger.consume_credits(user_id, "hologram", 1, None),
            Err(LedgerError::UnknownFeature { .. })
        ));
    }

    #[test]
    fn consume_zero_quantity_is_invalid() {
        let ledger = ledger();
        let user_id = open(&ledger);
        assert!(matches!(
            ledger.consume_credits(user_id, "video", 0, None),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn deduct_more_than_balance_fails_and_keeps_balance() {
        let ledger = ledger();
        let user_id = open(&ledger);
        ledger.deduct_credits(user_id, 90, "setup", None).unwrap();

        let err = ledger.deduct_credits(user_id, 50, "test", None).unwrap_err();

        assert!(matches!(
            err,
            LedgerError::InsufficientCredits {
                balance: 10,
                required: 50
            }
        ));
        assert_eq!(ledger.balance(user_id).unwrap(), 10);
    }

    #[test]
    fn deduct_records_spent_transaction() {
        let ledger = ledger();
        let user_id = open(&ledger);

        let applied = ledger
            .deduct_credits(user_id, 30, "thumbnail batch", Some("job_1".into()))
            .unwrap();

        assert_eq!(applied.transaction.transaction_type, TransactionType::Spent);
        assert_eq!(applied.transaction.amount, -30);
        assert_eq!(applied.account.lifetime_used, 30);
    }

    #[test]
    fn refund_cannot_reuse_a_deduction_reference() {
        let ledger = ledger();
        let user_id = open(&ledger);
        ledger
            .deduct_credits(user_id, 30, "render", Some("job_1".into()))
            .unwrap();

        let err = ledger
            .add_credits(
                user_id,
                30,
                TransactionType::Refund,
                "render failed",
                Some("job_1".into()),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::ReferenceConflict { ref reference_id } if reference_id == "job_1"
        ));
        assert_eq!(ledger.balance(user_id).unwrap(), 70);

        // A fresh reference goes through.
        ledger
            .add_credits(
                user_id,
                30,
                TransactionType::Refund,
                "render failed",
                Some("job_1:refund".into()),
            )
            .unwrap();
        assert_eq!(ledger.balance(user_id).unwrap(), 100);
    }

    #[test]
    fn deduct_retry_with_other_amount_is_rejected() {
        let ledger = ledger();
        let user_id = open(&ledger);
        ledger
            .deduct_credits(user_id, 30, "render", Some("job_1".into()))
            .unwrap();

        assert!(matches!(
            ledger.deduct_credits(user_id, 45, "render", Some("job_1".into())),
            Err(LedgerError::ReferenceConflict { .. })
        ));
        let retry = ledger
            .deduct_credits(user_id, 30, "render", Some("job_1".into()))
            .unwrap();
        assert!(retry.replayed);
        assert_eq!(ledger.balance(user_id).unwrap(), 70);
    }

    #[test]
    fn admin_adjustment_goes_through_ledger() {
        let ledger = ledger();
        let user_id = open(&ledger);

        ledger.adjust_credits(user_id, 40, "goodwill", None).unwrap();
        ledger.adjust_credits(user_id, -20, "correction", None).unwrap();
        let err = ledger
            .adjust_credits(user_id, -1000, "too much", None)
            .unwrap_err();

        assert!(matches!(err, LedgerError::InsufficientCredits { .. }));
        assert_eq!(ledger.balance(user_id).unwrap(), 120);

        let history = ledger.transactions(user_id, 10, 0).unwrap();
        assert!(history[..2]
            .iter()
            .all(|tx| tx.transaction_type == TransactionType::AdminAdjustment));
    }

    #[test]
    fn balance_equals_sum_of_history() {
        let ledger = ledger();
        let user_id = open(&ledger);

        ledger
            .add_credits(user_id, 500, TransactionType::Purchase, "medium", None)
            .unwrap();
        ledger.consume_credits(user_id, "imageGeneration", 4, None).unwrap();
        ledger.deduct_credits(user_id, 7, "misc", None).unwrap();
        ledger.consume_credits(user_id, "video", 100, None).unwrap();
        ledger.adjust_credits(user_id, -3, "fix", None).unwrap();

        let history = ledger.transactions(user_id, usize::MAX, 0).unwrap();
        let sum: i64 = history.iter().map(|tx| tx.amount).sum();
        assert_eq!(sum, ledger.balance(user_id).unwrap());
        assert_eq!(sum, 100 + 500 - 20 - 7 - 3);
    }
}
