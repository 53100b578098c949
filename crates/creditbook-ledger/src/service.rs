//! Feature-level credit policy.

use chrono::NaiveDate;

use creditbook_core::{LedgerError, Result, TransactionType, UserId};
use creditbook_store::Applied;

use crate::Ledger;

/// Credit policy wrapping the [`Ledger`].
#[derive(Clone)]
pub struct CreditService {
    ledger: Ledger,
}

impl CreditService {
    /// Create a service over a ledger.
    #[must_use]
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// The underlying ledger.
    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Whether the user can currently afford `quantity` uses of `feature`.
    ///
    /// This is a read: the answer can be stale by the time the caller charges.
    ///
    /// # Errors
    ///
    /// - `LedgerError::UnknownFeature` if the feature is not priced.
    /// - `LedgerError::AccountNotFound` if the account doesn't exist.
    pub fn has_credits(&self, user_id: UserId, feature: &str, quantity: u32) -> Result<bool> {
        let required = self.get_credit_cost(feature, quantity)?;
        Ok(self.ledger.account(user_id)?.has_sufficient_credits(required))
    }

    /// Credits charged for `quantity` uses of `feature`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UnknownFeature` if the feature is not priced.
    pub fn get_credit_cost(&self, feature: &str, quantity: u32) -> Result<i64> {
        self.ledger.catalog().credit_cost(feature, quantity)
    }

    /// Credits left over from the previous allocation period.
    ///
    /// Looks at the two most recent `monthly_allocation` transactions and
    /// subtracts everything debited between them from the older allocation,
    /// clamped to `0..=allocation`. Fewer than two allocations yields `0`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::AccountNotFound` if the account doesn't exist.
    pub fn calculate_credit_rollover(&self, user_id: UserId) -> Result<i64> {
        self.ledger.account(user_id)?;
        let history = self.ledger.transactions(user_id, usize::MAX, 0)?;

        let mut allocations = history
            .iter()
            .enumerate()
            .filter(|(_, tx)| tx.transaction_type == TransactionType::MonthlyAllocation);
        let (Some((latest, _)), Some((previous, allocation))) =
            (allocations.next(), allocations.next())
        else {
            return Ok(0);
        };

        // History is newest first, so the previous period sits between the two.
        let used: i64 = history[latest + 1..previous]
            .iter()
            .filter(|tx| tx.is_debit())
            .map(|tx| -tx.amount)
            .sum();

        let allocation = allocation.amount;
        Ok((allocation - used).clamp(0, allocation.max(0)))
    }

    /// Award the fixed reward for a referral action.
    ///
    /// Returns `Ok(None)` without touching the ledger when the reward table
    /// has no entry for `reward`. The referral event ID goes in
    /// `reference_id`, so each event pays out once.
    ///
    /// # Errors
    ///
    /// - `LedgerError::AccountNotFound` if the account doesn't exist.
    /// - `LedgerError::ReferenceConflict` if the reference was used for
    ///   another change.
    pub fn award_referral_credits(
        &self,
        user_id: UserId,
        reward: &str,
        reference_id: Option<String>,
    ) -> Result<Option<Applied>> {
        let Some(amount) = self.ledger.catalog().referral_reward(reward) else {
            tracing::debug!(user_id = %user_id, reward = %reward, "No referral reward configured");
            return Ok(None);
        };

        self.ledger
            .add_credits(
                user_id,
                amount,
                TransactionType::Earned,
                format!("Referral reward: {reward}"),
                reference_id,
            )
            .map(Some)
    }

    /// Automatic monthly resets are disabled.
    ///
    /// Credits are only ever purchased or explicitly granted; an unused
    /// balance is never wiped or topped back up to a plan total. This logs the
    /// policy and changes nothing.
    pub fn reset_monthly_credits(&self, user_id: UserId) {
        tracing::info!(
            user_id = %user_id,
            "Monthly credit reset skipped: automatic resets are disabled, credits must be purchased or granted"
        );
    }

    /// Credit a purchased package once the payment has been verified.
    ///
    /// The payment reference doubles as the idempotency key, so a retried
    /// webhook cannot credit the same payment twice.
    ///
    /// # Errors
    ///
    /// - `LedgerError::UnknownPackage` if the package does not exist.
    /// - `LedgerError::AccountNotFound` if the account doesn't exist.
    pub fn purchase_package(
        &self,
        user_id: UserId,
        package_id: &str,
        payment_reference: &str,
    ) -> Result<Applied> {
        let package = self.ledger.catalog().package(package_id)?;
        self.ledger.add_credits(
            user_id,
            package.credits,
            TransactionType::Purchase,
            format!("Purchased {package_id} package ({} credits)", package.credits),
            Some(payment_reference.to_string()),
        )
    }

    /// Return credits to a user.
    ///
    /// # Errors
    ///
    /// - `LedgerError::InvalidAmount` if `amount <= 0`.
    /// - `LedgerError::AccountNotFound` if the account doesn't exist.
    pub fn refund_credits(
        &self,
        user_id: UserId,
        amount: i64,
        reason: impl Into<String>,
        reference_id: Option<String>,
    ) -> Result<Applied> {
        self.ledger
            .add_credits(user_id, amount, TransactionType::Refund, reason, reference_id)
    }

    /// Grant promotional credits.
    ///
    /// # Errors
    ///
    /// - `LedgerError::InvalidAmount` if `amount <= 0`.
    /// - `LedgerError::AccountNotFound` if the account doesn't exist.
    pub fn grant_bonus(
        &self,
        user_id: UserId,
        amount: i64,
        reason: impl Into<String>,
    ) -> Result<Applied> {
        self.ledger
            .add_credits(user_id, amount, TransactionType::Bonus, reason, None)
    }

    /// Grant the current plan's allocation for the period containing `period`.
    ///
    /// The allocation is added to the balance. Each period can be granted at
    /// most once.
    ///
    /// # Errors
    ///
    /// - `LedgerError::UnknownPlan` if the user's plan is no longer priced.
    /// - `LedgerError::InvalidAmount` if the plan allocates nothing.
    /// - `LedgerError::AccountNotFound` if the account doesn't exist.
    pub fn grant_monthly_allocation(&self, user_id: UserId, period: NaiveDate) -> Result<Applied> {
        let account = self.ledger.account(user_id)?;
        let period = period.format("%Y-%m");
        let reference_id = format!("allocation:{period}");

        // The plan may have changed since the period was granted.
        if let Some(transaction) = self.ledger.find_by_reference(user_id, &reference_id)? {
            if transaction.transaction_type == TransactionType::MonthlyAllocation {
                tracing::debug!(user_id = %user_id, period = %period, "Allocation already granted");
                return Ok(Applied {
                    transaction,
                    account,
                    replayed: true,
                });
            }
        }

        let plan = account.plan;
        let allocation = self.ledger.catalog().plan(plan)?.monthly_credits;
        if allocation <= 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "plan {plan} has no monthly allocation"
            )));
        }

        self.ledger.add_credits(
            user_id,
            allocation,
            TransactionType::MonthlyAllocation,
            format!("{plan} allocation for {period}"),
            Some(reference_id),
        )
    }
}
