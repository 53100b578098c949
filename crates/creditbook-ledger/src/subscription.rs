//! Subscription plan changes.
//!
//! Changing plan never resets a balance. The new plan's monthly allocation is
//! added on top of whatever the user already has, and the plan switch is
//! written in the same atomic step as the credit.

use creditbook_core::{Plan, Result, TransactionType, UserId};
use creditbook_store::{Applied, LedgerWrite};

use crate::Ledger;

/// The result of a plan change.
#[derive(Debug, Clone)]
pub struct Upgrade {
    /// Plan before the change.
    pub previous_plan: Plan,
    /// The ledger write that carried the change.
    pub applied: Applied,
}

/// Applies plan changes to accounts.
#[derive(Clone)]
pub struct SubscriptionService {
    ledger: Ledger,
}

impl SubscriptionService {
    /// Create a service over a ledger.
    #[must_use]
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// Move the user to `new_plan` and add its allocation to the balance.
    ///
    /// Any plan can move to any plan, including the current one and cheaper
    /// ones. Pass the payment or subscription event ID as `reference_id` to
    /// make retries safe.
    ///
    /// # Errors
    ///
    /// - `LedgerError::UnknownPlan` if the catalog does not price `new_plan`.
    /// - `LedgerError::AccountNotFound` if the account doesn't exist.
    pub fn upgrade_subscription(
        &self,
        user_id: UserId,
        new_plan: Plan,
        reference_id: Option<String>,
    ) -> Result<Upgrade> {
        let allocation = self.ledger.catalog().plan(new_plan)?.monthly_credits;
        let previous_plan = self.ledger.account(user_id)?.plan;

        let applied = self.ledger.write(
            LedgerWrite::credit(
                user_id,
                TransactionType::SubscriptionUpgrade,
                allocation,
                format!("Subscription changed from {previous_plan} to {new_plan}"),
            )
            .with_reference(reference_id)
            .with_plan(new_plan),
        )?;

        tracing::info!(
            user_id = %user_id,
            previous_plan = %previous_plan,
            new_plan = %new_plan,
            added = allocation,
            balance = applied.account.credits,
            "Subscription changed"
        );

        Ok(Upgrade {
            previous_plan,
            applied,
        })
    }
}
