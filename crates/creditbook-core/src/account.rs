//! Account types for creditbook.
//!
//! An account holds a user's credit balance and subscription plan. The balance
//! is only ever changed by ledger writes, each of which also appends a
//! [`CreditTransaction`](crate::CreditTransaction).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{LedgerError, UserId};

/// A credit account for a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// The user ID.
    pub user_id: UserId,

    /// Current credit balance. Never negative.
    pub credits: i64,

    /// Current subscription plan.
    pub plan: Plan,

    /// Lifetime credits bought through credit packages.
    pub lifetime_purchased: i64,

    /// Lifetime credits granted (plans, referrals, bonuses, refunds).
    pub lifetime_granted: i64,

    /// Lifetime credits spent on features or deducted.
    pub lifetime_used: i64,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account on the free plan with an empty balance.
    ///
    /// The signup allocation is applied by the ledger so that it shows up in
    /// the transaction log.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            credits: 0,
            plan: Plan::Free,
            lifetime_purchased: 0,
            lifetime_granted: 0,
            lifetime_used: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the account can cover a debit of `amount` credits.
    #[must_use]
    pub fn has_sufficient_credits(&self, amount: i64) -> bool {
        self.credits >= amount
    }
}

/// Subscription tiers.
///
/// Any plan may move to any other plan; the credit allocation for each tier
/// lives in the [`PricingCatalog`](crate::PricingCatalog).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    /// Free tier, assigned at signup.
    Free,
    /// Starter tier.
    Starter,
    /// Pro tier.
    Pro,
    /// Business tier.
    Business,
}

impl Plan {
    /// All plans, cheapest first.
    pub const ALL: [Plan; 4] = [Plan::Free, Plan::Starter, Plan::Pro, Plan::Business];

    /// The plan identifier as used in the catalog and the API.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Starter => "starter",
            Self::Pro => "pro",
            Self::Business => "business",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|plan| plan.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LedgerError::UnknownPlan {
                plan: s.to_string(),
            })
    }
}
