//! Credit ledger for creditbook.
//!
//! - [`Ledger`]: the only way to change a balance. Grants are additive, debits
//!   never go below zero, and every change appends one transaction.
//! - [`CreditService`]: feature-level policy on top of the ledger (cost checks,
//!   rollover reports, referral rewards, package purchases).
//! - [`SubscriptionService`]: plan changes that add the new plan's allocation
//!   to the existing balance.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use creditbook_core::{Plan, PricingCatalog, UserId};
//! use creditbook_ledger::{ConsumeOutcome, CreditService, Ledger, SubscriptionService};
//! use creditbook_store::MemoryStore;
//!
//! let ledger = Ledger::new(Arc::new(MemoryStore::new()), Arc::new(PricingCatalog::default()));
//! let user_id = UserId::generate();
//! ledger.open_account(user_id).unwrap();
//!
//! let upgrade = SubscriptionService::new(ledger.clone())
//!     .upgrade_subscription(user_id, Plan::Pro, None)
//!     .unwrap();
//! assert_eq!(upgrade.applied.account.credits, 1100);
//!
//! let credits = CreditService::new(ledger.clone());
//! assert!(credits.has_credits(user_id, "imageGeneration", 1).unwrap());
//!
//! let outcome = ledger.consume_credits(user_id, "imageGeneration", 1, None).unwrap();
//! assert!(matches!(outcome, ConsumeOutcome::Charged(_)));
//! assert_eq!(ledger.balance(user_id).unwrap(), 1095);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ledger;
pub mod service;
pub mod subscription;

pub use creditbook_store::Applied;
pub use ledger::{ConsumeOutcome, Ledger, SIGNUP_REFERENCE};
pub use service::CreditService;
pub use subscription::{SubscriptionService, Upgrade};

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use creditbook_core::{PricingCatalog, UserId};
    use creditbook_store::MemoryStore;

    use crate::Ledger;

    pub fn ledger() -> Ledger {
        Ledger::new(
            Arc::new(MemoryStore::new()),
            Arc::new(PricingCatalog::default()),
        )
    }

    /// A fresh account on the free plan (100 credits).
    pub fn open(ledger: &Ledger) -> UserId {
        let user_id = UserId::generate();
        ledger.open_account(user_id).unwrap();
        user_id
    }
}
