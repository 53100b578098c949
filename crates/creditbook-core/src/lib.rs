//! Core types for the creditbook credit ledger.
//!
//! This crate provides the foundational types shared by the store, the ledger
//! and the HTTP service:
//!
//! - **Identifiers**: `UserId`, `TransactionId`
//! - **Accounts**: `Account`, `Plan`
//! - **Credits**: `CreditTransaction`, `TransactionType`
//! - **Pricing**: `PricingCatalog`, `PlanPricing`, `CreditPackage`
//!
//! # Credits
//!
//! A credit is the internal unit of account consumed by content-generation
//! features. Balances are stored as `i64` whole credits and never drop below
//! zero. Feature costs may be fractional per unit; the total charged is always
//! rounded up to a whole credit.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod credits;
pub mod error;
pub mod ids;
pub mod pricing;

pub use account::{Account, Plan};
pub use credits::{CreditTransaction, TransactionType};
pub use error::{LedgerError, Result};
pub use ids::{IdError, TransactionId, UserId};
pub use pricing::{
    CreditPackage, PlanPricing, PricingCatalog, ReferralReward, INSUFFICIENT_CREDITS_MESSAGE,
};
