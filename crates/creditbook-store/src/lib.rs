//! Storage layer for creditbook.
//!
//! This crate persists accounts and the append-only transaction log. All
//! balance changes go through [`Store::apply`], which performs the floor
//! check, the balance delta, the lifetime counters and the transaction append
//! as one atomic write. There is no way to assign a balance directly.
//!
//! # Backends
//!
//! - [`MemoryStore`]: process-local maps, used by tests and ephemeral deploys.
//! - `RocksStore` (feature `rocksdb-backend`): persistent storage using
//!   column families:
//!   - `accounts`: account records, keyed by `user_id`
//!   - `transactions`: credit transactions, keyed by `transaction_id` (ULID)
//!   - `transactions_by_user`: index for listing transactions by user
//!   - `references`: `(user_id, reference_id)` uniqueness index
//!
//! # Example
//!
//! ```
//! use creditbook_core::{Plan, TransactionType, UserId};
//! use creditbook_store::{LedgerWrite, MemoryStore, Store};
//!
//! let store = MemoryStore::new();
//! let user_id = UserId::generate();
//!
//! store
//!     .create_account(&LedgerWrite::credit(
//!         user_id,
//!         TransactionType::MonthlyAllocation,
//!         100,
//!         "Signup allocation",
//!     ))
//!     .unwrap();
//!
//! let applied = store
//!     .apply(&LedgerWrite::credit(user_id, TransactionType::Bonus, 25, "Welcome bonus"))
//!     .unwrap();
//! assert_eq!(applied.account.credits, 125);
//! assert_eq!(applied.account.plan, Plan::Free);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod locks;
pub mod memory;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;
pub mod write;

#[cfg(test)]
mod conformance;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;
pub use write::{Applied, LedgerWrite};

use creditbook_core::{Account, CreditTransaction, TransactionId, UserId};

/// The storage trait defining all database operations.
///
/// Implementations must serialize writers per user so that two concurrent
/// writes against the same balance can never lose an update.
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Create an account and apply its opening write in one atomic step.
    ///
    /// # Errors
    ///
    /// - `StoreError::AlreadyExists` if the account exists.
    /// - `StoreError::InvalidWrite` if the opening write is a debit.
    fn create_account(&self, opening: &LedgerWrite) -> Result<Applied>;

    /// Get an account by user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account(&self, user_id: &UserId) -> Result<Option<Account>>;

    // =========================================================================
    // Ledger Writes
    // =========================================================================

    /// Apply a balance delta and append its transaction atomically.
    ///
    /// When the write carries a reference that this user already recorded
    /// with the same transaction type and amount, nothing is written and the
    /// original transaction is returned with `replayed` set.
    ///
    /// Checks run in order: account, reference, floor.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account doesn't exist.
    /// - `StoreError::ReferenceConflict` if the reference recorded a
    ///   different write.
    /// - `StoreError::InsufficientCredits` if a debit would go below zero.
    /// - `StoreError::InvalidWrite` if the delta overflows the balance.
    fn apply(&self, write: &LedgerWrite) -> Result<Applied>;

    // =========================================================================
    // Transaction Operations
    // =========================================================================

    /// Get a transaction by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<CreditTransaction>>;

    /// List transactions for a user, ordered by time (newest first).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>>;

    /// Find the transaction a user wrote with the given reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_by_reference(
        &self,
        user_id: &UserId,
        reference_id: &str,
    ) -> Result<Option<CreditTransaction>>;
}
