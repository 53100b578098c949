//! In-memory storage implementation.
//!
//! All state sits behind a single mutex, so every write is trivially atomic
//! and serialized. Nothing survives a restart.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use creditbook_core::{Account, CreditTransaction, TransactionId, UserId};

use crate::error::{Result, StoreError};
use crate::write::{Applied, LedgerWrite};
use crate::Store;

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<UserId, Account>,
    transactions: HashMap<TransactionId, CreditTransaction>,
    /// Per-user transaction IDs in append order.
    by_user: HashMap<UserId, Vec<TransactionId>>,
    references: HashMap<(UserId, String), TransactionId>,
}

impl State {
    fn referenced(&self, write: &LedgerWrite) -> Option<CreditTransaction> {
        let reference_id = write.reference_id.as_ref()?;
        let tx_id = self
            .references
            .get(&(write.user_id, reference_id.clone()))?;
        self.transactions.get(tx_id).cloned()
    }

    fn commit(&mut self, account: Account, transaction: CreditTransaction) -> Applied {
        let user_id = account.user_id;
        if let Some(reference_id) = &transaction.reference_id {
            self.references
                .insert((user_id, reference_id.clone()), transaction.id);
        }
        self.by_user.entry(user_id).or_default().push(transaction.id);
        self.transactions.insert(transaction.id, transaction.clone());
        self.accounts.insert(user_id, account.clone());
        Applied {
            transaction,
            account,
            replayed: false,
        }
    }
}

/// Process-local storage implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // Writes mutate the maps only after every check has passed.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for MemoryStore {
    fn create_account(&self, opening: &LedgerWrite) -> Result<Applied> {
        if opening.delta < 0 {
            return Err(StoreError::InvalidWrite(
                "an account cannot open with a debit".into(),
            ));
        }

        let mut state = self.state();
        if state.accounts.contains_key(&opening.user_id) {
            return Err(StoreError::AlreadyExists {
                entity: "account",
                id: opening.user_id.to_string(),
            });
        }

        let mut account = Account::new(opening.user_id);
        let transaction = opening.apply_to(&mut account)?;
        Ok(state.commit(account, transaction))
    }

    fn get_account(&self, user_id: &UserId) -> Result<Option<Account>> {
        Ok(self.state().accounts.get(user_id).cloned())
    }

    fn apply(&self, write: &LedgerWrite) -> Result<Applied> {
        let mut state = self.state();
        let mut account = state
            .accounts
            .get(&write.user_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                entity: "account",
                id: write.user_id.to_string(),
            })?;

        if let Some(transaction) = state.referenced(write) {
            return write.replay(transaction, account);
        }

        let transaction = write.apply_to(&mut account)?;
        Ok(state.commit(account, transaction))
    }

    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<CreditTransaction>> {
        Ok(self.state().transactions.get(transaction_id).cloned())
    }

    fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>> {
        let state = self.state();
        let Some(ids) = state.by_user.get(user_id) else {
            return Ok(Vec::new());
        };

        Ok(ids
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .filter_map(|id| state.transactions.get(id).cloned())
            .collect())
    }

    fn find_by_reference(
        &self,
        user_id: &UserId,
        reference_id: &str,
    ) -> Result<Option<CreditTransaction>> {
        let state = self.state();
        Ok(state
            .references
            .get(&(*user_id, reference_id.to_string()))
            .and_then(|id| state.transactions.get(id).cloned()))
    }
}
