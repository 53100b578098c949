//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.
//! Ledger writes hold the user's lock stripe from the first read until the
//! `WriteBatch` carrying the account, the transaction and both indexes commits.

use std::path::Path;
use std::sync::Arc;

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use creditbook_core::{Account, CreditTransaction, TransactionId, UserId};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::locks::UserLocks;
use crate::schema::{all_column_families, cf};
use crate::write::{Applied, LedgerWrite};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    locks: UserLocks,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            locks: UserLocks::default(),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get<T: serde::de::DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Commit an account update and its transaction in one batch.
    fn commit(&self, account: &Account, transaction: &CreditTransaction) -> Result<()> {
        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let cf_tx_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;
        let cf_refs = self.cf(cf::REFERENCES)?;

        let account_key = keys::account_key(&account.user_id);
        let tx_key = keys::transaction_key(&transaction.id);
        let user_tx_key = keys::user_transaction_key(&account.user_id, &transaction.id);

        let account_value = Self::serialize(account)?;
        let tx_value = Self::serialize(transaction)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_accounts, &account_key, &account_value);
        batch.put_cf(&cf_tx, &tx_key, &tx_value);
        batch.put_cf(&cf_tx_by_user, &user_tx_key, []);
        if let Some(reference_id) = &transaction.reference_id {
            let ref_key = keys::reference_key(&account.user_id, reference_id);
            batch.put_cf(&cf_refs, &ref_key, tx_key);
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl Store for RocksStore {
    fn create_account(&self, opening: &LedgerWrite) -> Result<Applied> {
        if opening.delta < 0 {
            return Err(StoreError::InvalidWrite(
                "an account cannot open with a debit".into(),
            ));
        }

        let _guard = self.locks.lock(&opening.user_id);
        if self.get_account(&opening.user_id)?.is_some() {
            return Err(StoreError::AlreadyExists {
                entity: "account",
                id: opening.user_id.to_string(),
            });
        }

        let mut account = Account::new(opening.user_id);
        let transaction = opening.apply_to(&mut account)?;
        self.commit(&account, &transaction)?;

        Ok(Applied {
            transaction,
            account,
            replayed: false,
        })
    }

    fn get_account(&self, user_id: &UserId) -> Result<Option<Account>> {
        self.get(cf::ACCOUNTS, &keys::account_key(user_id))
    }

    fn apply(&self, write: &LedgerWrite) -> Result<Applied> {
        let _guard = self.locks.lock(&write.user_id);

        let mut account = self
            .get_account(&write.user_id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "account",
                id: write.user_id.to_string(),
            })?;

        if let Some(reference_id) = &write.reference_id {
            if let Some(transaction) = self.find_by_reference(&write.user_id, reference_id)? {
                return write.replay(transaction, account);
            }
        }

        let transaction = write.apply_to(&mut account)?;
        self.commit(&account, &transaction)?;

        Ok(Applied {
            transaction,
            account,
            replayed: false,
        })
    }

    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<CreditTransaction>> {
        self.get(cf::TRANSACTIONS, &keys::transaction_key(transaction_id))
    }

    fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>> {
        let cf_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;
        let prefix = keys::user_prefix(user_id);

        let iter = self
            .db
            .iterator_cf(&cf_by_user, IteratorMode::From(&prefix, Direction::Forward));

        // ULIDs sort by time, so the index is oldest first.
        let mut all_keys: Vec<Vec<u8>> = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            all_keys.push(key.to_vec());
        }

        let mut transactions = Vec::new();
        for key in all_keys.iter().rev().skip(offset).take(limit) {
            let tx_id = keys::extract_transaction_id_from_user_key(key)?;
            if let Some(tx) = self.get_transaction(&tx_id)? {
                transactions.push(tx);
            }
        }

        Ok(transactions)
    }

    fn find_by_reference(
        &self,
        user_id: &UserId,
        reference_id: &str,
    ) -> Result<Option<CreditTransaction>> {
        let cf_refs = self.cf(cf::REFERENCES)?;
        let Some(tx_key) = self
            .db
            .get_cf(&cf_refs, keys::reference_key(user_id, reference_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let tx_id = keys::decode_transaction_id(&tx_key)?;
        self.get_transaction(&tx_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conformance;
    use creditbook_core::TransactionType;
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    #[test]
    fn rocks_store_conformance() {
        let (store, _dir) = create_test_store();
        conformance::run_all(&store);
    }

    #[test]
    fn rocks_store_concurrent_writes() {
        let (store, _dir) = create_test_store();
        conformance::concurrent_writes_do_not_lose_updates(&store);
    }

    #[test]
    fn ledger_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let user_id = UserId::generate();

        {
            let store = RocksStore::open(dir.path()).unwrap();
            store
                .create_account(&LedgerWrite::credit(
                    user_id,
                    TransactionType::MonthlyAllocation,
                    100,
                    "Signup allocation",
                ))
                .unwrap();
            store
                .apply(
                    &LedgerWrite::credit(user_id, TransactionType::Purchase, 500, "medium")
                        .with_reference(Some("pay_1".into())),
                )
                .unwrap();
        }

        let store = RocksStore::open(dir.path()).unwrap();
        assert_eq!(store.get_account(&user_id).unwrap().unwrap().credits, 600);

        let replay = store
            .apply(
                &LedgerWrite::credit(user_id, TransactionType::Purchase, 500, "medium")
                    .with_reference(Some("pay_1".into())),
            )
            .unwrap();
        assert!(replay.replayed);
        assert_eq!(replay.account.credits, 600);
    }
}
