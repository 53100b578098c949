//! Key encoding for the `RocksDB` column families.

use creditbook_core::{TransactionId, UserId};

use crate::error::{Result, StoreError};

/// Create an account key from a user ID.
#[must_use]
pub fn account_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create a transaction key from a transaction ID.
#[must_use]
pub fn transaction_key(transaction_id: &TransactionId) -> Vec<u8> {
    transaction_id.to_bytes().to_vec()
}

/// Create a user-transaction index key.
///
/// Format: `user_id (16 bytes) || transaction_id (16 bytes)`
///
/// Since ULIDs are time-ordered, a user's transactions sort by time.
#[must_use]
pub fn user_transaction_key(user_id: &UserId, transaction_id: &TransactionId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&transaction_id.to_bytes());
    key
}

/// Create a prefix for iterating all transactions for a user.
#[must_use]
pub fn user_prefix(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Extract the transaction ID from a user-transaction index key.
///
/// # Errors
///
/// Returns `StoreError::Database` if the key is not 32 bytes long.
pub fn extract_transaction_id_from_user_key(key: &[u8]) -> Result<TransactionId> {
    decode_transaction_id(key.get(16..).unwrap_or_default())
}

/// Decode a 16-byte transaction ID.
///
/// # Errors
///
/// Returns `StoreError::Database` if the slice is not 16 bytes long.
pub fn decode_transaction_id(bytes: &[u8]) -> Result<TransactionId> {
    let bytes: [u8; 16] = bytes
        .try_into()
        .map_err(|_| StoreError::Database(format!("malformed transaction key: {bytes:?}")))?;
    Ok(TransactionId::from_bytes(bytes))
}

/// Create an idempotency key.
///
/// Format: `user_id (16 bytes) || reference_id (utf-8)`
#[must_use]
pub fn reference_key(user_id: &UserId, reference_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(16 + reference_id.len());
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(reference_id.as_bytes());
    key
}
