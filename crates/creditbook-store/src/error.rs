//! Error types for creditbook storage.

use creditbook_core::LedgerError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// Record already exists.
    #[error("{entity} already exists: {id}")]
    AlreadyExists {
        /// Kind of record.
        entity: &'static str,
        /// Identifier that collided.
        id: String,
    },

    /// Insufficient credits for a debit.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// A reference was already used by a different write.
    #[error("reference {reference_id} already recorded transaction {transaction_id}")]
    ReferenceConflict {
        /// The reused reference.
        reference_id: String,
        /// Transaction the reference already belongs to.
        transaction_id: String,
    },

    /// The write itself is malformed.
    #[error("invalid write: {0}")]
    InvalidWrite(String),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id, .. } => Self::AccountNotFound { user_id: id },
            StoreError::AlreadyExists { id, .. } => Self::AccountExists { user_id: id },
            StoreError::InsufficientCredits { balance, required } => {
                Self::InsufficientCredits { balance, required }
            }
            StoreError::ReferenceConflict { reference_id, .. } => {
                Self::ReferenceConflict { reference_id }
            }
            StoreError::InvalidWrite(msg) => Self::InvalidAmount(msg),
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Storage(msg),
        }
    }
}
