//! Error types for creditbook.

use crate::ids::IdError;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur in ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Account not found.
    #[error("account not found: {user_id}")]
    AccountNotFound {
        /// The user ID that was not found.
        user_id: String,
    },

    /// Account already exists.
    #[error("account already exists: {user_id}")]
    AccountExists {
        /// The user ID that already exists.
        user_id: String,
    },

    /// Feature is not in the pricing catalog.
    #[error("unknown feature: {feature}")]
    UnknownFeature {
        /// The feature identifier.
        feature: String,
    },

    /// Plan is not in the pricing catalog.
    #[error("unknown plan: {plan}")]
    UnknownPlan {
        /// The plan identifier.
        plan: String,
    },

    /// Credit package is not in the pricing catalog.
    #[error("unknown credit package: {package}")]
    UnknownPackage {
        /// The package identifier.
        package: String,
    },

    /// Insufficient credits for a deduction.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// Reference already used by a different balance change.
    #[error("reference {reference_id} was already used for a different change")]
    ReferenceConflict {
        /// The reused reference.
        reference_id: String,
    },

    /// Invalid amount or quantity.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}
