//! Creditbook HTTP API Service.
//!
//! Exposes the credit ledger over HTTP:
//!
//! - Accounts, balances and transaction history for end users
//! - Feature checks and charges for the feature route handlers
//! - Package purchases handed off by the payment webhook
//! - Plan changes, referral rewards and admin overrides
//!
//! # Authentication
//!
//! 1. **Bearer tokens** (`test-token:<uuid>`) - end-user requests
//! 2. **Service API key** (`X-API-Key`) - service-to-service requests
//! 3. **Admin API key** (`X-Admin-Key`) - manual corrections

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers call the synchronous ledger

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

use std::sync::Arc;

use creditbook_core::PricingCatalog;
use creditbook_store::{MemoryStore, Store};

pub use config::{ServiceConfig, StorageBackend};
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;

/// Errors raised while assembling the service at startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The pricing catalog could not be loaded or is invalid.
    #[error(transparent)]
    Pricing(#[from] creditbook_core::LedgerError),

    /// The store could not be opened.
    #[error(transparent)]
    Store(#[from] creditbook_store::StoreError),

    /// The configured backend is not compiled in.
    #[error("storage backend {0:?} requires the rocksdb-backend feature")]
    BackendUnavailable(StorageBackend),
}

/// Load the pricing catalog: the JSON file if configured, else the defaults.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the catalog is invalid.
pub fn load_catalog(config: &ServiceConfig) -> Result<PricingCatalog, StartupError> {
    let catalog = match &config.pricing_file {
        Some(path) => {
            tracing::info!(path = %path, "Loading pricing catalog");
            PricingCatalog::from_json_file(path)?
        }
        None => PricingCatalog::default(),
    };
    catalog.validate()?;
    Ok(catalog)
}

/// Open the configured storage backend.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or the backend is not
/// compiled in.
pub fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, StartupError> {
    match config.storage_backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory store - balances will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "rocksdb-backend")]
        StorageBackend::Rocksdb => {
            tracing::info!(path = %config.data_dir, "Opening RocksDB store");
            Ok(Arc::new(creditbook_store::RocksStore::open(&config.data_dir)?))
        }
        #[cfg(not(feature = "rocksdb-backend"))]
        backend @ StorageBackend::Rocksdb => Err(StartupError::BackendUnavailable(backend)),
    }
}
