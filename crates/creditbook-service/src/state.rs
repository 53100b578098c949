//! Application state.

use std::sync::Arc;

use creditbook_core::PricingCatalog;
use creditbook_ledger::{CreditService, Ledger, SubscriptionService};
use creditbook_store::Store;

use crate::config::ServiceConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The credit ledger.
    pub ledger: Ledger,

    /// Feature-level credit policy.
    pub credits: CreditService,

    /// Plan changes.
    pub subscriptions: SubscriptionService,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, catalog: PricingCatalog, config: ServiceConfig) -> Self {
        let ledger = Ledger::new(store, Arc::new(catalog));

        if config.service_api_key.is_none() {
            tracing::warn!("SERVICE_API_KEY not set - service endpoints will reject all requests");
        }
        if config.allow_test_tokens {
            tracing::warn!("ALLOW_TEST_TOKENS is on - test tokens are accepted for any user ID");
        }
        if config.admin_api_key.is_none() {
            tracing::warn!("ADMIN_API_KEY not set - admin endpoints will reject all requests");
        }

        Self {
            credits: CreditService::new(ledger.clone()),
            subscriptions: SubscriptionService::new(ledger.clone()),
            ledger,
            config,
        }
    }
}
