//! Common test utilities for creditbook integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use serde_json::json;

use creditbook_core::{PricingCatalog, UserId};
use creditbook_service::{create_router, AppState, ServiceConfig};
use creditbook_store::MemoryStore;

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// A test user ID for authenticated requests.
    pub test_user_id: UserId,
    /// The service API key for service-to-service requests.
    pub service_api_key: String,
    /// The admin API key for overrides.
    pub admin_api_key: String,
    /// Counter for unique subscription event references.
    events: AtomicUsize,
}

impl TestHarness {
    /// Create a new test harness with a fresh in-memory ledger.
    pub fn new() -> Self {
        Self::with_test_tokens(true)
    }

    /// Create a harness, choosing whether end-user test tokens are accepted.
    pub fn with_test_tokens(allow_test_tokens: bool) -> Self {
        let service_api_key = "test-service-key".to_string();
        let admin_api_key = "test-admin-key".to_string();

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            service_api_key: Some(service_api_key.clone()),
            admin_api_key: Some(admin_api_key.clone()),
            allow_test_tokens,
            ..ServiceConfig::default()
        };

        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            PricingCatalog::default(),
            config,
        );
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            test_user_id: UserId::generate(),
            service_api_key,
            admin_api_key,
            events: AtomicUsize::new(0),
        }
    }

    /// Get the authorization header for user authentication.
    pub fn user_auth_header(&self) -> String {
        format!("Bearer test-token:{}", self.test_user_id)
    }

    /// Open the test user's account (100 credits on the free plan).
    pub async fn open_account(&self) {
        self.server
            .post("/v1/accounts")
            .add_header("authorization", self.user_auth_header())
            .json(&json!({}))
            .await
            .assert_status_ok();
    }

    /// Record a paid plan change for the test user, as the payment webhook would.
    pub async fn upgrade(&self, plan: &str) -> serde_json::Value {
        let event = self.events.fetch_add(1, Ordering::Relaxed);
        let response = self
            .server
            .post("/v1/subscription/upgrade")
            .add_header("x-api-key", &self.service_api_key)
            .json(&json!({
                "user_id": self.test_user_id.to_string(),
                "plan": plan,
                "reference_id": format!("sub_evt_{event}"),
            }))
            .await;
        response.assert_status_ok();
        response.json()
    }

    /// The test user's current balance.
    pub async fn balance(&self) -> i64 {
        let response = self
            .server
            .get("/v1/credits/balance")
            .add_header("authorization", self.user_auth_header())
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        body["credits"].as_i64().expect("credits should be a number")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
