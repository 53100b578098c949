//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{accounts, admin, credits, health, pricing, subscription};
use crate::state::AppState;

/// Maximum concurrent requests for feature usage endpoints.
/// These sit on the hot path of every generation request.
const USAGE_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /v1/pricing` - Plans, packages, feature costs, referral rewards
///
/// ## User (Bearer test-token, only with `ALLOW_TEST_TOKENS`)
/// - `POST /v1/accounts` - Open an account
/// - `GET /v1/accounts/me` - Get current user's account
/// - `GET /v1/credits/balance` - Get current balance
/// - `GET /v1/credits/transactions` - List transaction history
/// - `GET /v1/credits/rollover` - Unused credits from the previous allocation
///
/// ## Service (X-API-Key)
/// - `POST /v1/credits/check` - Can the user afford a feature
/// - `POST /v1/credits/consume` - Charge for feature usage
/// - `POST /v1/credits/deduct` - Deduct an explicit amount
/// - `POST /v1/credits/purchase` - Credit a verified package purchase
/// - `POST /v1/credits/refund` - Return credits
/// - `POST /v1/credits/allocate` - Grant the monthly allocation
/// - `POST /v1/subscription/upgrade` - Apply a paid plan change
/// - `POST /v1/referrals` - Pay out a verified referral reward
///
/// ## Admin (X-Admin-Key)
/// - `POST /v1/admin/credits/adjust` - Signed manual correction
/// - `POST /v1/admin/credits/bonus` - Promotional grant
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let state = Arc::new(state);

    let usage_routes = Router::new()
        .route("/check", post(credits::check_credits))
        .route("/consume", post(credits::consume_credits))
        .route("/deduct", post(credits::deduct_credits))
        .layer(ConcurrencyLimitLayer::new(USAGE_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        // Accounts
        .route("/accounts", post(accounts::create_account))
        .route("/accounts/me", get(accounts::get_account))
        // Credits
        .route("/credits/balance", get(credits::get_balance))
        .route("/credits/transactions", get(credits::list_transactions))
        .route("/credits/rollover", get(credits::get_rollover))
        .route("/credits/purchase", post(credits::record_purchase))
        .route("/credits/refund", post(credits::refund_credits))
        .route("/credits/allocate", post(credits::allocate_credits))
        .route("/referrals", post(credits::award_referral))
        // Subscription
        .route("/subscription/upgrade", post(subscription::upgrade_subscription))
        // Admin
        .route("/admin/credits/adjust", post(admin::adjust_credits))
        .route("/admin/credits/bonus", post(admin::grant_bonus))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS))
        // Feature usage (with its own concurrency limit)
        .nest("/credits", usage_routes)
        .route("/pricing", get(pricing::get_pricing));

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
