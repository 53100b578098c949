//! Authentication extractors.
//!
//! - `AuthUser` - end-user requests carrying `Bearer test-token:<uuid>`, only
//!   accepted when `allow_test_tokens` is set
//! - `ServiceAuth` - feature route handlers and payment webhooks via `X-API-Key`
//! - `AdminAuth` - balance overrides via `X-Admin-Key`

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use creditbook_core::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// An authenticated end user.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user ID.
    pub user_id: UserId,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if !state.config.allow_test_tokens {
            return Err(ApiError::Unauthorized);
        }

        let token = header(parts, "authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;

        // Tokens are minted upstream as "test-token:<user-uuid>".
        let user_id = token
            .strip_prefix("test-token:")
            .and_then(|id| id.parse::<UserId>().ok())
            .ok_or(ApiError::Unauthorized)?;

        Ok(Self { user_id })
    }
}

/// Service authentication via API key.
#[derive(Debug, Clone)]
pub struct ServiceAuth {
    /// The calling service, from `X-Service-Name`.
    pub service_name: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for ServiceAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        check_key(parts, "x-api-key", state.config.service_api_key.as_deref())?;

        let service_name = header(parts, "x-service-name")
            .unwrap_or("unknown")
            .to_string();

        Ok(Self { service_name })
    }
}

/// Admin authentication via the admin API key.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    /// Admin identifier from `X-Admin-Id` (for audit logging).
    pub admin_id: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        check_key(parts, "x-admin-key", state.config.admin_api_key.as_deref())?;

        let admin_id = header(parts, "x-admin-id").unwrap_or("admin").to_string();

        Ok(Self { admin_id })
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

/// An unset key rejects every request.
fn check_key(parts: &Parts, name: &str, expected: Option<&str>) -> Result<(), ApiError> {
    let provided = header(parts, name).ok_or(ApiError::Unauthorized)?;
    match expected {
        Some(expected) if provided == expected => Ok(()),
        _ => Err(ApiError::Unauthorized),
    }
}
