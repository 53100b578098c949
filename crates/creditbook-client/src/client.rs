//! Creditbook HTTP client implementation.

use reqwest::Client;
use std::time::Duration;

use creditbook_core::UserId;

use crate::error::ClientError;
use crate::types::{
    ApiErrorResponse, BalanceResponse, CheckRequest, CheckResponse, ConsumeRequest,
    ConsumeResponse, DeductRequest, LedgerWriteResponse, PurchaseRequest, ReferralRequest,
    ReferralResponse, UpgradeRequest, UpgradeResponse,
};

/// Creditbook API client.
///
/// Service methods authenticate with the service API key; [`get_balance`]
/// uses the end user's bearer token instead.
///
/// [`get_balance`]: CreditbookClient::get_balance
#[derive(Debug, Clone)]
pub struct CreditbookClient {
    client: Client,
    base_url: String,
    api_key: String,
    service_name: String,
}

impl CreditbookClient {
    /// Create a new creditbook client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the creditbook service (e.g., `"http://creditbook:8080"`)
    /// * `api_key` - Service API key for authentication
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, api_key, ClientOptions::default())
    }

    /// Create a new creditbook client with custom options.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_options(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            service_name: options.service_name,
        })
    }

    /// Check whether a user can afford `quantity` uses of `feature`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn check_credits(
        &self,
        user_id: UserId,
        feature: impl Into<String>,
        quantity: u32,
    ) -> Result<CheckResponse, ClientError> {
        let request = CheckRequest {
            user_id,
            feature: feature.into(),
            quantity,
        };
        self.post("/v1/credits/check", &request).await
    }

    /// Charge a user for `quantity` uses of `feature`.
    ///
    /// A balance that cannot cover the cost comes back as
    /// `ConsumeResponse { charged: false, .. }`, not as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn consume_credits(
        &self,
        user_id: UserId,
        feature: impl Into<String>,
        quantity: u32,
    ) -> Result<ConsumeResponse, ClientError> {
        let request = ConsumeRequest {
            user_id,
            feature: feature.into(),
            quantity,
            description: None,
        };
        self.post("/v1/credits/consume", &request).await
    }

    /// Deduct an explicit amount.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InsufficientCredits` if the balance is too low,
    /// or another error if the request fails.
    pub async fn deduct_credits(
        &self,
        request: DeductRequest,
    ) -> Result<LedgerWriteResponse, ClientError> {
        self.post("/v1/credits/deduct", &request).await
    }

    /// Credit a verified package purchase. Safe to retry with the same
    /// payment reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn record_purchase(
        &self,
        request: PurchaseRequest,
    ) -> Result<LedgerWriteResponse, ClientError> {
        self.post("/v1/credits/purchase", &request).await
    }

    /// Apply a paid plan change. The plan's allocation is added to the
    /// balance; retrying with the same `reference_id` applies it once.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn upgrade_subscription(
        &self,
        request: UpgradeRequest,
    ) -> Result<UpgradeResponse, ClientError> {
        self.post("/v1/subscription/upgrade", &request).await
    }

    /// Pay out a verified referral reward, once per `reference_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn award_referral(
        &self,
        request: ReferralRequest,
    ) -> Result<ReferralResponse, ClientError> {
        self.post("/v1/referrals", &request).await
    }

    /// Get a user's current balance (requires the user's token, not the
    /// service API key).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn get_balance(&self, user_token: &str) -> Result<BalanceResponse, ClientError> {
        let url = format!("{}/v1/credits/balance", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("authorization", format!("Bearer {user_token}"))
            .send()
            .await?;

        Self::handle_response(response).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: serde::Serialize + Sync + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("x-service-name", &self.service_name)
            .json(body)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let Ok(api_error) = response.json::<ApiErrorResponse>().await else {
            return Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            });
        };

        let error = api_error.error;
        tracing::debug!(status = %status, code = %error.code, "Creditbook request failed");

        // Map specific error codes to typed errors
        match error.code.as_str() {
            "insufficient_credits" => {
                let detail = |key: &str| {
                    error
                        .details
                        .as_ref()
                        .and_then(|d| d.get(key))
                        .and_then(serde_json::Value::as_i64)
                        .unwrap_or(0)
                };
                Err(ClientError::InsufficientCredits {
                    balance: detail("balance"),
                    required: detail("required"),
                })
            }
            "not_found" => Err(ClientError::AccountNotFound {
                message: error.message,
            }),
            "unknown_feature" => Err(ClientError::UnknownFeature {
                message: error.message,
            }),
            _ => Err(ClientError::Api {
                code: error.code,
                message: error.message,
                status: status.as_u16(),
            }),
        }
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
    /// Service name to include in requests.
    pub service_name: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            service_name: "unknown".to_string(),
        }
    }
}

impl ClientOptions {
    /// Create options with a service name.
    #[must_use]
    pub fn with_service_name(name: impl Into<String>) -> Self {
        Self {
            service_name: name.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_trims_trailing_slash() {
        let client = CreditbookClient::new("http://localhost:8080/", "test-api-key").unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn client_options() {
        let options = ClientOptions::with_service_name("caption-route");
        let client =
            CreditbookClient::with_options("http://localhost:8080", "key", options).unwrap();
        assert_eq!(client.service_name, "caption-route");
    }
}
