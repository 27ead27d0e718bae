//! PayPal REST client for the subscription checkout flow.
//!
//! Covers the three calls the billing routes need: an OAuth client-credentials
//! token (cached until shortly before expiry), order creation, and order
//! capture.

use anyhow::{Context, Result};
use parking_lot::RwLock;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, instrument};

use crate::config::PayPalEnvironment;
use crate::error::ApiError;

const TOKEN_EXPIRY_MARGIN_SECONDS: u64 = 60;

/// PayPal REST API client with a cached access token.
#[derive(Clone)]
pub struct PayPalClient {
    client: Client,
    base_url: &'static str,
    client_id: String,
    client_secret: String,
    token: Arc<RwLock<Option<CachedToken>>>,
}

struct CachedToken {
    access_token: String,
    fetched_at: Instant,
    expires_in: Duration,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        let margin = Duration::from_secs(TOKEN_EXPIRY_MARGIN_SECONDS);
        self.fetched_at.elapsed() + margin < self.expires_in
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    status: String,
}

/// Result of capturing an order.
#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub order_id: String,
    pub completed: bool,
}

impl PayPalClient {
    pub fn new(
        environment: PayPalEnvironment,
        client_id: &str,
        client_secret: &str,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        tracing::info!(environment = ?environment, "PayPal client initialized");

        Ok(Self {
            client,
            base_url: environment.base_url(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token: Arc::new(RwLock::new(None)),
        })
    }

    async fn access_token(&self) -> Result<String, ApiError> {
        {
            let cached = self.token.read();
            if let Some(token) = cached.as_ref() {
                if token.is_fresh() {
                    return Ok(token.access_token.clone());
                }
            }
        }

        debug!("Fetching PayPal access token");

        let response = self
            .client
            .post(format!("{}/v1/oauth2/token", self.base_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "PayPal token request failed");
                ApiError::Internal(anyhow::anyhow!("PayPal unavailable: {}", e))
            })?;

        if !response.status().is_success() {
            error!(status = %response.status(), "PayPal token request rejected");
            return Err(ApiError::Internal(anyhow::anyhow!("PayPal auth error")));
        }

        let parsed: TokenResponse = response.json().await.map_err(|e| {
            ApiError::Internal(anyhow::anyhow!("Invalid PayPal token response: {}", e))
        })?;

        let access_token = parsed.access_token.clone();
        *self.token.write() = Some(CachedToken {
            access_token: parsed.access_token,
            fetched_at: Instant::now(),
            expires_in: Duration::from_secs(parsed.expires_in),
        });

        Ok(access_token)
    }

    /// Create a one-time order for a plan purchase; returns the PayPal order id.
    #[instrument(skip(self))]
    pub async fn create_order(
        &self,
        amount: Decimal,
        currency: &str,
        plan_id: &str,
    ) -> Result<String, ApiError> {
        let token = self.access_token().await?;

        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "custom_id": plan_id,
                "amount": {
                    "currency_code": currency,
                    "value": amount.to_string(),
                },
            }],
        });

        let response = self
            .client
            .post(format!("{}/v2/checkout/orders", self.base_url))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "PayPal order creation failed");
                ApiError::Internal(anyhow::anyhow!("PayPal unavailable: {}", e))
            })?;

        if !response.status().is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(detail = %detail, "PayPal rejected order creation");
            return Err(ApiError::Internal(anyhow::anyhow!("PayPal order error")));
        }

        let parsed: OrderResponse = response.json().await.map_err(|e| {
            ApiError::Internal(anyhow::anyhow!("Invalid PayPal order response: {}", e))
        })?;

        debug!(order_id = %parsed.id, status = %parsed.status, "PayPal order created");
        Ok(parsed.id)
    }

    /// Capture a previously approved order.
    #[instrument(skip(self))]
    pub async fn capture_order(&self, order_id: &str) -> Result<CaptureOutcome, ApiError> {
        let token = self.access_token().await?;

        let response = self
            .client
            .post(format!(
                "{}/v2/checkout/orders/{}/capture",
                self.base_url, order_id
            ))
            .bearer_auth(&token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "PayPal capture failed");
                ApiError::Internal(anyhow::anyhow!("PayPal unavailable: {}", e))
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound("Payment order not found".to_string()));
        }

        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(status = %status, detail = %detail, "PayPal rejected capture");
            return Err(ApiError::BadRequest(
                "Payment could not be captured".to_string(),
            ));
        }

        let parsed: OrderResponse = response.json().await.map_err(|e| {
            ApiError::Internal(anyhow::anyhow!("Invalid PayPal capture response: {}", e))
        })?;

        Ok(CaptureOutcome {
            order_id: parsed.id,
            completed: parsed.status == "COMPLETED",
        })
    }
}
