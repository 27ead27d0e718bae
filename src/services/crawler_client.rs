//! Crawler service client.
//!
//! The crawler is a separate microservice that performs the actual site
//! crawling and analysis. Audits are kicked off here and completed via the
//! webhook; competitor analysis is a synchronous call awaited from a
//! background task.

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};
use uuid::Uuid;

use crate::error::ApiError;

/// Client for the crawler service.
#[derive(Clone)]
pub struct CrawlerClient {
    client: Client,
    base_url: String,
    api_key: String,
}

/// Error response from the crawler service.
#[derive(Debug, Deserialize)]
struct CrawlerErrorResponse {
    message: String,
}

/// Acknowledgement returned when a crawl is accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlAccepted {
    pub job_id: String,
    pub status: String,
}

impl CrawlerClient {
    /// Create a new crawler service client.
    pub fn new(base_url: &str, api_key: &str, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        tracing::info!(base_url = base_url, "Crawler client initialized");

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Make a POST request to the crawler service.
    async fn post<T: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<R, ApiError> {
        let url = format!("{}{}", self.base_url, path);

        debug!(url = %url, "Crawler service request");

        let response = self
            .client
            .post(&url)
            .header("X-Api-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Crawler service request failed");
                ApiError::Internal(anyhow::anyhow!("Crawler service unavailable: {}", e))
            })?;

        let status = response.status();

        if status.is_success() {
            response.json::<R>().await.map_err(|e| {
                error!(error = %e, "Failed to parse crawler service response");
                ApiError::Internal(anyhow::anyhow!("Invalid crawler service response: {}", e))
            })
        } else {
            let message = response
                .json::<CrawlerErrorResponse>()
                .await
                .map(|e| e.message)
                .unwrap_or_else(|_| format!("Crawler service error: {}", status));

            match status {
                StatusCode::BAD_REQUEST => Err(ApiError::BadRequest(message)),
                StatusCode::UNAUTHORIZED => {
                    error!("Crawler service authentication failed");
                    Err(ApiError::Internal(anyhow::anyhow!(
                        "Crawler service auth error"
                    )))
                }
                _ => {
                    error!(status = %status, message = %message, "Crawler service error");
                    Err(ApiError::Internal(anyhow::anyhow!(message)))
                }
            }
        }
    }

    /// Kick off a site audit. The crawler reports completion via webhook.
    #[instrument(skip(self, options))]
    pub async fn start_audit(
        &self,
        audit_id: Uuid,
        project_id: Uuid,
        url: &str,
        options: Option<&serde_json::Value>,
    ) -> Result<CrawlAccepted, ApiError> {
        #[derive(Serialize)]
        struct Request<'a> {
            audit_id: String,
            project_id: String,
            url: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            options: Option<&'a serde_json::Value>,
        }

        self.post(
            "/api/audits",
            &Request {
                audit_id: audit_id.to_string(),
                project_id: project_id.to_string(),
                url,
                options,
            },
        )
        .await
    }

    /// Run a competitor analysis and return the snapshot.
    ///
    /// Unlike audits this call is synchronous; callers are expected to await
    /// it from a spawned task, not from the request path.
    #[instrument(skip(self))]
    pub async fn analyze_competitor(
        &self,
        competitor_id: Uuid,
        url: &str,
    ) -> Result<serde_json::Value, ApiError> {
        #[derive(Serialize)]
        struct Request<'a> {
            competitor_id: String,
            url: &'a str,
        }

        #[derive(Deserialize)]
        struct Response {
            snapshot: serde_json::Value,
        }

        let response: Response = self
            .post(
                "/api/competitors/analyze",
                &Request {
                    competitor_id: competitor_id.to_string(),
                    url,
                },
            )
            .await?;

        Ok(response.snapshot)
    }

    /// Check crawler service health.
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);

        self.client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .context("Crawler service health check failed")?
            .error_for_status()
            .context("Crawler service unhealthy")?;

        Ok(())
    }
}
