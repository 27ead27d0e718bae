//! Azure OpenAI chat completion client.
//!
//! Single-shot prompt forwarding only; prompt construction lives in
//! `crate::domain::ai`.

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};

use crate::error::ApiError;

const COMPLETION_TIMEOUT_SECONDS: u64 = 60;

/// Client for Azure OpenAI chat completions.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    completions_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl OpenAiClient {
    /// Create a new Azure OpenAI client.
    pub fn new(
        endpoint: &str,
        api_key: &str,
        deployment: &str,
        api_version: &str,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(COMPLETION_TIMEOUT_SECONDS))
            .build()
            .context("Failed to create HTTP client")?;

        let completions_url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            endpoint.trim_end_matches('/'),
            deployment,
            api_version
        );

        tracing::info!(deployment = deployment, "Azure OpenAI client initialized");

        Ok(Self {
            client,
            completions_url,
            api_key: api_key.to_string(),
        })
    }

    /// Run a single chat completion and return the assistant message.
    #[instrument(skip(self, system_prompt, user_prompt))]
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String, ApiError> {
        let body = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            max_tokens,
            temperature: 0.7,
        };

        debug!("Azure OpenAI completion request");

        let response = self
            .client
            .post(&self.completions_url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Azure OpenAI request failed");
                ApiError::Internal(anyhow::anyhow!("AI service unavailable: {}", e))
            })?;

        let status = response.status();

        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(status = %status, detail = %detail, "Azure OpenAI error");
            return match status {
                StatusCode::TOO_MANY_REQUESTS => Err(ApiError::Internal(anyhow::anyhow!(
                    "AI service rate limited"
                ))),
                _ => Err(ApiError::Internal(anyhow::anyhow!(
                    "AI service error: {}",
                    status
                ))),
            };
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Azure OpenAI response");
            ApiError::Internal(anyhow::anyhow!("Invalid AI service response: {}", e))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("AI service returned no content")))
    }
}
