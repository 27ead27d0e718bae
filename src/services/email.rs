//! Transactional email via the Resend HTTP API.
//!
//! Only team invitations and subscription notices are sent from the backend;
//! auth emails stay with Supabase.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, instrument};

use crate::error::ApiError;

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Resend email client.
#[derive(Clone)]
pub struct EmailClient {
    client: Client,
    api_key: String,
    from_address: String,
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

impl EmailClient {
    pub fn new(api_key: &str, from_address: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            from_address: from_address.to_string(),
        })
    }

    /// Send a single HTML email.
    #[instrument(skip(self, html))]
    pub async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), ApiError> {
        let body = SendEmailRequest {
            from: &self.from_address,
            to: [to],
            subject,
            html,
        };

        let response = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Email send failed");
                ApiError::Internal(anyhow::anyhow!("Email service unavailable: {}", e))
            })?;

        if !response.status().is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(detail = %detail, "Email service rejected message");
            return Err(ApiError::Internal(anyhow::anyhow!("Email send rejected")));
        }

        debug!(to = to, subject = subject, "Email sent");
        Ok(())
    }

    /// Send a team invitation email with the accept link.
    pub async fn send_team_invite(
        &self,
        to: &str,
        inviter_name: &str,
        accept_url: &str,
    ) -> Result<(), ApiError> {
        let subject = format!("{} invited you to their LilySEO team", inviter_name);
        let html = format!(
            "<p>{} invited you to collaborate on their SEO projects.</p>\
             <p><a href=\"{}\">Accept the invitation</a></p>",
            inviter_name, accept_url
        );
        self.send(to, &subject, &html).await
    }
}
