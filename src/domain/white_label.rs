//! White-label domain types
//!
//! Customer-configurable branding applied to generated PDF reports. The
//! service composes the report payload; rendering happens client-side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::audits::AuditResponse;
use super::projects::ProjectResponse;

/// Branding settings for a customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhiteLabelSettings {
    pub company_name: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    pub primary_color: String,
    pub secondary_color: String,
    #[serde(default)]
    pub footer_text: Option<String>,
}

impl Default for WhiteLabelSettings {
    fn default() -> Self {
        Self {
            company_name: "LilySEO".to_string(),
            logo_url: None,
            primary_color: "#4f46e5".to_string(),
            secondary_color: "#0ea5e9".to_string(),
            footer_text: None,
        }
    }
}

/// Request DTO for updating branding
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateWhiteLabelRequest {
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub primary_color: Option<String>,
    #[serde(default)]
    pub secondary_color: Option<String>,
    #[serde(default)]
    pub footer_text: Option<String>,
}

/// Response DTO for branding settings
#[derive(Debug, Clone, Serialize)]
pub struct WhiteLabelResponse {
    #[serde(flatten)]
    pub settings: WhiteLabelSettings,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A stored PDF template definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfTemplate {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub tier_required: super::subscriptions::SubscriptionTier,
    pub layout: serde_json::Value,
}

/// Composed report payload consumed by the client-side PDF renderer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPayload {
    pub audit: AuditResponse,
    pub project: ProjectResponse,
    pub branding: WhiteLabelSettings,
    pub template: Option<PdfTemplate>,
    pub generated_at: DateTime<Utc>,
}
