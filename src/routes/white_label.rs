//! White-label branding routes
//!
//! Branding is applied when report payloads are composed; these routes only
//! manage the stored settings and expose the template catalog.

use axum::{extract::State, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::DataResponse;
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::subscriptions::SubscriptionTier;
use crate::domain::white_label::{
    PdfTemplate, UpdateWhiteLabelRequest, WhiteLabelResponse, WhiteLabelSettings,
};
use crate::error::ApiError;
use crate::services::profiles;

#[derive(Debug, sqlx::FromRow)]
struct WhiteLabelRow {
    company_name: String,
    logo_url: Option<String>,
    primary_color: String,
    secondary_color: String,
    footer_text: Option<String>,
    updated_at: DateTime<Utc>,
}

impl From<WhiteLabelRow> for WhiteLabelResponse {
    fn from(row: WhiteLabelRow) -> Self {
        Self {
            settings: WhiteLabelSettings {
                company_name: row.company_name,
                logo_url: row.logo_url,
                primary_color: row.primary_color,
                secondary_color: row.secondary_color,
                footer_text: row.footer_text,
            },
            updated_at: Some(row.updated_at),
        }
    }
}

const WHITE_LABEL_COLUMNS: &str =
    "company_name, logo_url, primary_color, secondary_color, footer_text, updated_at";

/// GET /api/white-label
///
/// Defaults are returned when nothing is stored yet, so the frontend always
/// has a complete settings object to edit.
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let row = sqlx::query_as::<_, WhiteLabelRow>(&format!(
        "SELECT {} FROM white_label_settings WHERE user_id = $1",
        WHITE_LABEL_COLUMNS
    ))
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await?;

    let response = match row {
        Some(row) => WhiteLabelResponse::from(row),
        None => WhiteLabelResponse {
            settings: WhiteLabelSettings::default(),
            updated_at: None,
        },
    };

    Ok(Json(DataResponse::new(response)))
}

/// PUT /api/white-label
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<UpdateWhiteLabelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tier = profiles::tier(&state.db, auth.user_id).await?;
    if !tier.meets(SubscriptionTier::Pro) {
        return Err(ApiError::forbidden(
            "White-label branding requires a Pro plan",
        ));
    }

    for color in [req.primary_color.as_deref(), req.secondary_color.as_deref()]
        .into_iter()
        .flatten()
    {
        if !is_hex_color(color) {
            return Err(ApiError::bad_request("Colors must be hex values like #4f46e5"));
        }
    }

    let defaults = WhiteLabelSettings::default();
    let row = sqlx::query_as::<_, WhiteLabelRow>(&format!(
        r#"
        INSERT INTO white_label_settings
            (user_id, company_name, logo_url, primary_color, secondary_color, footer_text, updated_at)
        VALUES ($1, COALESCE($2, $7), $3, COALESCE($4, $8), COALESCE($5, $9), $6, NOW())
        ON CONFLICT (user_id) DO UPDATE SET
            company_name = COALESCE($2, white_label_settings.company_name),
            logo_url = COALESCE($3, white_label_settings.logo_url),
            primary_color = COALESCE($4, white_label_settings.primary_color),
            secondary_color = COALESCE($5, white_label_settings.secondary_color),
            footer_text = COALESCE($6, white_label_settings.footer_text),
            updated_at = NOW()
        RETURNING {}
        "#,
        WHITE_LABEL_COLUMNS
    ))
    .bind(auth.user_id)
    .bind(&req.company_name)
    .bind(&req.logo_url)
    .bind(&req.primary_color)
    .bind(&req.secondary_color)
    .bind(&req.footer_text)
    .bind(&defaults.company_name)
    .bind(&defaults.primary_color)
    .bind(&defaults.secondary_color)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(DataResponse::new(WhiteLabelResponse::from(row))))
}

fn is_hex_color(s: &str) -> bool {
    let Some(hex) = s.strip_prefix('#') else {
        return false;
    };
    matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

#[derive(Debug, sqlx::FromRow)]
struct TemplateRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    tier_required: String,
    layout: serde_json::Value,
}

/// GET /api/pdf-templates
///
/// Lists the templates the caller's tier can use.
pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let tier = profiles::tier(&state.db, auth.user_id).await?;
    let allowed: Vec<&str> = [
        SubscriptionTier::Free,
        SubscriptionTier::Pro,
        SubscriptionTier::Enterprise,
    ]
    .into_iter()
    .filter(|t| tier.meets(*t))
    .map(|t| t.as_str())
    .collect();

    let rows = sqlx::query_as::<_, TemplateRow>(
        "SELECT id, name, description, tier_required, layout FROM pdf_templates \
         WHERE tier_required = ANY($1) ORDER BY name ASC",
    )
    .bind(&allowed)
    .fetch_all(&state.db)
    .await?;

    let data: Vec<PdfTemplate> = rows
        .into_iter()
        .map(|row| PdfTemplate {
            id: row.id,
            name: row.name,
            description: row.description,
            tier_required: SubscriptionTier::from_db(&row.tier_required),
            layout: row.layout,
        })
        .collect();

    Ok(Json(DataResponse::new(data)))
}

#[cfg(test)]
mod tests {
    use super::is_hex_color;

    #[test]
    fn hex_color_validation() {
        assert!(is_hex_color("#4f46e5"));
        assert!(is_hex_color("#fff"));
        assert!(!is_hex_color("4f46e5"));
        assert!(!is_hex_color("#12345"));
        assert!(!is_hex_color("#gggggg"));
    }
}
