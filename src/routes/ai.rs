//! AI routes
//!
//! Thin wrappers around the Azure OpenAI client. Content recommendations are
//! a paid feature; industry detection is open to every tier because it runs
//! during onboarding.

use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use crate::api::response::DataResponse;
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::ai::{
    industry_prompt, recommendation_prompt, DetectIndustryRequest, DetectIndustryResponse,
    GenerateRequest, GenerateResponse, INDUSTRY_SYSTEM_PROMPT, RECOMMENDATION_SYSTEM_PROMPT,
};
use crate::domain::subscriptions::{LimitedFeature, SubscriptionTier};
use crate::error::ApiError;
use crate::services::{limits, profiles};

const RECOMMENDATION_MAX_TOKENS: u32 = 1024;
const INDUSTRY_MAX_TOKENS: u32 = 32;

/// POST /api/ai/generate
pub async fn generate(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<GenerateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.url.trim().is_empty() || req.topic.trim().is_empty() {
        return Err(ApiError::bad_request("url and topic are required"));
    }

    let tier = profiles::tier(&state.db, auth.user_id).await?;
    if !tier.meets(SubscriptionTier::Pro) {
        return Err(ApiError::forbidden(
            "AI content recommendations require a Pro plan",
        ));
    }

    limits::check_limit(&state.db, auth.user_id, tier, LimitedFeature::AiGenerations).await?;

    let prompt = recommendation_prompt(&req);
    let content = state
        .openai
        .complete(RECOMMENDATION_SYSTEM_PROMPT, &prompt, RECOMMENDATION_MAX_TOKENS)
        .await?;

    if let Err(e) = limits::record_ai_usage(&state.db, auth.user_id, "generate").await {
        tracing::warn!(error = %e, "Failed to record AI usage");
    }

    Ok(Json(DataResponse::new(GenerateResponse { content })))
}

/// POST /api/ai/detect-industry
pub async fn detect_industry(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<DetectIndustryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.url.trim().is_empty() {
        return Err(ApiError::bad_request("url is required"));
    }

    let prompt = industry_prompt(&req);
    let industry = state
        .openai
        .complete(INDUSTRY_SYSTEM_PROMPT, &prompt, INDUSTRY_MAX_TOKENS)
        .await?;

    if let Err(e) = limits::record_ai_usage(&state.db, auth.user_id, "detect_industry").await {
        tracing::warn!(error = %e, "Failed to record AI usage");
    }

    Ok(Json(DataResponse::new(DetectIndustryResponse {
        industry: industry.trim().to_string(),
    })))
}
