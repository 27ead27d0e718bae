//! Subscription and billing routes
//!
//! Checkout is a two-step PayPal order flow: the frontend creates an order,
//! the buyer approves it in the PayPal popup, then the frontend asks us to
//! capture. The profile tier only changes on a completed capture.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::api::response::DataResponse;
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::subscriptions::{
    CaptureOrderRequest, CreateOrderRequest, CreateOrderResponse, FeatureUsage, LimitedFeature,
    PlanInfo, PlanLimit, ProfileResponse, SubscriptionTier,
};
use crate::error::ApiError;
use crate::services::cache::keys;
use crate::services::{limits, notifications, profiles};

const USAGE_CACHE_TTL: Duration = Duration::from_secs(60);

/// GET /api/subscriptions/plans
///
/// Public plan catalog derived from `usage_limits`. Cached; the catalog only
/// changes on a seed migration.
pub async fn list_plans(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let cache_key = keys::plan_catalog();
    if let Some(cached) = state.cache.get::<serde_json::Value>(&cache_key).await {
        return Ok(Json(cached));
    }

    let tiers = [
        SubscriptionTier::Free,
        SubscriptionTier::Pro,
        SubscriptionTier::Enterprise,
    ];

    let mut plans = Vec::with_capacity(tiers.len());
    for tier in tiers {
        let mut plan_limits = Vec::with_capacity(LimitedFeature::ALL.len());
        for feature in LimitedFeature::ALL {
            let limit = limits::fetch_limit(&state.db, tier, feature).await?;
            plan_limits.push(PlanLimit {
                feature: feature.as_str(),
                monthly_limit: limit,
            });
        }
        plans.push(PlanInfo {
            id: tier,
            name: match tier {
                SubscriptionTier::Free => "Free",
                SubscriptionTier::Pro => "Pro",
                SubscriptionTier::Enterprise => "Enterprise",
            },
            monthly_price: tier.monthly_price(),
            currency: "USD",
            limits: plan_limits,
        });
    }

    let body = serde_json::json!({ "data": plans });
    if let Err(e) = state.cache.set(&cache_key, &body).await {
        tracing::warn!(error = %e, "Failed to cache plan catalog");
    }

    Ok(Json(body))
}

/// POST /api/subscriptions/create-paypal-order
pub async fn create_paypal_order(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let price = req
        .plan
        .monthly_price()
        .ok_or_else(|| ApiError::bad_request("The free plan cannot be purchased"))?;

    let order_id = state
        .paypal
        .create_order(price, "USD", req.plan.as_str())
        .await?;

    sqlx::query(
        r#"
        INSERT INTO payment_orders (id, user_id, order_id, plan_id, amount, status, created_at)
        VALUES ($1, $2, $3, $4, $5, 'created', NOW())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.user_id)
    .bind(&order_id)
    .bind(req.plan.as_str())
    .bind(price)
    .execute(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(CreateOrderResponse { order_id })),
    ))
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentOrderRow {
    plan_id: String,
    status: String,
}

/// POST /api/subscriptions/capture-paypal-order
pub async fn capture_paypal_order(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<CaptureOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order = sqlx::query_as::<_, PaymentOrderRow>(
        "SELECT plan_id, status FROM payment_orders WHERE order_id = $1 AND user_id = $2",
    )
    .bind(&req.order_id)
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Payment order not found"))?;

    let plan = SubscriptionTier::from_db(&order.plan_id);

    // Capturing twice must not double-apply; PayPal would reject the second
    // capture anyway, so short-circuit on our own record.
    if order.status == "completed" {
        let profile =
            profiles::get_or_create(&state.db, auth.user_id, auth.email.as_deref()).await?;
        return Ok(Json(DataResponse::new(ProfileResponse::from(profile))));
    }

    let outcome = state.paypal.capture_order(&req.order_id).await?;
    if !outcome.completed {
        return Err(ApiError::bad_request("Payment could not be captured"));
    }

    sqlx::query(
        "UPDATE payment_orders SET status = 'completed', captured_at = NOW() WHERE order_id = $1",
    )
    .bind(&req.order_id)
    .execute(&state.db)
    .await?;

    let period_end = Utc::now() + ChronoDuration::days(30);
    sqlx::query(
        r#"
        UPDATE profiles
        SET subscription_tier = $2, subscription_status = 'active',
            current_period_end = $3, pending_tier = NULL, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(auth.user_id)
    .bind(plan.as_str())
    .bind(period_end)
    .execute(&state.db)
    .await?;

    if let Err(e) = state
        .cache
        .delete_pattern(&keys::user_pattern(auth.user_id))
        .await
    {
        tracing::warn!(error = %e, "Failed to invalidate usage cache after upgrade");
    }

    if let Err(e) = notifications::notify_subscription_changed(
        &state.db,
        auth.user_id,
        "Subscription upgraded",
        &format!("Your plan is now {}.", plan.as_str()),
    )
    .await
    {
        tracing::warn!(error = %e, "Failed to create subscription notification");
    }

    let profile = profiles::get_or_create(&state.db, auth.user_id, auth.email.as_deref()).await?;
    Ok(Json(DataResponse::new(ProfileResponse::from(profile))))
}

/// POST /api/subscriptions/downgrade
///
/// Downgrades are not immediate; the paid period runs out first. The cron
/// applies `pending_tier` once `current_period_end` passes.
pub async fn downgrade(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let profile = profiles::get_or_create(&state.db, auth.user_id, auth.email.as_deref()).await?;

    if profile.tier() == SubscriptionTier::Free {
        return Err(ApiError::bad_request("Already on the free plan"));
    }

    sqlx::query("UPDATE profiles SET pending_tier = 'free', updated_at = NOW() WHERE id = $1")
        .bind(auth.user_id)
        .execute(&state.db)
        .await?;

    if let Err(e) = notifications::notify_subscription_changed(
        &state.db,
        auth.user_id,
        "Downgrade scheduled",
        "Your plan will switch to free at the end of the current billing period.",
    )
    .await
    {
        tracing::warn!(error = %e, "Failed to create downgrade notification");
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "pending_tier": "free",
        "effective_at": profile.current_period_end,
    })))
}

/// GET /api/usage
pub async fn get_usage(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let cache_key = keys::usage(auth.user_id);
    if let Some(cached) = state.cache.get::<serde_json::Value>(&cache_key).await {
        return Ok(Json(cached));
    }

    let tier = profiles::tier(&state.db, auth.user_id).await?;

    let mut usage = Vec::with_capacity(LimitedFeature::ALL.len());
    for feature in LimitedFeature::ALL {
        let limit = limits::fetch_limit(&state.db, tier, feature).await?;
        let used = limits::count_used(&state.db, auth.user_id, feature).await?;
        usage.push(FeatureUsage::new(feature, used, limit));
    }

    let body = serde_json::json!({
        "data": usage,
        "plan": tier,
    });

    if let Err(e) = state
        .cache
        .set_with_ttl(&cache_key, &body, USAGE_CACHE_TTL)
        .await
    {
        tracing::warn!(error = %e, "Failed to cache usage summary");
    }

    Ok(Json(body))
}
