//! Tier-based feature limit lookups.
//!
//! Limits live in the `usage_limits` table keyed by (plan, feature). The
//! comparison against current usage is the whole "policy engine".

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::subscriptions::{EffectiveLimit, LimitedFeature, SubscriptionTier};
use crate::error::{ApiError, ApiResult};

/// Fetch the effective limit for (tier, feature).
///
/// A missing row is treated as unlimited and logged; seed data is expected to
/// cover every pair.
pub async fn fetch_limit(
    db: &PgPool,
    tier: SubscriptionTier,
    feature: LimitedFeature,
) -> Result<EffectiveLimit, sqlx::Error> {
    let raw: Option<i64> = sqlx::query_scalar(
        "SELECT monthly_limit FROM usage_limits WHERE plan_id = $1 AND feature = $2",
    )
    .bind(tier.as_str())
    .bind(feature.as_str())
    .fetch_optional(db)
    .await?;

    match raw {
        Some(value) => Ok(EffectiveLimit::from_monthly(value)),
        None => {
            tracing::warn!(
                plan = tier.as_str(),
                feature = feature.as_str(),
                "No usage_limits row; treating as unlimited"
            );
            Ok(EffectiveLimit::Unlimited)
        }
    }
}

/// Usage query per feature. Monthly features count rows created since the
/// start of the current month; capacity features count live rows. AI usage
/// only meters `generate` calls, so industry detection stays free.
fn usage_count_query(feature: LimitedFeature) -> &'static str {
    match feature {
        LimitedFeature::Projects => "SELECT COUNT(*) FROM projects WHERE user_id = $1",
        LimitedFeature::Audits => {
            "SELECT COUNT(*) FROM audits WHERE user_id = $1 \
             AND created_at >= date_trunc('month', NOW())"
        }
        LimitedFeature::Competitors => "SELECT COUNT(*) FROM competitors WHERE user_id = $1",
        LimitedFeature::TeamMembers => "SELECT COUNT(*) FROM team_members WHERE owner_id = $1",
        LimitedFeature::AiGenerations => {
            "SELECT COUNT(*) FROM ai_usage_logs WHERE user_id = $1 \
             AND kind = 'generate' \
             AND created_at >= date_trunc('month', NOW())"
        }
    }
}

/// Count the caller's current usage of a feature.
pub async fn count_used(
    db: &PgPool,
    user_id: Uuid,
    feature: LimitedFeature,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(usage_count_query(feature))
        .bind(user_id)
        .fetch_one(db)
        .await
}

/// Enforce a feature limit before a create operation; 403 when exhausted.
pub async fn check_limit(
    db: &PgPool,
    user_id: Uuid,
    tier: SubscriptionTier,
    feature: LimitedFeature,
) -> ApiResult<()> {
    let limit = fetch_limit(db, tier, feature).await?;
    let used = count_used(db, user_id, feature).await?;

    if limit.allows(used) {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "Your {} plan has reached its {} limit",
            tier.as_str(),
            feature.as_str().replace('_', " ")
        )))
    }
}

/// Record one AI generation against the caller's monthly allowance.
pub async fn record_ai_usage(
    db: &PgPool,
    user_id: Uuid,
    kind: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO ai_usage_logs (id, user_id, kind, created_at) VALUES ($1, $2, $3, NOW())")
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(kind)
        .execute(db)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ai_allowance_only_counts_generate_calls() {
        let query = usage_count_query(LimitedFeature::AiGenerations);
        assert!(query.contains("kind = 'generate'"));
        assert!(query.contains("date_trunc('month'"));
    }

    #[test]
    fn capacity_features_count_live_rows() {
        for feature in [
            LimitedFeature::Projects,
            LimitedFeature::Competitors,
            LimitedFeature::TeamMembers,
        ] {
            assert!(!usage_count_query(feature).contains("date_trunc"));
        }
    }
}
