//! Scheduled maintenance endpoints
//!
//! Driven by an external scheduler hitting these routes with the shared
//! secret. Each handler returns counters so the scheduler logs show what
//! actually happened.

use axum::{extract::State, response::IntoResponse, Json};
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::CronAuth;
use crate::domain::audits::AuditStatus;
use crate::domain::notifications::NotificationType;
use crate::domain::subscriptions::SubscriptionTier;
use crate::error::ApiError;
use crate::services::notifications;

/// Audits stuck in processing longer than this are written off as failed.
const STALE_AUDIT_HOURS: i64 = 24;

/// Processing audits last touched before this instant are stale.
fn stale_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(STALE_AUDIT_HOURS)
}

/// How many scheduled audits are kicked off against the crawler at once.
const AUDIT_QUEUE_CONCURRENCY: usize = 4;

#[derive(Debug, sqlx::FromRow)]
struct ScheduledProjectRow {
    id: Uuid,
    user_id: Uuid,
    url: String,
}

/// POST /api/cron/daily
///
/// Fails stale audits, then queues a fresh audit for every active project
/// with auto-audit enabled that has not been audited in the last day.
pub async fn daily(
    State(state): State<Arc<AppState>>,
    _auth: CronAuth,
) -> Result<impl IntoResponse, ApiError> {
    let stale = sqlx::query(
        "UPDATE audits SET status = 'failed', \
         error_message = 'Audit timed out', updated_at = NOW() \
         WHERE status = 'processing' AND updated_at < $1",
    )
    .bind(stale_cutoff(Utc::now()))
    .execute(&state.db)
    .await?
    .rows_affected();

    if stale > 0 {
        tracing::warn!(count = stale, "Marked stale audits as failed");
    }

    let projects = sqlx::query_as::<_, ScheduledProjectRow>(
        r#"
        SELECT p.id, p.user_id, p.url FROM projects p
        WHERE p.auto_audit = TRUE AND p.status = 'active'
        AND NOT EXISTS (
            SELECT 1 FROM audits a
            WHERE a.project_id = p.id
            AND a.created_at > NOW() - INTERVAL '1 day'
        )
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    let scheduled = projects.len();
    let queued = stream::iter(projects)
        .map(|project| {
            let state = Arc::clone(&state);
            async move { queue_scheduled_audit(&state, project).await }
        })
        .buffer_unordered(AUDIT_QUEUE_CONCURRENCY)
        .filter(|ok| futures::future::ready(*ok))
        .count()
        .await;

    tracing::info!(stale, scheduled, queued, "Daily cron finished");

    Ok(Json(serde_json::json!({
        "success": true,
        "stale_audits_failed": stale,
        "projects_scheduled": scheduled,
        "audits_queued": queued,
    })))
}

/// Insert an audit row and hand it to the crawler. Returns whether the
/// kick-off succeeded; a failure is recorded on the row itself.
async fn queue_scheduled_audit(state: &AppState, project: ScheduledProjectRow) -> bool {
    let audit_id = Uuid::new_v4();

    let inserted = sqlx::query(
        "INSERT INTO audits (id, user_id, project_id, url, status, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, 'pending', NOW(), NOW())",
    )
    .bind(audit_id)
    .bind(project.user_id)
    .bind(project.id)
    .bind(&project.url)
    .execute(&state.db)
    .await;

    if let Err(e) = inserted {
        tracing::error!(error = %e, project_id = %project.id, "Failed to insert scheduled audit");
        return false;
    }

    match state
        .crawler
        .start_audit(audit_id, project.id, &project.url, None)
        .await
    {
        Ok(_) => {
            let updated = sqlx::query(
                "UPDATE audits SET status = 'processing', updated_at = NOW() WHERE id = $1",
            )
            .bind(audit_id)
            .execute(&state.db)
            .await;
            if let Err(e) = updated {
                tracing::error!(error = %e, audit_id = %audit_id, "Failed to mark scheduled audit processing");
            }
            true
        }
        Err(e) => {
            tracing::error!(error = %e, audit_id = %audit_id, "Scheduled audit kick-off failed");
            let _ = sqlx::query(
                "UPDATE audits SET status = $2, error_message = 'Crawler unavailable', \
                 updated_at = NOW() WHERE id = $1",
            )
            .bind(audit_id)
            .bind(AuditStatus::Failed.as_str())
            .execute(&state.db)
            .await;
            false
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ExpiredProfileRow {
    id: Uuid,
    subscription_tier: String,
    pending_tier: Option<String>,
}

/// POST /api/cron/check-subscriptions
///
/// Applies scheduled downgrades and expires paid profiles whose period has
/// lapsed without renewal.
pub async fn check_subscriptions(
    State(state): State<Arc<AppState>>,
    _auth: CronAuth,
) -> Result<impl IntoResponse, ApiError> {
    let expired = sqlx::query_as::<_, ExpiredProfileRow>(
        r#"
        SELECT id, subscription_tier, pending_tier
        FROM profiles
        WHERE subscription_tier != 'free'
        AND current_period_end IS NOT NULL
        AND current_period_end < NOW()
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    let mut downgraded = 0u64;
    for profile in expired {
        let new_tier = profile
            .pending_tier
            .as_deref()
            .map(SubscriptionTier::from_db)
            .unwrap_or(SubscriptionTier::Free);

        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET subscription_tier = $2, subscription_status = 'active',
                pending_tier = NULL, current_period_end = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(profile.id)
        .bind(new_tier.as_str())
        .execute(&state.db)
        .await;

        if let Err(e) = result {
            tracing::error!(error = %e, user_id = %profile.id, "Failed to downgrade expired profile");
            continue;
        }
        downgraded += 1;

        let was_scheduled = profile.pending_tier.is_some();
        let (notification_type, title, message) = if was_scheduled {
            (
                NotificationType::SubscriptionChanged,
                "Plan change applied",
                format!("Your plan is now {}.", new_tier.as_str()),
            )
        } else {
            (
                NotificationType::SubscriptionExpired,
                "Subscription expired",
                format!(
                    "Your {} plan expired and was switched to free.",
                    profile.subscription_tier
                ),
            )
        };

        if let Err(e) = notifications::create_notification(
            &state.db,
            profile.id,
            notification_type,
            title,
            Some(&message),
            None,
        )
        .await
        {
            tracing::warn!(error = %e, "Failed to create subscription cron notification");
        }
    }

    tracing::info!(downgraded, "Subscription cron finished");

    Ok(Json(serde_json::json!({
        "success": true,
        "profiles_downgraded": downgraded,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn stale_cutoff_is_twenty_four_hours_back() {
        let now = Utc.with_ymd_and_hms(2026, 8, 28, 12, 0, 0).unwrap();
        let cutoff = stale_cutoff(now);
        assert_eq!(now - cutoff, Duration::hours(24));

        let touched_recently = now - Duration::hours(23);
        let abandoned = now - Duration::hours(25);
        assert!(touched_recently > cutoff);
        assert!(abandoned < cutoff);
    }
}
