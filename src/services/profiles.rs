//! Profile helpers shared across routes.
//!
//! Profiles are provisioned lazily: the first authenticated request creates
//! the row on the free tier.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::subscriptions::{ProfileResponse, SubscriptionStatus, SubscriptionTier};

/// Database row for profile
#[derive(Debug, sqlx::FromRow)]
pub struct ProfileRecord {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub subscription_tier: String,
    pub subscription_status: String,
    pub current_period_end: Option<DateTime<Utc>>,
    pub pending_tier: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ProfileRecord {
    pub fn tier(&self) -> SubscriptionTier {
        SubscriptionTier::from_db(&self.subscription_tier)
    }

    pub fn status(&self) -> SubscriptionStatus {
        SubscriptionStatus::from_db(&self.subscription_status)
    }
}

impl From<ProfileRecord> for ProfileResponse {
    fn from(row: ProfileRecord) -> Self {
        let tier = row.tier();
        let status = row.status();
        Self {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            subscription_tier: tier,
            subscription_status: status,
            current_period_end: row.current_period_end,
            pending_tier: row.pending_tier.as_deref().map(SubscriptionTier::from_db),
            created_at: row.created_at,
        }
    }
}

const PROFILE_COLUMNS: &str = "id, email, full_name, subscription_tier, subscription_status, \
                               current_period_end, pending_tier, created_at";

/// Fetch the caller's profile, creating a free-tier row on first sight
pub async fn get_or_create(
    db: &PgPool,
    user_id: Uuid,
    email: Option<&str>,
) -> Result<ProfileRecord, sqlx::Error> {
    let existing = sqlx::query_as::<_, ProfileRecord>(&format!(
        "SELECT {} FROM profiles WHERE id = $1",
        PROFILE_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    if let Some(profile) = existing {
        return Ok(profile);
    }

    tracing::info!(user_id = %user_id, "Provisioning profile on first request");

    sqlx::query_as::<_, ProfileRecord>(&format!(
        r#"
        INSERT INTO profiles (id, email, subscription_tier, subscription_status, created_at, updated_at)
        VALUES ($1, $2, 'free', 'active', NOW(), NOW())
        ON CONFLICT (id) DO UPDATE SET email = COALESCE(profiles.email, EXCLUDED.email)
        RETURNING {}
        "#,
        PROFILE_COLUMNS
    ))
    .bind(user_id)
    .bind(email)
    .fetch_one(db)
    .await
}

/// Look up the caller's tier; missing profile means free
pub async fn tier(db: &PgPool, user_id: Uuid) -> Result<SubscriptionTier, sqlx::Error> {
    let raw: Option<String> =
        sqlx::query_scalar("SELECT subscription_tier FROM profiles WHERE id = $1")
            .bind(user_id)
            .fetch_optional(db)
            .await?;

    Ok(raw
        .as_deref()
        .map(SubscriptionTier::from_db)
        .unwrap_or(SubscriptionTier::Free))
}
