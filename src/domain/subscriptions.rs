//! Subscription tiers, feature limits and billing DTOs
//!
//! Limits come from the `usage_limits` table keyed by (plan, feature). A raw
//! `monthly_limit` of -1 means unlimited and must never surface as a literal
//! -1 in API responses.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// Subscription tier (plan) for a profile
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    Free,
    Pro,
    Enterprise,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
        }
    }

    /// Parse a tier stored as text; unknown values are treated as free
    pub fn from_db(s: &str) -> Self {
        match s {
            "pro" => Self::Pro,
            "enterprise" => Self::Enterprise,
            _ => Self::Free,
        }
    }

    /// True when this tier is at least `required` (tier gating)
    pub fn meets(&self, required: SubscriptionTier) -> bool {
        *self >= required
    }

    /// Monthly price; free has none
    pub fn monthly_price(&self) -> Option<Decimal> {
        match self {
            Self::Free => None,
            Self::Pro => Some(Decimal::new(2999, 2)),        // 29.99
            Self::Enterprise => Some(Decimal::new(9999, 2)), // 99.99
        }
    }
}

/// Subscription lifecycle state for a profile
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "past_due" => Self::PastDue,
            _ => Self::Canceled,
        }
    }
}

/// Features gated by per-plan limits in `usage_limits`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitedFeature {
    Projects,
    Audits,
    Competitors,
    TeamMembers,
    AiGenerations,
}

impl LimitedFeature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::Audits => "audits",
            Self::Competitors => "competitors",
            Self::TeamMembers => "team_members",
            Self::AiGenerations => "ai_generations",
        }
    }

    pub const ALL: [LimitedFeature; 5] = [
        Self::Projects,
        Self::Audits,
        Self::Competitors,
        Self::TeamMembers,
        Self::AiGenerations,
    ];
}

/// Effective limit computed from a raw `monthly_limit` value.
///
/// Serializes as the number itself, or the string `"unlimited"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveLimit {
    Unlimited,
    Limited(i64),
}

impl EffectiveLimit {
    /// A negative `monthly_limit` row means the feature is unlimited
    pub fn from_monthly(raw: i64) -> Self {
        if raw < 0 {
            Self::Unlimited
        } else {
            Self::Limited(raw)
        }
    }

    /// Whether `used` items leave room for one more
    pub fn allows(&self, used: i64) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Limited(max) => used < *max,
        }
    }
}

impl Serialize for EffectiveLimit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unlimited => serializer.serialize_str("unlimited"),
            Self::Limited(n) => serializer.serialize_i64(*n),
        }
    }
}

/// Profile entity (subscription columns only; auth owns the rest)
#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub subscription_tier: SubscriptionTier,
    pub subscription_status: SubscriptionStatus,
    pub current_period_end: Option<DateTime<Utc>>,
    pub pending_tier: Option<SubscriptionTier>,
    pub created_at: DateTime<Utc>,
}

/// One plan in the public catalog
#[derive(Debug, Clone, Serialize)]
pub struct PlanInfo {
    pub id: SubscriptionTier,
    pub name: &'static str,
    pub monthly_price: Option<Decimal>,
    pub currency: &'static str,
    pub limits: Vec<PlanLimit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanLimit {
    pub feature: &'static str,
    pub monthly_limit: EffectiveLimit,
}

/// Per-feature usage against the caller's effective limits
#[derive(Debug, Clone, Serialize)]
pub struct FeatureUsage {
    pub feature: &'static str,
    pub used: i64,
    pub limit: EffectiveLimit,
    pub remaining: EffectiveLimit,
}

impl FeatureUsage {
    pub fn new(feature: LimitedFeature, used: i64, limit: EffectiveLimit) -> Self {
        let remaining = match limit {
            EffectiveLimit::Unlimited => EffectiveLimit::Unlimited,
            EffectiveLimit::Limited(max) => EffectiveLimit::Limited((max - used).max(0)),
        };
        Self {
            feature: feature.as_str(),
            used,
            limit,
            remaining,
        }
    }
}

/// Request DTO for creating a PayPal order
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub plan: SubscriptionTier,
}

/// Response DTO after creating a PayPal order
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderResponse {
    pub order_id: String,
}

/// Request DTO for capturing a PayPal order
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureOrderRequest {
    pub order_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_monthly_limit_is_unlimited() {
        assert_eq!(EffectiveLimit::from_monthly(-1), EffectiveLimit::Unlimited);
        assert_eq!(
            EffectiveLimit::from_monthly(10),
            EffectiveLimit::Limited(10)
        );
    }

    #[test]
    fn unlimited_serializes_as_string_not_minus_one() {
        let json = serde_json::to_value(EffectiveLimit::from_monthly(-1)).unwrap();
        assert_eq!(json, serde_json::json!("unlimited"));

        let json = serde_json::to_value(EffectiveLimit::from_monthly(5)).unwrap();
        assert_eq!(json, serde_json::json!(5));
    }

    #[test]
    fn limit_allows_under_but_not_at_cap() {
        let limit = EffectiveLimit::Limited(3);
        assert!(limit.allows(2));
        assert!(!limit.allows(3));
        assert!(EffectiveLimit::Unlimited.allows(i64::MAX - 1));
    }

    #[test]
    fn tier_ordering_gates_features() {
        assert!(SubscriptionTier::Enterprise.meets(SubscriptionTier::Pro));
        assert!(SubscriptionTier::Pro.meets(SubscriptionTier::Pro));
        assert!(!SubscriptionTier::Free.meets(SubscriptionTier::Pro));
    }

    #[test]
    fn unknown_tier_text_falls_back_to_free() {
        assert_eq!(SubscriptionTier::from_db("platinum"), SubscriptionTier::Free);
        assert_eq!(SubscriptionTier::from_db("pro"), SubscriptionTier::Pro);
    }

    #[test]
    fn remaining_usage_never_goes_negative() {
        let usage = FeatureUsage::new(LimitedFeature::Audits, 12, EffectiveLimit::Limited(10));
        assert_eq!(usage.remaining, EffectiveLimit::Limited(0));
    }
}
