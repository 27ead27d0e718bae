//! Notification service
//!
//! Called by routes and background tasks when events occur that should
//! surface in the in-app notification feed.

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::notifications::NotificationType;

/// Create a notification for a user
pub async fn create_notification(
    db: &PgPool,
    user_id: Uuid,
    notification_type: NotificationType,
    title: &str,
    message: Option<&str>,
    data: Option<serde_json::Value>,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    let type_str = notification_type.to_string();
    let data = data.unwrap_or(serde_json::json!({}));

    sqlx::query(
        r#"
        INSERT INTO notifications (id, user_id, type, title, message, data)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(&type_str)
    .bind(title)
    .bind(message)
    .bind(&data)
    .execute(db)
    .await?;

    tracing::info!(
        user_id = %user_id,
        notification_type = %type_str,
        notification_id = %id,
        "Notification created"
    );

    Ok(id)
}

/// Notify a user that an audit finished
pub async fn notify_audit_completed(
    db: &PgPool,
    user_id: Uuid,
    audit_id: Uuid,
    project_name: &str,
    score: Option<i32>,
) -> Result<Uuid, sqlx::Error> {
    let message = match score {
        Some(score) => format!("'{}' scored {}/100.", project_name, score),
        None => format!("The audit for '{}' is ready.", project_name),
    };

    create_notification(
        db,
        user_id,
        NotificationType::AuditCompleted,
        &format!("Audit complete: {}", project_name),
        Some(&message),
        Some(serde_json::json!({ "audit_id": audit_id, "score": score })),
    )
    .await
}

/// Notify a user that an audit failed
pub async fn notify_audit_failed(
    db: &PgPool,
    user_id: Uuid,
    audit_id: Uuid,
    project_name: &str,
) -> Result<Uuid, sqlx::Error> {
    create_notification(
        db,
        user_id,
        NotificationType::AuditFailed,
        &format!("Audit failed: {}", project_name),
        Some("The crawler could not complete this audit. Try again or contact support."),
        Some(serde_json::json!({ "audit_id": audit_id })),
    )
    .await
}

/// Notify a user that a competitor analysis snapshot is ready
pub async fn notify_competitor_analyzed(
    db: &PgPool,
    user_id: Uuid,
    competitor_id: Uuid,
    competitor_url: &str,
) -> Result<Uuid, sqlx::Error> {
    create_notification(
        db,
        user_id,
        NotificationType::CompetitorAnalyzed,
        "Competitor analysis ready",
        Some(&format!("Fresh analysis available for {}.", competitor_url)),
        Some(serde_json::json!({ "competitor_id": competitor_id })),
    )
    .await
}

/// Notify a user about a subscription change (upgrade, downgrade, expiry)
pub async fn notify_subscription_changed(
    db: &PgPool,
    user_id: Uuid,
    title: &str,
    message: &str,
) -> Result<Uuid, sqlx::Error> {
    create_notification(
        db,
        user_id,
        NotificationType::SubscriptionChanged,
        title,
        Some(message),
        None,
    )
    .await
}
