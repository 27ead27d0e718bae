//! Notification routes

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::pagination::{Paginated, PaginationParams};
use crate::api::response::DataResponse;
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::notifications::{NotificationQuery, NotificationResponse, UnreadCountResponse};
use crate::error::ApiError;

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    #[sqlx(rename = "type")]
    notification_type: String,
    title: String,
    message: Option<String>,
    data: serde_json::Value,
    is_read: bool,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for NotificationResponse {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: row.id,
            notification_type: row.notification_type,
            title: row.title,
            message: row.message,
            data: row.data,
            is_read: row.is_read,
            read_at: row.read_at,
            created_at: row.created_at,
        }
    }
}

const NOTIFICATION_COLUMNS: &str =
    "id, type, title, message, data, is_read, read_at, created_at";

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<NotificationQuery>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let unread_only = filter.unread_only.unwrap_or(false);

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM notifications
        WHERE user_id = $1
        AND (NOT $2 OR is_read = FALSE)
        AND ($3::text IS NULL OR type = $3)
        "#,
    )
    .bind(auth.user_id)
    .bind(unread_only)
    .bind(&filter.notification_type)
    .fetch_one(&state.db)
    .await?;

    let rows = sqlx::query_as::<_, NotificationRow>(&format!(
        r#"
        SELECT {}
        FROM notifications
        WHERE user_id = $1
        AND (NOT $2 OR is_read = FALSE)
        AND ($3::text IS NULL OR type = $3)
        ORDER BY created_at DESC
        LIMIT $4 OFFSET $5
        "#,
        NOTIFICATION_COLUMNS
    ))
    .bind(auth.user_id)
    .bind(unread_only)
    .bind(&filter.notification_type)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(&state.db)
    .await?;

    let data: Vec<NotificationResponse> = rows.into_iter().map(Into::into).collect();
    Ok(Paginated::new(data, &pagination, total as u64))
}

/// GET /api/notifications/unread-count
pub async fn get_unread_count(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
    )
    .bind(auth.user_id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(DataResponse::new(UnreadCountResponse { count })))
}

/// PUT /api/notifications/:notification_id/read
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    Path(notification_id): Path<Uuid>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query(
        "UPDATE notifications SET is_read = TRUE, read_at = NOW() \
         WHERE id = $1 AND user_id = $2 AND is_read = FALSE",
    )
    .bind(notification_id)
    .bind(auth.user_id)
    .execute(&state.db)
    .await?;

    // Marking an already-read notification is a no-op, not an error
    if result.rows_affected() == 0 {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM notifications WHERE id = $1 AND user_id = $2)",
        )
        .bind(notification_id)
        .bind(auth.user_id)
        .fetch_one(&state.db)
        .await?;

        if !exists {
            return Err(ApiError::not_found("Notification not found"));
        }
    }

    Ok(Json(serde_json::json!({ "success": true })))
}

/// PUT /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query(
        "UPDATE notifications SET is_read = TRUE, read_at = NOW() \
         WHERE user_id = $1 AND is_read = FALSE",
    )
    .bind(auth.user_id)
    .execute(&state.db)
    .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "updated": result.rows_affected(),
    })))
}

/// DELETE /api/notifications/:notification_id
pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    Path(notification_id): Path<Uuid>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
        .bind(notification_id)
        .bind(auth.user_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Notification not found"));
    }

    Ok(Json(serde_json::json!({ "success": true })))
}
