//! Competitor routes
//!
//! Competitors hang off a project. Analysis is delegated to the crawler
//! service from a background task; the request returns as soon as the row is
//! flipped to processing.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
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
use crate::domain::competitors::{
    CompetitorResponse, CompetitorSnapshot, CompetitorStatus, CreateCompetitorRequest,
};
use crate::domain::subscriptions::LimitedFeature;
use crate::error::ApiError;
use crate::services::{limits, notifications, profiles};

#[derive(Debug, sqlx::FromRow)]
struct CompetitorRow {
    id: Uuid,
    project_id: Uuid,
    url: String,
    name: Option<String>,
    status: String,
    last_analyzed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<CompetitorRow> for CompetitorResponse {
    fn from(row: CompetitorRow) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            url: row.url,
            name: row.name,
            status: CompetitorStatus::from_db(&row.status),
            last_analyzed_at: row.last_analyzed_at,
            created_at: row.created_at,
        }
    }
}

const COMPETITOR_COLUMNS: &str =
    "id, project_id, url, name, status, last_analyzed_at, created_at";

async fn assert_project_owned(
    state: &AppState,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<(), ApiError> {
    let owned: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM projects WHERE id = $1 AND user_id = $2)")
            .bind(project_id)
            .bind(user_id)
            .fetch_one(&state.db)
            .await?;

    if owned {
        Ok(())
    } else {
        Err(ApiError::not_found("Project not found"))
    }
}

async fn fetch_owned_competitor(
    state: &AppState,
    competitor_id: Uuid,
    user_id: Uuid,
) -> Result<CompetitorRow, ApiError> {
    sqlx::query_as::<_, CompetitorRow>(&format!(
        "SELECT {} FROM competitors WHERE id = $1 AND user_id = $2",
        COMPETITOR_COLUMNS
    ))
    .bind(competitor_id)
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Competitor not found"))
}

/// GET /api/projects/:project_id/competitors
pub async fn list_competitors(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    assert_project_owned(&state, project_id, auth.user_id).await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM competitors WHERE project_id = $1")
        .bind(project_id)
        .fetch_one(&state.db)
        .await?;

    let rows = sqlx::query_as::<_, CompetitorRow>(&format!(
        "SELECT {} FROM competitors WHERE project_id = $1 \
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        COMPETITOR_COLUMNS
    ))
    .bind(project_id)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(&state.db)
    .await?;

    let data: Vec<CompetitorResponse> = rows.into_iter().map(Into::into).collect();
    Ok(Paginated::new(data, &pagination, total as u64))
}

/// POST /api/projects/:project_id/competitors
pub async fn create_competitor(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    auth: RequireAuth,
    Json(req): Json<CreateCompetitorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    assert_project_owned(&state, project_id, auth.user_id).await?;

    let parsed = url::Url::parse(&req.url)
        .map_err(|_| ApiError::bad_request("Competitor URL is not valid"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ApiError::bad_request("Competitor URL must be http or https"));
    }

    let tier = profiles::tier(&state.db, auth.user_id).await?;
    limits::check_limit(&state.db, auth.user_id, tier, LimitedFeature::Competitors).await?;

    let row = sqlx::query_as::<_, CompetitorRow>(&format!(
        r#"
        INSERT INTO competitors (id, user_id, project_id, url, name, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, NOW())
        RETURNING {}
        "#,
        COMPETITOR_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(auth.user_id)
    .bind(project_id)
    .bind(req.url.trim())
    .bind(&req.name)
    .bind(CompetitorStatus::Pending.as_str())
    .fetch_one(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(CompetitorResponse::from(row))),
    ))
}

/// GET /api/competitors/:competitor_id
pub async fn get_competitor(
    State(state): State<Arc<AppState>>,
    Path(competitor_id): Path<Uuid>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let row = fetch_owned_competitor(&state, competitor_id, auth.user_id).await?;
    Ok(Json(DataResponse::new(CompetitorResponse::from(row))))
}

/// DELETE /api/competitors/:competitor_id
pub async fn delete_competitor(
    State(state): State<Arc<AppState>>,
    Path(competitor_id): Path<Uuid>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query("DELETE FROM competitors WHERE id = $1 AND user_id = $2")
        .bind(competitor_id)
        .bind(auth.user_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Competitor not found"));
    }

    Ok(Json(serde_json::json!({ "success": true })))
}

/// POST /api/competitors/:competitor_id/analyze
///
/// Flips the row to processing and runs the crawler call in a spawned task.
/// An in-flight analysis is not restarted.
pub async fn analyze_competitor(
    State(state): State<Arc<AppState>>,
    Path(competitor_id): Path<Uuid>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let row = fetch_owned_competitor(&state, competitor_id, auth.user_id).await?;

    if CompetitorStatus::from_db(&row.status) == CompetitorStatus::Processing {
        return Err(ApiError::conflict("Analysis already in progress"));
    }

    sqlx::query("UPDATE competitors SET status = 'processing' WHERE id = $1")
        .bind(competitor_id)
        .execute(&state.db)
        .await?;

    let task_state = Arc::clone(&state);
    let user_id = auth.user_id;
    let url = row.url.clone();
    tokio::spawn(async move {
        run_analysis(task_state, competitor_id, user_id, url).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "success": true, "status": "processing" })),
    ))
}

/// Background half of analyze_competitor. Failures land in the row status;
/// there is nothing to hand back to the caller at this point.
async fn run_analysis(state: Arc<AppState>, competitor_id: Uuid, user_id: Uuid, url: String) {
    match state.crawler.analyze_competitor(competitor_id, &url).await {
        Ok(snapshot) => {
            let stored = async {
                sqlx::query(
                    "INSERT INTO competitor_data (id, competitor_id, snapshot, created_at) \
                     VALUES ($1, $2, $3, NOW())",
                )
                .bind(Uuid::new_v4())
                .bind(competitor_id)
                .bind(&snapshot)
                .execute(&state.db)
                .await?;

                sqlx::query(
                    "UPDATE competitors SET status = 'completed', last_analyzed_at = NOW() \
                     WHERE id = $1",
                )
                .bind(competitor_id)
                .execute(&state.db)
                .await?;

                Ok::<_, sqlx::Error>(())
            }
            .await;

            match stored {
                Ok(()) => {
                    if let Err(e) =
                        notifications::notify_competitor_analyzed(&state.db, user_id, competitor_id, &url)
                            .await
                    {
                        tracing::warn!(error = %e, "Failed to create competitor notification");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, competitor_id = %competitor_id, "Failed to store competitor snapshot");
                    mark_failed(&state, competitor_id).await;
                }
            }
        }
        Err(e) => {
            tracing::error!(error = %e, competitor_id = %competitor_id, "Competitor analysis failed");
            mark_failed(&state, competitor_id).await;
        }
    }
}

async fn mark_failed(state: &AppState, competitor_id: Uuid) {
    if let Err(e) = sqlx::query("UPDATE competitors SET status = 'failed' WHERE id = $1")
        .bind(competitor_id)
        .execute(&state.db)
        .await
    {
        tracing::error!(error = %e, competitor_id = %competitor_id, "Failed to mark competitor failed");
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SnapshotRow {
    id: Uuid,
    competitor_id: Uuid,
    snapshot: serde_json::Value,
    created_at: DateTime<Utc>,
}

/// GET /api/competitors/:competitor_id/data
pub async fn list_snapshots(
    State(state): State<Arc<AppState>>,
    Path(competitor_id): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    fetch_owned_competitor(&state, competitor_id, auth.user_id).await?;

    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM competitor_data WHERE competitor_id = $1")
            .bind(competitor_id)
            .fetch_one(&state.db)
            .await?;

    let rows = sqlx::query_as::<_, SnapshotRow>(
        "SELECT id, competitor_id, snapshot, created_at FROM competitor_data \
         WHERE competitor_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(competitor_id)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(&state.db)
    .await?;

    let data: Vec<CompetitorSnapshot> = rows
        .into_iter()
        .map(|row| CompetitorSnapshot {
            id: row.id,
            competitor_id: row.competitor_id,
            snapshot: row.snapshot,
            created_at: row.created_at,
        })
        .collect();

    Ok(Paginated::new(data, &pagination, total as u64))
}
