//! Project routes
//!
//! CRUD over the caller's projects. Creation is gated by the tier project
//! limit.

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
use crate::domain::projects::{
    CreateProjectRequest, ProjectResponse, ProjectStatus, UpdateProjectRequest,
};
use crate::domain::subscriptions::LimitedFeature;
use crate::error::ApiError;
use crate::services::{limits, profiles};

/// Database row for project
#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    name: String,
    url: String,
    description: Option<String>,
    status: String,
    auto_audit: bool,
    last_audit_score: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProjectRow> for ProjectResponse {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            url: row.url,
            description: row.description,
            status: ProjectStatus::from_db(&row.status),
            auto_audit: row.auto_audit,
            last_audit_score: row.last_audit_score,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const PROJECT_COLUMNS: &str = "id, name, url, description, status, auto_audit, \
                               last_audit_score, created_at, updated_at";

/// GET /api/projects
///
/// List the caller's projects.
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE user_id = $1")
        .bind(auth.user_id)
        .fetch_one(&state.db)
        .await?;

    let rows = sqlx::query_as::<_, ProjectRow>(&format!(
        r#"
        SELECT {}
        FROM projects
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
        PROJECT_COLUMNS
    ))
    .bind(auth.user_id)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(&state.db)
    .await?;

    let data: Vec<ProjectResponse> = rows.into_iter().map(Into::into).collect();
    Ok(Paginated::new(data, &pagination, total as u64))
}

/// POST /api/projects
///
/// Create a project; enforces the tier project limit.
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("Project name is required"));
    }
    let parsed =
        url::Url::parse(&req.url).map_err(|_| ApiError::bad_request("Invalid project URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ApiError::bad_request("Project URL must be http or https"));
    }

    let tier = profiles::tier(&state.db, auth.user_id).await?;
    limits::check_limit(&state.db, auth.user_id, tier, LimitedFeature::Projects).await?;

    let row = sqlx::query_as::<_, ProjectRow>(&format!(
        r#"
        INSERT INTO projects (id, user_id, name, url, description, status, auto_audit, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, 'active', $6, NOW(), NOW())
        RETURNING {}
        "#,
        PROJECT_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(auth.user_id)
    .bind(req.name.trim())
    .bind(parsed.as_str())
    .bind(&req.description)
    .bind(req.auto_audit)
    .fetch_one(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(ProjectResponse::from(row))),
    ))
}

/// GET /api/projects/:project_id
pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let row = sqlx::query_as::<_, ProjectRow>(&format!(
        "SELECT {} FROM projects WHERE id = $1 AND user_id = $2",
        PROJECT_COLUMNS
    ))
    .bind(project_id)
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Project not found"))?;

    Ok(Json(DataResponse::new(ProjectResponse::from(row))))
}

/// PATCH /api/projects/:project_id
pub async fn update_project(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    auth: RequireAuth,
    Json(req): Json<UpdateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status = req.status.map(|s| s.as_str());

    let row = sqlx::query_as::<_, ProjectRow>(&format!(
        r#"
        UPDATE projects SET
            name = COALESCE($3, name),
            description = COALESCE($4, description),
            status = COALESCE($5, status),
            auto_audit = COALESCE($6, auto_audit),
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING {}
        "#,
        PROJECT_COLUMNS
    ))
    .bind(project_id)
    .bind(auth.user_id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(status)
    .bind(req.auto_audit)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Project not found"))?;

    Ok(Json(DataResponse::new(ProjectResponse::from(row))))
}

/// DELETE /api/projects/:project_id
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query("DELETE FROM projects WHERE id = $1 AND user_id = $2")
        .bind(project_id)
        .bind(auth.user_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Project not found"));
    }

    Ok(Json(serde_json::json!({ "success": true })))
}
