//! Todo routes
//!
//! CRUD plus the batch mutations. Batch endpoints mutate only the owned
//! subset of the requested ids and report the rest back as unauthorized.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::pagination::{Paginated, PaginationParams};
use crate::api::response::DataResponse;
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::todos::{
    partition_owned, BatchAssignRequest, BatchDeleteRequest, BatchDueDateRequest, BatchResult,
    BatchStatusRequest, CreateTodoRequest, TodoPriority, TodoQuery, TodoResponse, TodoStatus,
    UpdateTodoRequest,
};
use crate::error::ApiError;

/// Database row for todo
#[derive(Debug, sqlx::FromRow)]
struct TodoRow {
    id: Uuid,
    project_id: Option<Uuid>,
    audit_id: Option<Uuid>,
    title: String,
    description: Option<String>,
    status: String,
    priority: String,
    assigned_to: Option<Uuid>,
    due_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TodoRow> for TodoResponse {
    fn from(row: TodoRow) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            audit_id: row.audit_id,
            title: row.title,
            description: row.description,
            status: TodoStatus::from_db(&row.status),
            priority: TodoPriority::from_db(&row.priority),
            assigned_to: row.assigned_to,
            due_date: row.due_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const TODO_COLUMNS: &str = "id, project_id, audit_id, title, description, status, priority, \
                            assigned_to, due_date, created_at, updated_at";

/// GET /api/todos
pub async fn list_todos(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<TodoQuery>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let status = filter.status.map(|s| s.as_str());
    let priority = filter.priority.map(|p| p.as_str());

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM todos
        WHERE user_id = $1
        AND ($2::uuid IS NULL OR project_id = $2)
        AND ($3::text IS NULL OR status = $3)
        AND ($4::text IS NULL OR priority = $4)
        "#,
    )
    .bind(auth.user_id)
    .bind(filter.project_id)
    .bind(status)
    .bind(priority)
    .fetch_one(&state.db)
    .await?;

    let rows = sqlx::query_as::<_, TodoRow>(&format!(
        r#"
        SELECT {}
        FROM todos
        WHERE user_id = $1
        AND ($2::uuid IS NULL OR project_id = $2)
        AND ($3::text IS NULL OR status = $3)
        AND ($4::text IS NULL OR priority = $4)
        ORDER BY created_at DESC
        LIMIT $5 OFFSET $6
        "#,
        TODO_COLUMNS
    ))
    .bind(auth.user_id)
    .bind(filter.project_id)
    .bind(status)
    .bind(priority)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(&state.db)
    .await?;

    let data: Vec<TodoResponse> = rows.into_iter().map(Into::into).collect();
    Ok(Paginated::new(data, &pagination, total as u64))
}

/// POST /api/todos
pub async fn create_todo(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<CreateTodoRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::bad_request("Todo title is required"));
    }

    // When linked to a project, the project must belong to the caller
    if let Some(project_id) = req.project_id {
        let owned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM projects WHERE id = $1 AND user_id = $2)",
        )
        .bind(project_id)
        .bind(auth.user_id)
        .fetch_one(&state.db)
        .await?;

        if !owned {
            return Err(ApiError::not_found("Project not found"));
        }
    }

    let row = sqlx::query_as::<_, TodoRow>(&format!(
        r#"
        INSERT INTO todos (id, user_id, project_id, audit_id, title, description, status,
                           priority, assigned_to, due_date, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW())
        RETURNING {}
        "#,
        TODO_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(auth.user_id)
    .bind(req.project_id)
    .bind(req.audit_id)
    .bind(req.title.trim())
    .bind(&req.description)
    .bind(req.status.as_str())
    .bind(req.priority.as_str())
    .bind(req.assigned_to)
    .bind(req.due_date)
    .fetch_one(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(TodoResponse::from(row))),
    ))
}

/// GET /api/todos/:todo_id
pub async fn get_todo(
    State(state): State<Arc<AppState>>,
    Path(todo_id): Path<Uuid>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let row = sqlx::query_as::<_, TodoRow>(&format!(
        "SELECT {} FROM todos WHERE id = $1 AND user_id = $2",
        TODO_COLUMNS
    ))
    .bind(todo_id)
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Todo not found"))?;

    Ok(Json(DataResponse::new(TodoResponse::from(row))))
}

/// PATCH /api/todos/:todo_id
pub async fn update_todo(
    State(state): State<Arc<AppState>>,
    Path(todo_id): Path<Uuid>,
    auth: RequireAuth,
    Json(req): Json<UpdateTodoRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status = req.status.map(|s| s.as_str());
    let priority = req.priority.map(|p| p.as_str());

    let row = sqlx::query_as::<_, TodoRow>(&format!(
        r#"
        UPDATE todos SET
            title = COALESCE($3, title),
            description = COALESCE($4, description),
            status = COALESCE($5, status),
            priority = COALESCE($6, priority),
            assigned_to = COALESCE($7, assigned_to),
            due_date = COALESCE($8, due_date),
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING {}
        "#,
        TODO_COLUMNS
    ))
    .bind(todo_id)
    .bind(auth.user_id)
    .bind(&req.title)
    .bind(&req.description)
    .bind(status)
    .bind(priority)
    .bind(req.assigned_to)
    .bind(req.due_date)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Todo not found"))?;

    Ok(Json(DataResponse::new(TodoResponse::from(row))))
}

/// DELETE /api/todos/:todo_id
pub async fn delete_todo(
    State(state): State<Arc<AppState>>,
    Path(todo_id): Path<Uuid>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query("DELETE FROM todos WHERE id = $1 AND user_id = $2")
        .bind(todo_id)
        .bind(auth.user_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Todo not found"));
    }

    Ok(Json(serde_json::json!({ "success": true })))
}

// ============================================================================
// Batch operations
// ============================================================================

/// Resolve which of the requested ids the caller actually owns
async fn partition_request(
    state: &AppState,
    user_id: Uuid,
    todo_ids: &[Uuid],
) -> Result<(Vec<Uuid>, Vec<Uuid>), ApiError> {
    if todo_ids.is_empty() {
        return Err(ApiError::bad_request("todo_ids is required"));
    }

    let owned: Vec<Uuid> =
        sqlx::query_scalar("SELECT id FROM todos WHERE id = ANY($1) AND user_id = $2")
            .bind(todo_ids)
            .bind(user_id)
            .fetch_all(&state.db)
            .await?;

    let owned: HashSet<Uuid> = owned.into_iter().collect();
    Ok(partition_owned(todo_ids, &owned))
}

/// POST /api/todos/batch/assign
pub async fn batch_assign(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<BatchAssignRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (updated, unauthorized) = partition_request(&state, auth.user_id, &req.todo_ids).await?;

    if !updated.is_empty() {
        sqlx::query(
            "UPDATE todos SET assigned_to = $3, updated_at = NOW() \
             WHERE id = ANY($1) AND user_id = $2",
        )
        .bind(&updated)
        .bind(auth.user_id)
        .bind(req.assigned_to)
        .execute(&state.db)
        .await?;
    }

    Ok(Json(BatchResult {
        success: true,
        updated,
        unauthorized,
    }))
}

/// POST /api/todos/batch/delete
pub async fn batch_delete(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<BatchDeleteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (updated, unauthorized) = partition_request(&state, auth.user_id, &req.todo_ids).await?;

    if !updated.is_empty() {
        sqlx::query("DELETE FROM todos WHERE id = ANY($1) AND user_id = $2")
            .bind(&updated)
            .bind(auth.user_id)
            .execute(&state.db)
            .await?;
    }

    Ok(Json(BatchResult {
        success: true,
        updated,
        unauthorized,
    }))
}

/// POST /api/todos/batch/status
pub async fn batch_status(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<BatchStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (updated, unauthorized) = partition_request(&state, auth.user_id, &req.todo_ids).await?;

    if !updated.is_empty() {
        sqlx::query(
            "UPDATE todos SET status = $3, updated_at = NOW() \
             WHERE id = ANY($1) AND user_id = $2",
        )
        .bind(&updated)
        .bind(auth.user_id)
        .bind(req.status.as_str())
        .execute(&state.db)
        .await?;
    }

    Ok(Json(BatchResult {
        success: true,
        updated,
        unauthorized,
    }))
}

/// POST /api/todos/batch/due-date
pub async fn batch_due_date(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<BatchDueDateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (updated, unauthorized) = partition_request(&state, auth.user_id, &req.todo_ids).await?;

    if !updated.is_empty() {
        sqlx::query(
            "UPDATE todos SET due_date = $3, updated_at = NOW() \
             WHERE id = ANY($1) AND user_id = $2",
        )
        .bind(&updated)
        .bind(auth.user_id)
        .bind(req.due_date)
        .execute(&state.db)
        .await?;
    }

    Ok(Json(BatchResult {
        success: true,
        updated,
        unauthorized,
    }))
}
