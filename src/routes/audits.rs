//! Audit routes
//!
//! Audit lifecycle: kick-off against the crawler service, status sync via
//! webhook, retrieval, deletion, and CSV / report-payload export.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
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
use crate::domain::audits::{
    render_csv, report_recommendations, AuditResponse, AuditStatus, AuditWebhookPayload,
    CreateAuditRequest,
};
use crate::domain::projects::{ProjectResponse, ProjectStatus};
use crate::domain::subscriptions::LimitedFeature;
use crate::domain::white_label::{PdfTemplate, ReportPayload, WhiteLabelSettings};
use crate::error::ApiError;
use crate::services::cache::keys;
use crate::services::{limits, notifications, profiles};

/// Cap on todos auto-created from one report
const MAX_GENERATED_TODOS: usize = 20;

/// Database row for audit
#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    project_id: Uuid,
    user_id: Uuid,
    url: String,
    status: String,
    score: Option<i32>,
    report: Option<serde_json::Value>,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AuditRow> for AuditResponse {
    fn from(row: AuditRow) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            url: row.url,
            status: AuditStatus::from_db(&row.status),
            score: row.score,
            report: row.report,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const AUDIT_COLUMNS: &str = "id, project_id, user_id, url, status, score, report, \
                             error_message, created_at, updated_at";

/// The status to write, or None when the webhook redelivers the row's
/// current status and nothing (including `updated_at`) should change.
fn status_transition(current: &str, incoming: AuditStatus) -> Option<AuditStatus> {
    (AuditStatus::from_db(current) != incoming).then_some(incoming)
}

fn found_audit(row: Option<AuditRow>) -> Result<AuditRow, ApiError> {
    row.ok_or_else(|| ApiError::not_found("Audit report not found"))
}

fn deleted_audit(rows_affected: u64) -> Result<(), ApiError> {
    if rows_affected == 0 {
        return Err(ApiError::not_found(
            "Audit report not found or access denied",
        ));
    }
    Ok(())
}

/// POST /api/projects/:project_id/audits
///
/// Start a new audit. The row is inserted as `pending`, the crawl is
/// requested, and the row moves to `processing` (or `failed` if the crawler
/// rejects the kick-off).
pub async fn create_audit(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    auth: RequireAuth,
    Json(req): Json<CreateAuditRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Ownership check doubles as the URL source
    let project_url: String =
        sqlx::query_scalar("SELECT url FROM projects WHERE id = $1 AND user_id = $2")
            .bind(project_id)
            .bind(auth.user_id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| ApiError::not_found("Project not found"))?;

    let tier = profiles::tier(&state.db, auth.user_id).await?;
    limits::check_limit(&state.db, auth.user_id, tier, LimitedFeature::Audits).await?;

    let audit_id = Uuid::new_v4();
    let row = sqlx::query_as::<_, AuditRow>(&format!(
        r#"
        INSERT INTO audits (id, project_id, user_id, url, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, 'pending', NOW(), NOW())
        RETURNING {}
        "#,
        AUDIT_COLUMNS
    ))
    .bind(audit_id)
    .bind(project_id)
    .bind(auth.user_id)
    .bind(&project_url)
    .fetch_one(&state.db)
    .await?;

    let kicked_off = state
        .crawler
        .start_audit(audit_id, project_id, &project_url, req.options.as_ref())
        .await;

    let next_status = match &kicked_off {
        Ok(ack) => {
            tracing::info!(audit_id = %audit_id, job_id = %ack.job_id, "Crawl accepted");
            AuditStatus::Processing
        }
        Err(e) => {
            tracing::error!(audit_id = %audit_id, error = %e, "Crawl kick-off failed");
            AuditStatus::Failed
        }
    };

    sqlx::query("UPDATE audits SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(audit_id)
        .bind(next_status.as_str())
        .execute(&state.db)
        .await?;

    if let Err(e) = kicked_off {
        return Err(e);
    }

    let mut response = AuditResponse::from(row);
    response.status = next_status;
    Ok((StatusCode::CREATED, Json(DataResponse::new(response))))
}

/// GET /api/projects/:project_id/audits
pub async fn list_audits(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM audits WHERE project_id = $1 AND user_id = $2",
    )
    .bind(project_id)
    .bind(auth.user_id)
    .fetch_one(&state.db)
    .await?;

    let rows = sqlx::query_as::<_, AuditRow>(&format!(
        r#"
        SELECT {}
        FROM audits
        WHERE project_id = $1 AND user_id = $2
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
        AUDIT_COLUMNS
    ))
    .bind(project_id)
    .bind(auth.user_id)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(&state.db)
    .await?;

    let data: Vec<AuditResponse> = rows.into_iter().map(Into::into).collect();
    Ok(Paginated::new(data, &pagination, total as u64))
}

/// GET /api/audits/:audit_id
pub async fn get_audit(
    State(state): State<Arc<AppState>>,
    Path(audit_id): Path<Uuid>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let row = found_audit(fetch_owned_audit(&state, audit_id, auth.user_id).await?)?;

    Ok(Json(DataResponse::new(AuditResponse::from(row))))
}

/// DELETE /api/audits/:audit_id
pub async fn delete_audit(
    State(state): State<Arc<AppState>>,
    Path(audit_id): Path<Uuid>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query("DELETE FROM audits WHERE id = $1 AND user_id = $2")
        .bind(audit_id)
        .bind(auth.user_id)
        .execute(&state.db)
        .await?;

    deleted_audit(result.rows_affected())?;

    Ok(Json(serde_json::json!({ "success": true })))
}

/// POST /api/audits/webhook
///
/// Crawler completion callback. Requires the shared crawler API key; the
/// status write is idempotent (re-delivering the same status is a no-op and
/// leaves `updated_at` untouched).
pub async fn audit_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<AuditWebhookPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let provided = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if provided != state.settings.crawler_api_key {
        tracing::warn!(audit_id = %payload.audit_id, "Webhook rejected: bad API key");
        return Err(ApiError::unauthorized("Invalid API key"));
    }

    let incoming = AuditStatus::from_crawler(&payload.status)
        .ok_or_else(|| ApiError::bad_request(format!("Unknown status: {}", payload.status)))?;

    let audit = sqlx::query_as::<_, AuditRow>(&format!(
        "SELECT {} FROM audits WHERE id = $1",
        AUDIT_COLUMNS
    ))
    .bind(payload.audit_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Audit not found"))?;

    let new_status = match status_transition(&audit.status, incoming) {
        Some(status) => status,
        None => {
            tracing::debug!(audit_id = %audit.id, status = incoming.as_str(), "Webhook no-op");
            return Ok(Json(serde_json::json!({
                "success": true,
                "status": incoming.as_str(),
                "changed": false,
            })));
        }
    };

    sqlx::query(
        r#"
        UPDATE audits SET
            status = $2,
            score = COALESCE($3, score),
            report = COALESCE($4, report),
            error_message = $5,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(audit.id)
    .bind(new_status.as_str())
    .bind(payload.score)
    .bind(&payload.report)
    .bind(&payload.error)
    .execute(&state.db)
    .await?;

    let project_name: String =
        sqlx::query_scalar("SELECT name FROM projects WHERE id = $1")
            .bind(audit.project_id)
            .fetch_optional(&state.db)
            .await?
            .unwrap_or_else(|| audit.url.clone());

    match new_status {
        AuditStatus::Completed => {
            if let Some(score) = payload.score {
                sqlx::query("UPDATE projects SET last_audit_score = $2 WHERE id = $1")
                    .bind(audit.project_id)
                    .bind(score)
                    .execute(&state.db)
                    .await?;
            }

            if let Some(report) = &payload.report {
                create_todos_from_report(&state, &audit, report).await?;
            }

            if let Err(e) = notifications::notify_audit_completed(
                &state.db,
                audit.user_id,
                audit.id,
                &project_name,
                payload.score,
            )
            .await
            {
                tracing::error!(error = %e, "Failed to create completion notification");
            }
        }
        AuditStatus::Failed => {
            if let Err(e) = notifications::notify_audit_failed(
                &state.db,
                audit.user_id,
                audit.id,
                &project_name,
            )
            .await
            {
                tracing::error!(error = %e, "Failed to create failure notification");
            }
        }
        _ => {}
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "status": new_status.as_str(),
        "changed": true,
    })))
}

/// Turn report recommendations into pending todos
async fn create_todos_from_report(
    state: &AppState,
    audit: &AuditRow,
    report: &serde_json::Value,
) -> Result<(), ApiError> {
    let recommendations = report_recommendations(report);

    for title in recommendations.iter().take(MAX_GENERATED_TODOS) {
        let title: String = title.chars().take(200).collect();
        sqlx::query(
            r#"
            INSERT INTO todos (id, user_id, project_id, audit_id, title, status, priority, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 'pending', 'medium', NOW(), NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(audit.user_id)
        .bind(audit.project_id)
        .bind(audit.id)
        .bind(&title)
        .execute(&state.db)
        .await?;
    }

    if !recommendations.is_empty() {
        tracing::info!(
            audit_id = %audit.id,
            count = recommendations.len().min(MAX_GENERATED_TODOS),
            "Todos generated from audit recommendations"
        );
    }

    Ok(())
}

/// GET /api/audits/:audit_id/export/csv
pub async fn export_csv(
    State(state): State<Arc<AppState>>,
    Path(audit_id): Path<Uuid>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let row = found_audit(fetch_owned_audit(&state, audit_id, auth.user_id).await?)?;

    let audit = AuditResponse::from(row);
    let csv = render_csv(&audit);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"audit-{}.csv\"", audit.id),
            ),
        ],
        csv,
    ))
}

/// GET /api/audits/:audit_id/export/pdf
///
/// Compose the white-label report payload for the client-side PDF renderer.
/// Accepts either an authenticated session or the internal service header
/// (used by server-side rendering jobs).
pub async fn export_report_payload(
    State(state): State<Arc<AppState>>,
    Path(audit_id): Path<Uuid>,
    headers: HeaderMap,
    auth: Option<RequireAuth>,
) -> Result<impl IntoResponse, ApiError> {
    let internal = headers
        .get("x-internal-service")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == state.settings.crawler_api_key);

    let row = match &auth {
        Some(auth) => fetch_owned_audit(&state, audit_id, auth.user_id).await?,
        None if internal => {
            sqlx::query_as::<_, AuditRow>(&format!(
                "SELECT {} FROM audits WHERE id = $1",
                AUDIT_COLUMNS
            ))
            .bind(audit_id)
            .fetch_optional(&state.db)
            .await?
        }
        None => return Err(ApiError::unauthorized("Unauthorized")),
    };
    let row = found_audit(row)?;
    let owner_id = row.user_id;

    let cache_key = keys::report_payload(audit_id);
    if let Some(cached) = state.cache.get::<ReportPayload>(&cache_key).await {
        return Ok(Json(DataResponse::new(cached)));
    }

    let project = sqlx::query_as::<_, ProjectPayloadRow>(
        "SELECT id, name, url, description, status, auto_audit, last_audit_score, \
         created_at, updated_at FROM projects WHERE id = $1",
    )
    .bind(row.project_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Project not found"))?;

    let branding = fetch_branding(&state, owner_id).await?;
    let template = fetch_default_template(&state, owner_id).await?;

    let payload = ReportPayload {
        audit: AuditResponse::from(row),
        project: project.into(),
        branding,
        template,
        generated_at: Utc::now(),
    };

    if let Err(e) = state.cache.set(&cache_key, &payload).await {
        tracing::warn!(error = %e, "Failed to cache report payload");
    }

    Ok(Json(DataResponse::new(payload)))
}

#[derive(Debug, sqlx::FromRow)]
struct ProjectPayloadRow {
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

impl From<ProjectPayloadRow> for ProjectResponse {
    fn from(row: ProjectPayloadRow) -> Self {
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

async fn fetch_owned_audit(
    state: &AppState,
    audit_id: Uuid,
    user_id: Uuid,
) -> Result<Option<AuditRow>, ApiError> {
    let row = sqlx::query_as::<_, AuditRow>(&format!(
        "SELECT {} FROM audits WHERE id = $1 AND user_id = $2",
        AUDIT_COLUMNS
    ))
    .bind(audit_id)
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?;
    Ok(row)
}

async fn fetch_branding(
    state: &AppState,
    user_id: Uuid,
) -> Result<WhiteLabelSettings, ApiError> {
    let row: Option<(String, Option<String>, String, String, Option<String>)> =
        sqlx::query_as(
            "SELECT company_name, logo_url, primary_color, secondary_color, footer_text \
             FROM white_label_settings WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?;

    Ok(match row {
        Some((company_name, logo_url, primary_color, secondary_color, footer_text)) => {
            WhiteLabelSettings {
                company_name,
                logo_url,
                primary_color,
                secondary_color,
                footer_text,
            }
        }
        None => WhiteLabelSettings::default(),
    })
}

async fn fetch_default_template(
    state: &AppState,
    user_id: Uuid,
) -> Result<Option<PdfTemplate>, ApiError> {
    let tier = profiles::tier(&state.db, user_id).await?;

    let row: Option<(Uuid, String, Option<String>, String, serde_json::Value)> = sqlx::query_as(
        r#"
        SELECT id, name, description, tier_required, layout
        FROM pdf_templates
        WHERE tier_required = ANY($1)
        ORDER BY created_at ASC
        LIMIT 1
        "#,
    )
    .bind(allowed_tiers(tier))
    .fetch_optional(&state.db)
    .await?;

    Ok(row.map(|(id, name, description, tier_required, layout)| PdfTemplate {
        id,
        name,
        description,
        tier_required: crate::domain::subscriptions::SubscriptionTier::from_db(&tier_required),
        layout,
    }))
}

fn allowed_tiers(tier: crate::domain::subscriptions::SubscriptionTier) -> Vec<&'static str> {
    use crate::domain::subscriptions::SubscriptionTier::*;
    match tier {
        Free => vec!["free"],
        Pro => vec!["free", "pro"],
        Enterprise => vec!["free", "pro", "enterprise"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row(status: &str) -> AuditRow {
        AuditRow {
            id: Uuid::nil(),
            project_id: Uuid::nil(),
            user_id: Uuid::nil(),
            url: "https://example.com".to_string(),
            status: status.to_string(),
            score: None,
            report: None,
            error_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn redelivered_status_is_a_noop() {
        assert_eq!(status_transition("completed", AuditStatus::Completed), None);
        assert_eq!(
            status_transition("processing", AuditStatus::Processing),
            None
        );
        assert_eq!(
            status_transition("processing", AuditStatus::Completed),
            Some(AuditStatus::Completed)
        );
        assert_eq!(
            status_transition("pending", AuditStatus::Failed),
            Some(AuditStatus::Failed)
        );
    }

    #[test]
    fn missing_audit_maps_to_report_not_found() {
        match found_audit(None) {
            Err(ApiError::NotFound(msg)) => assert_eq!(msg, "Audit report not found"),
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert!(found_audit(Some(sample_row("pending"))).is_ok());
    }

    #[test]
    fn delete_without_ownership_maps_to_access_denied() {
        match deleted_audit(0) {
            Err(ApiError::NotFound(msg)) => {
                assert_eq!(msg, "Audit report not found or access denied")
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert!(deleted_audit(1).is_ok());
    }
}
