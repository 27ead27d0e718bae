//! Team routes
//!
//! Members are invited by email with a single-use token. The invited person
//! accepts while signed in, which binds their user id to the membership row.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::DataResponse;
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::notifications::NotificationType;
use crate::domain::subscriptions::LimitedFeature;
use crate::domain::teams::{
    AcceptInviteRequest, InviteMemberRequest, MemberStatus, TeamMemberResponse, TeamPermission,
    UpdateMemberRequest,
};
use crate::error::ApiError;
use crate::services::{limits, notifications, profiles};

#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    id: Uuid,
    owner_id: Uuid,
    email: String,
    member_user_id: Option<Uuid>,
    permission: String,
    status: String,
    invited_at: DateTime<Utc>,
    accepted_at: Option<DateTime<Utc>>,
}

impl From<MemberRow> for TeamMemberResponse {
    fn from(row: MemberRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            member_user_id: row.member_user_id,
            permission: TeamPermission::from_db(&row.permission),
            status: MemberStatus::from_db(&row.status),
            invited_at: row.invited_at,
            accepted_at: row.accepted_at,
        }
    }
}

const MEMBER_COLUMNS: &str =
    "id, owner_id, email, member_user_id, permission, status, invited_at, accepted_at";

/// GET /api/team
pub async fn list_members(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let rows = sqlx::query_as::<_, MemberRow>(&format!(
        "SELECT {} FROM team_members WHERE owner_id = $1 ORDER BY invited_at ASC",
        MEMBER_COLUMNS
    ))
    .bind(auth.user_id)
    .fetch_all(&state.db)
    .await?;

    let data: Vec<TeamMemberResponse> = rows.into_iter().map(Into::into).collect();
    Ok(Json(DataResponse::new(data)))
}

/// POST /api/team/invite
pub async fn invite_member(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<InviteMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::bad_request("A valid email address is required"));
    }

    let already: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM team_members WHERE owner_id = $1 AND email = $2)",
    )
    .bind(auth.user_id)
    .bind(&email)
    .fetch_one(&state.db)
    .await?;
    if already {
        return Err(ApiError::conflict("This email has already been invited"));
    }

    let profile = profiles::get_or_create(&state.db, auth.user_id, auth.email.as_deref()).await?;
    limits::check_limit(
        &state.db,
        auth.user_id,
        profile.tier(),
        LimitedFeature::TeamMembers,
    )
    .await?;

    let invite_token = Uuid::new_v4().to_string();

    let row = sqlx::query_as::<_, MemberRow>(&format!(
        r#"
        INSERT INTO team_members (id, owner_id, email, permission, status, invite_token, invited_at)
        VALUES ($1, $2, $3, $4, 'pending', $5, NOW())
        RETURNING {}
        "#,
        MEMBER_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(auth.user_id)
    .bind(&email)
    .bind(req.permission.as_str())
    .bind(&invite_token)
    .fetch_one(&state.db)
    .await?;

    let inviter_name = profile
        .full_name
        .or(profile.email)
        .unwrap_or_else(|| "A LilySEO user".to_string());
    let accept_url = format!(
        "{}/team/accept?token={}",
        state.settings.app_base_url.trim_end_matches('/'),
        invite_token
    );

    // The invite row stands even when the email bounces; the token can be
    // shared out of band.
    if let Err(e) = state
        .email
        .send_team_invite(&email, &inviter_name, &accept_url)
        .await
    {
        tracing::warn!(error = %e, email = %email, "Failed to send invitation email");
    }

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(TeamMemberResponse::from(row))),
    ))
}

/// POST /api/team/accept
pub async fn accept_invite(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<AcceptInviteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row = sqlx::query_as::<_, MemberRow>(&format!(
        r#"
        UPDATE team_members
        SET member_user_id = $2, status = 'active', accepted_at = NOW(), invite_token = NULL
        WHERE invite_token = $1 AND status = 'pending'
        RETURNING {}
        "#,
        MEMBER_COLUMNS
    ))
    .bind(&req.token)
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Invitation not found or already accepted"))?;

    if let Err(e) = notifications::create_notification(
        &state.db,
        row.owner_id,
        NotificationType::TeamInviteAccepted,
        "Team invitation accepted",
        Some(&format!("{} joined your team.", row.email)),
        Some(serde_json::json!({ "member_id": row.id })),
    )
    .await
    {
        tracing::warn!(error = %e, "Failed to create invite-accepted notification");
    }

    Ok(Json(DataResponse::new(TeamMemberResponse::from(row))))
}

/// PATCH /api/team/:member_id
pub async fn update_member(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<Uuid>,
    auth: RequireAuth,
    Json(req): Json<UpdateMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row = sqlx::query_as::<_, MemberRow>(&format!(
        r#"
        UPDATE team_members SET permission = $3
        WHERE id = $1 AND owner_id = $2
        RETURNING {}
        "#,
        MEMBER_COLUMNS
    ))
    .bind(member_id)
    .bind(auth.user_id)
    .bind(req.permission.as_str())
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Team member not found"))?;

    Ok(Json(DataResponse::new(TeamMemberResponse::from(row))))
}

/// DELETE /api/team/:member_id
pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<Uuid>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query("DELETE FROM team_members WHERE id = $1 AND owner_id = $2")
        .bind(member_id)
        .bind(auth.user_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Team member not found"));
    }

    Ok(Json(serde_json::json!({ "success": true })))
}
