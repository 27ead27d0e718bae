//! Current-user route
//!
//! Returns the caller's profile, provisioning it on first request.

use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use crate::api::response::DataResponse;
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::subscriptions::ProfileResponse;
use crate::error::ApiError;
use crate::services::profiles;

/// GET /api/me
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let profile = profiles::get_or_create(&state.db, auth.user_id, auth.email.as_deref()).await?;

    Ok(Json(DataResponse::new(ProfileResponse::from(profile))))
}
