//! Service health endpoint.
//!
//! Postgres is the only hard dependency; Redis and the crawler degrade
//! gracefully, so their failures report `degraded` rather than 503.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::app::AppState;
use crate::db;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub services: ComponentStatus,
}

#[derive(Serialize)]
pub struct ComponentStatus {
    pub database: &'static str,
    pub redis: &'static str,
    pub crawler_service: &'static str,
}

fn label(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "error"
    }
}

/// GET /health (public)
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let (db_ok, redis_ok, crawler_ok) = tokio::join!(
        db::health_check(&state.db),
        async { state.cache.health_check().await.is_ok() },
        async { state.crawler.health_check().await.is_ok() },
    );

    let (status, code) = if db_ok && redis_ok && crawler_ok {
        ("healthy", StatusCode::OK)
    } else if db_ok {
        ("degraded", StatusCode::OK)
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            services: ComponentStatus {
                database: label(db_ok),
                redis: label(redis_ok),
                crawler_service: label(crawler_ok),
            },
        }),
    )
}
