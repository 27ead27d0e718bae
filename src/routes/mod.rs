pub mod ai;
pub mod audits;
pub mod competitors;
pub mod cron;
pub mod health;
pub mod me;
pub mod notifications;
pub mod projects;
pub mod subscriptions;
pub mod teams;
pub mod todos;
pub mod white_label;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        // Current user
        .route("/api/me", get(me::get_me))
        // Projects
        .route(
            "/api/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/api/projects/:project_id",
            get(projects::get_project)
                .patch(projects::update_project)
                .delete(projects::delete_project),
        )
        // Audits
        .route(
            "/api/projects/:project_id/audits",
            get(audits::list_audits).post(audits::create_audit),
        )
        .route("/api/audits/webhook", post(audits::audit_webhook))
        .route(
            "/api/audits/:audit_id",
            get(audits::get_audit).delete(audits::delete_audit),
        )
        .route("/api/audits/:audit_id/export/csv", get(audits::export_csv))
        .route(
            "/api/audits/:audit_id/export/pdf",
            get(audits::export_report_payload),
        )
        // Todos
        .route(
            "/api/todos",
            get(todos::list_todos).post(todos::create_todo),
        )
        .route(
            "/api/todos/:todo_id",
            get(todos::get_todo)
                .patch(todos::update_todo)
                .delete(todos::delete_todo),
        )
        .route("/api/todos/batch/assign", post(todos::batch_assign))
        .route("/api/todos/batch/delete", post(todos::batch_delete))
        .route("/api/todos/batch/status", post(todos::batch_status))
        .route("/api/todos/batch/due-date", post(todos::batch_due_date))
        // Competitors
        .route(
            "/api/projects/:project_id/competitors",
            get(competitors::list_competitors).post(competitors::create_competitor),
        )
        .route(
            "/api/competitors/:competitor_id",
            get(competitors::get_competitor).delete(competitors::delete_competitor),
        )
        .route(
            "/api/competitors/:competitor_id/analyze",
            post(competitors::analyze_competitor),
        )
        .route(
            "/api/competitors/:competitor_id/data",
            get(competitors::list_snapshots),
        )
        // Team
        .route("/api/team", get(teams::list_members))
        .route("/api/team/invite", post(teams::invite_member))
        .route("/api/team/accept", post(teams::accept_invite))
        .route(
            "/api/team/:member_id",
            axum::routing::patch(teams::update_member).delete(teams::remove_member),
        )
        // Notifications
        .route("/api/notifications", get(notifications::list_notifications))
        .route(
            "/api/notifications/unread-count",
            get(notifications::get_unread_count),
        )
        .route(
            "/api/notifications/read-all",
            put(notifications::mark_all_read),
        )
        .route(
            "/api/notifications/:notification_id/read",
            put(notifications::mark_notification_read),
        )
        .route(
            "/api/notifications/:notification_id",
            delete(notifications::delete_notification),
        )
        // Subscriptions / billing
        .route("/api/subscriptions/plans", get(subscriptions::list_plans))
        .route(
            "/api/subscriptions/create-paypal-order",
            post(subscriptions::create_paypal_order),
        )
        .route(
            "/api/subscriptions/capture-paypal-order",
            post(subscriptions::capture_paypal_order),
        )
        .route("/api/subscriptions/downgrade", post(subscriptions::downgrade))
        .route("/api/usage", get(subscriptions::get_usage))
        // AI
        .route("/api/ai/generate", post(ai::generate))
        .route("/api/ai/detect-industry", post(ai::detect_industry))
        // White label
        .route(
            "/api/white-label",
            get(white_label::get_settings).put(white_label::update_settings),
        )
        .route("/api/pdf-templates", get(white_label::list_templates))
        // Scheduled maintenance
        .route("/api/cron/daily", post(cron::daily))
        .route(
            "/api/cron/check-subscriptions",
            post(cron::check_subscriptions),
        )
}
