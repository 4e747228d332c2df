//! HTTP surface: auth and profile, categories, habits, calendar, stats and
//! the notification center.

pub mod auth;
pub mod categories;
pub mod habits;
pub mod middleware;
pub mod notifications;
pub mod reminders;

use axum::{
    Router,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};
use tracing::error;

use crate::auth::AppState;
use crate::middleware::{require_auth, require_cron_secret};

/// All routes, with auth applied to everything except registration, login,
/// the health check and the cron entrypoint (which has its own guard).
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let cron_routes = Router::new()
        .route("/notifications/schedule", get(notifications::schedule))
        .route_layer(from_fn_with_state(state.clone(), require_cron_secret));

    let protected_routes = Router::new()
        .route("/me", get(auth::me))
        .route("/categories", get(categories::list).post(categories::create))
        .route("/categories/{category_id}", put(categories::update).delete(categories::delete))
        .route("/habits", get(habits::dashboard).post(habits::create_habit))
        .route("/habits/{habit_id}", put(habits::update_habit).delete(habits::delete_habit))
        .route("/habits/{habit_id}/toggle", post(habits::toggle))
        .route("/calendar", get(habits::get_calendar))
        .route("/stats", get(habits::get_stats))
        .route("/notifications", get(notifications::list))
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/tick", post(notifications::tick))
        .route("/notifications/{notification_id}/read", post(notifications::mark_read))
        .route("/notifications/{notification_id}", delete(notifications::delete))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(cron_routes)
        .merge(protected_routes)
        .with_state(state)
}

/// GET /health: liveness check (no auth).
pub async fn health() -> &'static str {
    "ok"
}

/// Run blocking DB work off the async runtime.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T, StatusCode>
where
    F: FnOnce() -> Result<T, StatusCode> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
}

pub(crate) fn internal_error(e: anyhow::Error) -> StatusCode {
    error!("Database error: {:#}", e);
    StatusCode::INTERNAL_SERVER_ERROR
}
