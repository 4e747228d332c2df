use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;

use habitat_db::notifications::NOTIFICATION_PAGE;
use habitat_types::api::{Claims, ScheduleResponse, UnreadCountResponse};

use crate::auth::AppState;
use crate::reminders::run_schedule;
use crate::{internal_error, run_blocking};

/// GET /notifications: latest page, newest first.
pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    let notifications = run_blocking(move || {
        db.db
            .list_notifications(&user_id, NOTIFICATION_PAGE)
            .map_err(internal_error)
    })
    .await?;
    Ok(Json(notifications))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    let unread_count =
        run_blocking(move || db.db.unread_count(&user_id).map_err(internal_error)).await?;
    Ok(Json(UnreadCountResponse { unread_count }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(notification_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    run_blocking(move || {
        match db.db.mark_notification_read(&user_id, &notification_id).map_err(internal_error)? {
            true => Ok(StatusCode::NO_CONTENT),
            false => Err(StatusCode::NOT_FOUND),
        }
    })
    .await
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    run_blocking(move || db.db.mark_all_read(&user_id).map_err(internal_error)).await?;
    Ok(Json(UnreadCountResponse { unread_count: 0 }))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(notification_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    run_blocking(move || {
        match db.db.delete_notification(&user_id, &notification_id).map_err(internal_error)? {
            true => Ok(StatusCode::NO_CONTENT),
            false => Err(StatusCode::NOT_FOUND),
        }
    })
    .await
}

/// POST /notifications/tick: run the scheduler for the caller's habits.
pub async fn tick(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    let (habits, unread_count) = run_blocking(move || {
        let fired = run_schedule(&db.db, db.scheduler, Some(&user_id), Utc::now())
            .map_err(internal_error)?;
        let unread = db.db.unread_count(&user_id).map_err(internal_error)?;
        Ok((fired, unread))
    })
    .await?;

    Ok(Json(ScheduleResponse {
        success: true,
        notifications_created: habits.len(),
        habits,
        unread_count: Some(unread_count),
    }))
}

/// GET /notifications/schedule: cron entrypoint covering every user.
pub async fn schedule(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let habits = run_blocking(move || {
        run_schedule(&db.db, db.scheduler, None, Utc::now()).map_err(internal_error)
    })
    .await?;

    if !habits.is_empty() {
        info!("Schedule run created {} reminders", habits.len());
    }
    Ok(Json(ScheduleResponse {
        success: true,
        notifications_created: habits.len(),
        habits,
        unread_count: None,
    }))
}
