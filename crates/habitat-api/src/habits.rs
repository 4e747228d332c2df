use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use habitat_core::reminder::parse_at_time;
use habitat_core::{CoreError, HabitHistory, calendar, stats};
use habitat_db::Database;
use habitat_types::api::{
    CalendarResponse, Claims, DashboardQuery, DashboardResponse, HabitCreated, HabitRequest,
    HabitSummary, StatsResponse, ToggleRequest, ToggleResponse,
};
use habitat_types::models::{Category, Habit, Recurrence, Reminder, is_known_color};

use crate::auth::AppState;
use crate::{internal_error, run_blocking};

pub(crate) const DEFAULT_COLOR: &str = "purple";

/// Every habit of a user with its full completion history.
fn load_histories(
    db: &Database,
    user_id: &str,
) -> anyhow::Result<(Vec<HabitHistory>, HashMap<String, Reminder>)> {
    let habits = db.list_habits(user_id)?;
    let ids: Vec<String> = habits.iter().map(|h| h.id.clone()).collect();
    let reminders = db.get_reminders(&ids)?;
    let mut completions = db.completions_for_habits(&ids)?;

    let histories = habits
        .into_iter()
        .map(|habit| HabitHistory {
            completions: completions.remove(&habit.id).unwrap_or_default(),
            habit,
        })
        .collect();
    Ok((histories, reminders))
}

fn validate(req: &HabitRequest) -> Result<(), StatusCode> {
    if req.name.trim().is_empty() || req.name.len() > 100 {
        return Err(StatusCode::BAD_REQUEST);
    }
    // Unknown recurrences are only tolerated on rows already stored.
    if matches!(req.recurrence, Recurrence::Other(_)) {
        return Err(StatusCode::BAD_REQUEST);
    }
    if req.color.as_deref().is_some_and(|c| !is_known_color(c)) {
        return Err(StatusCode::BAD_REQUEST);
    }
    if let (Some(start), Some(end)) = (req.start_date, req.end_date) {
        if end < start {
            return Err(StatusCode::BAD_REQUEST);
        }
    }
    if let Some(reminder) = &req.reminder {
        parse_at_time(&reminder.at_time).map_err(|_| StatusCode::BAD_REQUEST)?;
    }
    Ok(())
}

/// The caller's category named by the request, 400 if it is someone else's or gone.
fn requested_category(db: &Database, user_id: &str, req: &HabitRequest) -> Result<Option<Category>, StatusCode> {
    match &req.category_id {
        Some(id) => db
            .get_category(user_id, id)
            .map_err(internal_error)?
            .map(Some)
            .ok_or(StatusCode::BAD_REQUEST),
        None => Ok(None),
    }
}

fn apply(habit: &mut Habit, req: HabitRequest, category: Option<&Category>) -> Option<Reminder> {
    habit.name = req.name.trim().to_string();
    habit.description = req.description.filter(|d| !d.trim().is_empty());
    habit.color = req
        .color
        .or_else(|| category.map(|c| c.color.clone()))
        .unwrap_or_else(|| DEFAULT_COLOR.to_string());
    habit.category_id = category.map(|c| c.id.clone());
    habit.recurrence = req.recurrence;
    habit.start_date = req.start_date;
    habit.end_date = req.end_date;
    habit.notifications_enabled = req.notifications_enabled;
    req.reminder
}

/// GET /habits?category=: dashboard for today (UTC), optionally narrowed to
/// one category. The today ratio covers the listed habits only.
pub async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let today = Utc::now().date_naive();
    let db = state.clone();
    let user_id = claims.sub.to_string();

    let (mut histories, mut reminders, categories) = run_blocking(move || {
        let (histories, reminders) = load_histories(&db.db, &user_id).map_err(internal_error)?;
        let categories: HashMap<String, Category> = db
            .db
            .list_categories(&user_id)
            .map_err(internal_error)?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();
        Ok((histories, reminders, categories))
    })
    .await?;

    if let Some(category) = &query.category {
        histories.retain(|h| h.habit.category_id.as_ref() == Some(category));
    }

    let summary = stats::today_summary(&histories, today);
    let habits = histories
        .into_iter()
        .map(|history| HabitSummary {
            reminder: reminders.remove(&history.habit.id),
            category: history
                .habit
                .category_id
                .as_ref()
                .and_then(|id| categories.get(id))
                .cloned(),
            streak: history.streak(today),
            due_today: history.is_due(today),
            completed_today: history.completed_on(today),
            completed_dates: history.completions.iter().copied().collect(),
            habit: history.habit,
        })
        .collect();

    Ok(Json(DashboardResponse {
        date: today,
        today: summary,
        habits,
    }))
}

/// POST /habits
pub async fn create_habit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<HabitRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    validate(&req)?;

    let mut habit = Habit {
        id: Uuid::new_v4().to_string(),
        user_id: claims.sub.to_string(),
        name: String::new(),
        description: None,
        color: String::new(),
        recurrence: req.recurrence.clone(),
        start_date: None,
        end_date: None,
        created_at: Utc::now(),
        notifications_enabled: true,
        category_id: None,
    };

    let db = state.clone();
    let id = habit.id.clone();
    run_blocking(move || {
        let category = requested_category(&db.db, &habit.user_id, &req)?;
        let reminder = apply(&mut habit, req, category.as_ref());
        db.db
            .create_habit(&habit, reminder.as_ref())
            .map_err(internal_error)
    })
    .await?;

    info!(habit_id = %id, user_id = %claims.sub, "Habit created");
    Ok((StatusCode::CREATED, Json(HabitCreated { id })))
}

/// PUT /habits/{habit_id}
pub async fn update_habit(
    State(state): State<AppState>,
    Path(habit_id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<HabitRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    validate(&req)?;

    let db = state.clone();
    let user_id = claims.sub.to_string();
    run_blocking(move || {
        let mut habit = db
            .db
            .get_habit(&user_id, &habit_id)
            .map_err(internal_error)?
            .ok_or(StatusCode::NOT_FOUND)?;
        let category = requested_category(&db.db, &user_id, &req)?;
        let reminder = apply(&mut habit, req, category.as_ref());

        if db.db.update_habit(&habit, reminder.as_ref()).map_err(internal_error)? {
            Ok(StatusCode::NO_CONTENT)
        } else {
            Err(StatusCode::NOT_FOUND)
        }
    })
    .await
}

/// DELETE /habits/{habit_id}
pub async fn delete_habit(
    State(state): State<AppState>,
    Path(habit_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    run_blocking(move || {
        if db.db.delete_habit(&user_id, &habit_id).map_err(internal_error)? {
            info!(habit_id = %habit_id, "Habit deleted");
            Ok(StatusCode::NO_CONTENT)
        } else {
            Err(StatusCode::NOT_FOUND)
        }
    })
    .await
}

/// POST /habits/{habit_id}/toggle: flip completion for a day (default today).
/// The body is optional.
pub async fn toggle(
    State(state): State<AppState>,
    Path(habit_id): Path<String>,
    Extension(claims): Extension<Claims>,
    body: Option<Json<ToggleRequest>>,
) -> Result<impl IntoResponse, StatusCode> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let date = req.date.unwrap_or_else(|| Utc::now().date_naive());

    let db = state.clone();
    let user_id = claims.sub.to_string();
    run_blocking(move || {
        db.db
            .get_habit(&user_id, &habit_id)
            .map_err(internal_error)?
            .ok_or(StatusCode::NOT_FOUND)?;
        let done = db.db.toggle_log(&habit_id, date).map_err(internal_error)?;
        Ok(Json(ToggleResponse {
            habit_id,
            date,
            done,
        }))
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// GET /calendar?year=&month=: defaults to the current month.
pub async fn get_calendar(
    State(state): State<AppState>,
    Query(query): Query<CalendarQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let today = Utc::now().date_naive();
    let year = query.year.unwrap_or(today.year());
    let month = query.month.unwrap_or(today.month());

    let db = state.clone();
    let user_id = claims.sub.to_string();
    let (histories, _) =
        run_blocking(move || load_histories(&db.db, &user_id).map_err(internal_error)).await?;

    let days = calendar::month_view(&histories, year, month).map_err(|e| match e {
        CoreError::InvalidMonth { .. } | CoreError::DateOutOfRange(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    })?;

    Ok(Json(CalendarResponse { year, month, days }))
}

/// GET /stats
pub async fn get_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let today: NaiveDate = Utc::now().date_naive();
    let db = state.clone();
    let user_id = claims.sub.to_string();
    let (histories, _) =
        run_blocking(move || load_histories(&db.db, &user_id).map_err(internal_error)).await?;

    Ok(Json(StatsResponse {
        stats: stats::user_stats(&histories, today),
        weekly: stats::weekly_chart(&histories, today),
    }))
}
