use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Category, Habit, Recurrence, Reminder};

// -- JWT Claims --

/// JWT claims issued by the auth routes and checked by the API middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub name: String,
    pub token: String,
}

// -- Habits --

/// Body of `POST /habits` and `PUT /habits/{id}`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HabitRequest {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub recurrence: Recurrence,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
    pub reminder: Option<Reminder>,
    /// Must name one of the caller's categories. Without an explicit
    /// `color` the habit takes the category's color.
    pub category_id: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct HabitCreated {
    pub id: String,
}

/// One dashboard card.
#[derive(Debug, Clone, Serialize)]
pub struct HabitSummary {
    #[serde(flatten)]
    pub habit: Habit,
    pub reminder: Option<Reminder>,
    pub category: Option<Category>,
    pub streak: u32,
    pub due_today: bool,
    pub completed_today: bool,
    pub completed_dates: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodaySummary {
    pub completed: usize,
    pub total: usize,
    pub percentage: u32,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub date: NaiveDate,
    pub today: TodaySummary,
    pub habits: Vec<HabitSummary>,
}

/// `GET /habits?category=<id>` narrows the dashboard to one category.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToggleRequest {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub habit_id: String,
    pub date: NaiveDate,
    pub done: bool,
}

// -- Categories --

/// Body of `POST /categories` and `PUT /categories/{id}`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryRequest {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CategoryCreated {
    pub id: String,
}

// -- Calendar --

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub in_month: bool,
    /// Habit ids due on this day.
    pub due: Vec<String>,
    /// Habit ids completed on this day.
    pub completed: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CalendarResponse {
    pub year: i32,
    pub month: u32,
    pub days: Vec<CalendarDay>,
}

// -- Stats --

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub total_habits: usize,
    pub completed_today: usize,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub completion_rate: u32,
    pub total_completed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartDay {
    pub date: NaiveDate,
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: UserStats,
    pub weekly: Vec<ChartDay>,
}

// -- Notifications --

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread_count: u64,
}

/// Result of a scheduler pass (`/notifications/tick` and `/notifications/schedule`).
#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub success: bool,
    pub notifications_created: usize,
    pub habits: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unread_count: Option<u64>,
}
