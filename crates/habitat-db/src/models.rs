//! Database row types. These map directly to SQLite rows and are converted
//! into `habitat-types` models at the edge of the crate.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use uuid::Uuid;

use habitat_types::models::{Category, CompletionLog, Habit, Notification, Recurrence, User};

const DATE_FORMAT: &str = "%Y-%m-%d";
const SQLITE_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub password: String,
    pub created_at: String,
}

impl UserRow {
    pub fn into_user(self) -> Result<User> {
        Ok(User {
            id: Uuid::parse_str(&self.id).with_context(|| format!("user id '{}'", self.id))?,
            email: self.email,
            name: self.name,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

pub struct HabitRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub frequency: String,
    pub active_days: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub notifications_enabled: bool,
    pub created_at: String,
    pub category_id: Option<String>,
}

impl HabitRow {
    /// Recurrence never fails to convert; malformed dates do.
    pub fn into_habit(self) -> Result<Habit> {
        let recurrence = Recurrence::from_record(&self.frequency, self.active_days.as_deref());
        let start_date = self.start_date.as_deref().map(parse_date).transpose()?;
        let end_date = self.end_date.as_deref().map(parse_date).transpose()?;
        let created_at = parse_timestamp(&self.created_at)?;

        Ok(Habit {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            description: self.description,
            color: self.color,
            recurrence,
            start_date,
            end_date,
            created_at,
            notifications_enabled: self.notifications_enabled,
            category_id: self.category_id,
        })
    }
}

pub struct CategoryRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub color: String,
    pub created_at: String,
}

impl CategoryRow {
    pub fn into_category(self) -> Result<Category> {
        Ok(Category {
            created_at: parse_timestamp(&self.created_at)?,
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            color: self.color,
        })
    }
}

pub struct LogRow {
    pub habit_id: String,
    pub date: String,
    pub done: bool,
}

impl LogRow {
    pub fn into_log(self) -> Result<CompletionLog> {
        Ok(CompletionLog {
            date: parse_date(&self.date)?,
            habit_id: self.habit_id,
            done: self.done,
        })
    }
}

pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub payload: String,
    pub read: bool,
    pub created_at: String,
}

impl NotificationRow {
    pub fn into_notification(self) -> Result<Notification> {
        Ok(Notification {
            created_at: parse_timestamp(&self.created_at)?,
            id: self.id,
            user_id: self.user_id,
            kind: self.kind,
            payload: self.payload,
            read: self.read,
        })
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).with_context(|| format!("invalid date '{}'", raw))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Accepts RFC 3339 and SQLite's `datetime('now')` format (implicitly UTC).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, SQLITE_DATETIME)
        .map(|naive| naive.and_utc())
        .with_context(|| format!("invalid timestamp '{}'", raw))
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_accept_both_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 7, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-05T07:30:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-05T08:30:00+01:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-05 07:30:00").unwrap(), expected);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn habit_row_with_bad_active_days_still_converts() {
        let row = HabitRow {
            id: "h1".into(),
            user_id: "u1".into(),
            name: "Stretch".into(),
            description: None,
            color: "green".into(),
            frequency: "CUSTOM".into(),
            active_days: Some("not json".into()),
            start_date: None,
            end_date: None,
            notifications_enabled: true,
            category_id: None,
            created_at: "2024-01-01T00:00:00Z".into(),
        };
        let habit = row.into_habit().unwrap();
        assert!(matches!(habit.recurrence, Recurrence::Custom(days) if days.is_empty()));
    }

    #[test]
    fn habit_row_with_bad_date_fails() {
        let row = HabitRow {
            id: "h1".into(),
            user_id: "u1".into(),
            name: "Stretch".into(),
            description: None,
            color: "green".into(),
            frequency: "DAILY".into(),
            active_days: None,
            start_date: Some("01/02/2024".into()),
            end_date: None,
            notifications_enabled: true,
            category_id: None,
            created_at: "2024-01-01T00:00:00Z".into(),
        };
        assert!(row.into_habit().is_err());
    }
}
