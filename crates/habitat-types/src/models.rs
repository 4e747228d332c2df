use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// Notification kind written by the reminder scheduler.
pub const REMINDER_KIND: &str = "reminder";

/// Palette shared by habits and categories.
pub const COLORS: &[&str] = &["purple", "pink", "blue", "green", "orange", "teal", "red", "yellow"];

pub fn is_known_color(color: &str) -> bool {
    COLORS.contains(&color)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Set of weekdays indexed Monday=0 .. Sunday=6.
///
/// Serialised as a JSON array of indices, which is also how the habits table
/// stores `active_days`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<u8>", into = "Vec<u8>")]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const EMPTY: Self = Self(0);

    /// Indices outside 0..=6 are dropped.
    pub fn from_indices<I>(indices: I) -> Self
    where
        I: IntoIterator<Item = u8>,
    {
        let mut bits = 0u8;
        for idx in indices {
            if idx < 7 {
                bits |= 1 << idx;
            }
        }
        Self(bits)
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn indices(&self) -> Vec<u8> {
        (0..7).filter(|idx| self.0 & (1 << idx) != 0).collect()
    }
}

impl From<Vec<u8>> for WeekdaySet {
    fn from(indices: Vec<u8>) -> Self {
        Self::from_indices(indices)
    }
}

impl From<WeekdaySet> for Vec<u8> {
    fn from(set: WeekdaySet) -> Self {
        set.indices()
    }
}

/// How often a habit comes due.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "activeDays", rename_all = "lowercase")]
pub enum Recurrence {
    Daily,
    /// Due every day of the ISO week until completed once that week.
    Weekly,
    Custom(WeekdaySet),
    /// A frequency string this build does not know. Treated as always due.
    Other(String),
}

impl Recurrence {
    /// Build from the stored `frequency` / `active_days` columns.
    ///
    /// Never fails: a `CUSTOM` habit whose `active_days` is missing or not a
    /// JSON array of integers gets an empty day set, so it is never due.
    pub fn from_record(frequency: &str, active_days: Option<&str>) -> Self {
        match frequency.trim().to_ascii_uppercase().as_str() {
            "DAILY" => Self::Daily,
            "WEEKLY" => Self::Weekly,
            "CUSTOM" => Self::Custom(parse_active_days(active_days)),
            _ => Self::Other(frequency.to_string()),
        }
    }

    /// Inverse of [`Recurrence::from_record`].
    pub fn as_record(&self) -> (String, Option<String>) {
        match self {
            Self::Daily => ("DAILY".into(), None),
            Self::Weekly => ("WEEKLY".into(), None),
            Self::Custom(days) => (
                "CUSTOM".into(),
                Some(serde_json::to_string(&days.indices()).unwrap_or_else(|_| "[]".into())),
            ),
            Self::Other(raw) => (raw.clone(), None),
        }
    }
}

fn parse_active_days(raw: Option<&str>) -> WeekdaySet {
    let Some(raw) = raw else {
        return WeekdaySet::EMPTY;
    };
    match serde_json::from_str::<Vec<i64>>(raw) {
        Ok(indices) => WeekdaySet::from_indices(
            indices
                .into_iter()
                .filter_map(|idx| u8::try_from(idx).ok()),
        ),
        Err(e) => {
            warn!("Unparsable active_days '{}': {}", raw, e);
            WeekdaySet::EMPTY
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub recurrence: Recurrence,
    /// Inclusive first due day. Falls back to the UTC day of `created_at`.
    pub start_date: Option<NaiveDate>,
    /// Inclusive last due day.
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub notifications_enabled: bool,
    pub category_id: Option<String>,
}

/// User-defined grouping of habits. Names are unique per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// Local wall-clock reminder as stored: `at_time` is "HH:MM".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub at_time: String,
    pub timezone: Option<String>,
}

/// One row per habit per UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionLog {
    pub habit_id: String,
    pub date: NaiveDate,
    pub done: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// JSON body stored in `Notification::payload` for reminders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderPayload {
    pub habit_id: String,
    pub habit_name: String,
    pub reminder_time: Option<String>,
    pub timezone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_with_garbage_active_days_is_empty() {
        let rec = Recurrence::from_record("CUSTOM", Some("mon,wed"));
        assert_eq!(rec, Recurrence::Custom(WeekdaySet::EMPTY));

        let rec = Recurrence::from_record("CUSTOM", None);
        assert_eq!(rec, Recurrence::Custom(WeekdaySet::EMPTY));
    }

    #[test]
    fn custom_drops_out_of_range_days() {
        let rec = Recurrence::from_record("custom", Some("[0, 2, 4, 7, -1]"));
        let Recurrence::Custom(days) = rec else {
            panic!("expected custom recurrence");
        };
        assert_eq!(days.indices(), vec![0, 2, 4]);
        assert!(days.contains(Weekday::Wed));
        assert!(!days.contains(Weekday::Sun));
    }

    #[test]
    fn unknown_frequency_is_kept_verbatim() {
        let rec = Recurrence::from_record("MONTHLY", None);
        assert_eq!(rec, Recurrence::Other("MONTHLY".into()));
        assert_eq!(rec.as_record(), ("MONTHLY".into(), None));
    }

    #[test]
    fn palette_lookup() {
        assert!(is_known_color("teal"));
        assert!(!is_known_color("Teal"));
        assert!(!is_known_color("magenta"));
    }

    #[test]
    fn payload_uses_camel_case_keys() {
        let payload = ReminderPayload {
            habit_id: "h1".into(),
            habit_name: "Read".into(),
            reminder_time: Some("07:00".into()),
            timezone: None,
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"habitId\":\"h1\""));
        assert!(json.contains("\"reminderTime\":\"07:00\""));
    }
}
