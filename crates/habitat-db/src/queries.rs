use std::collections::{BTreeSet, HashMap};

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::types::ToSql;
use rusqlite::{Connection, Row};
use tracing::warn;
use uuid::Uuid;

use habitat_types::models::{CompletionLog, Habit, Reminder};

use crate::Database;
use crate::models::{HabitRow, LogRow, UserRow, format_date, format_timestamp};

const HABIT_COLUMNS: &str = "id, user_id, name, description, color, frequency, active_days, \
                             start_date, end_date, notifications_enabled, created_at, category_id";

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, email: &str, name: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, name, password) VALUES (?1, ?2, ?3, ?4)",
                (id, email, name, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Habits --

    pub fn create_habit(&self, habit: &Habit, reminder: Option<&Reminder>) -> Result<()> {
        let (frequency, active_days) = habit.recurrence.as_record();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                &format!("INSERT INTO habits ({HABIT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"),
                rusqlite::params![
                    habit.id,
                    habit.user_id,
                    habit.name,
                    habit.description,
                    habit.color,
                    frequency,
                    active_days,
                    habit.start_date.map(format_date),
                    habit.end_date.map(format_date),
                    habit.notifications_enabled,
                    format_timestamp(habit.created_at),
                    habit.category_id,
                ],
            )?;
            write_reminder(&tx, &habit.id, reminder)?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Updates the mutable fields of a habit owned by `habit.user_id` and
    /// replaces its reminder. Returns false if no such habit exists.
    pub fn update_habit(&self, habit: &Habit, reminder: Option<&Reminder>) -> Result<bool> {
        let (frequency, active_days) = habit.recurrence.as_record();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE habits
                 SET name = ?3, description = ?4, color = ?5, frequency = ?6, active_days = ?7,
                     start_date = ?8, end_date = ?9, notifications_enabled = ?10, category_id = ?11
                 WHERE id = ?1 AND user_id = ?2",
                rusqlite::params![
                    habit.id,
                    habit.user_id,
                    habit.name,
                    habit.description,
                    habit.color,
                    frequency,
                    active_days,
                    habit.start_date.map(format_date),
                    habit.end_date.map(format_date),
                    habit.notifications_enabled,
                    habit.category_id,
                ],
            )?;
            if changed == 0 {
                return Ok(false);
            }
            write_reminder(&tx, &habit.id, reminder)?;
            tx.commit()?;
            Ok(true)
        })
    }

    /// Deletes a habit together with its reminder and logs.
    pub fn delete_habit(&self, user_id: &str, habit_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM habits WHERE id = ?1 AND user_id = ?2",
                (habit_id, user_id),
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_habit(&self, user_id: &str, habit_id: &str) -> Result<Option<Habit>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {HABIT_COLUMNS} FROM habits WHERE id = ?1 AND user_id = ?2"),
                    (habit_id, user_id),
                    habit_row,
                )
                .optional()?;
            row.map(HabitRow::into_habit).transpose()
        })
    }

    /// All habits of a user, oldest first. Rows that fail to convert are
    /// logged and skipped.
    pub fn list_habits(&self, user_id: &str) -> Result<Vec<Habit>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {HABIT_COLUMNS} FROM habits WHERE user_id = ?1 ORDER BY created_at"
            ))?;
            let rows = stmt
                .query_map([user_id], habit_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(convert_habits(rows))
        })
    }

    /// Habits with notifications enabled, for one user or for everyone.
    pub fn list_notifiable_habits(&self, user_id: Option<&str>) -> Result<Vec<Habit>> {
        self.with_conn(|conn| {
            let mut sql = format!("SELECT {HABIT_COLUMNS} FROM habits WHERE notifications_enabled = 1");
            let mut params: Vec<&dyn ToSql> = Vec::new();
            if let Some(user_id) = &user_id {
                sql.push_str(" AND user_id = ?1");
                params.push(user_id);
            }
            sql.push_str(" ORDER BY created_at");

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params.as_slice(), habit_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(convert_habits(rows))
        })
    }

    // -- Reminders --

    pub fn get_reminders(&self, habit_ids: &[String]) -> Result<HashMap<String, Reminder>> {
        if habit_ids.is_empty() {
            return Ok(HashMap::new());
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT habit_id, at_time, timezone FROM reminders WHERE habit_id IN ({})",
                placeholders(habit_ids.len(), 1)
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(to_params(habit_ids).as_slice(), |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        Reminder {
                            at_time: row.get(1)?,
                            timezone: row.get(2)?,
                        },
                    ))
                })?
                .collect::<std::result::Result<HashMap<_, _>, _>>()?;
            Ok(rows)
        })
    }

    // -- Completion logs --

    /// Flips the completion state of a habit on `date`: a missing row becomes
    /// done, a done row is removed, a not-done row becomes done. Returns the
    /// resulting state.
    pub fn toggle_log(&self, habit_id: &str, date: NaiveDate) -> Result<bool> {
        let date = format_date(date);
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let existing: Option<(String, bool)> = tx
                .query_row(
                    "SELECT id, done FROM habit_logs WHERE habit_id = ?1 AND date = ?2",
                    (habit_id, &date),
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let done = match existing {
                Some((id, true)) => {
                    tx.execute("DELETE FROM habit_logs WHERE id = ?1", [&id])?;
                    false
                }
                Some((id, false)) => {
                    tx.execute("UPDATE habit_logs SET done = 1 WHERE id = ?1", [&id])?;
                    true
                }
                None => {
                    tx.execute(
                        "INSERT INTO habit_logs (id, habit_id, date, done) VALUES (?1, ?2, ?3, 1)",
                        (Uuid::new_v4().to_string(), habit_id, &date),
                    )?;
                    true
                }
            };
            tx.commit()?;
            Ok(done)
        })
    }

    /// Logs for the given habits with `from <= date <= to`.
    pub fn logs_between(
        &self,
        habit_ids: &[String],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CompletionLog>> {
        if habit_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let n = habit_ids.len();
            let sql = format!(
                "SELECT habit_id, date, done FROM habit_logs
                 WHERE habit_id IN ({}) AND date >= ?{} AND date <= ?{}
                 ORDER BY date",
                placeholders(n, 1),
                n + 1,
                n + 2
            );
            let (from, to) = (format_date(from), format_date(to));
            let mut params = to_params(habit_ids);
            params.push(&from);
            params.push(&to);

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params.as_slice(), log_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(LogRow::into_log).collect()
        })
    }

    /// Every day each habit was completed.
    pub fn completions_for_habits(
        &self,
        habit_ids: &[String],
    ) -> Result<HashMap<String, BTreeSet<NaiveDate>>> {
        if habit_ids.is_empty() {
            return Ok(HashMap::new());
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT habit_id, date, done FROM habit_logs WHERE done = 1 AND habit_id IN ({})",
                placeholders(habit_ids.len(), 1)
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(to_params(habit_ids).as_slice(), log_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut completions: HashMap<String, BTreeSet<NaiveDate>> = HashMap::new();
            for row in rows {
                let log = row.into_log()?;
                completions.entry(log.habit_id).or_default().insert(log.date);
            }
            Ok(completions)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, email, name, password, created_at FROM users WHERE {column} = ?1"
    ))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                name: row.get(2)?,
                password: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn write_reminder(conn: &Connection, habit_id: &str, reminder: Option<&Reminder>) -> Result<()> {
    match reminder {
        Some(reminder) => {
            conn.execute(
                "INSERT INTO reminders (habit_id, at_time, timezone) VALUES (?1, ?2, ?3)
                 ON CONFLICT(habit_id) DO UPDATE SET at_time = excluded.at_time, timezone = excluded.timezone",
                (habit_id, &reminder.at_time, &reminder.timezone),
            )?;
        }
        None => {
            conn.execute("DELETE FROM reminders WHERE habit_id = ?1", [habit_id])?;
        }
    }
    Ok(())
}

fn habit_row(row: &Row<'_>) -> rusqlite::Result<HabitRow> {
    Ok(HabitRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        color: row.get(4)?,
        frequency: row.get(5)?,
        active_days: row.get(6)?,
        start_date: row.get(7)?,
        end_date: row.get(8)?,
        notifications_enabled: row.get(9)?,
        created_at: row.get(10)?,
        category_id: row.get(11)?,
    })
}

fn log_row(row: &Row<'_>) -> rusqlite::Result<LogRow> {
    Ok(LogRow {
        habit_id: row.get(0)?,
        date: row.get(1)?,
        done: row.get(2)?,
    })
}

fn convert_habits(rows: Vec<HabitRow>) -> Vec<Habit> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            match row.into_habit() {
                Ok(habit) => Some(habit),
                Err(e) => {
                    warn!(habit_id = %id, "Skipping malformed habit row: {:#}", e);
                    None
                }
            }
        })
        .collect()
}

/// `?{first}, ?{first+1}, ...` for an `IN (...)` clause of `n` values.
pub(crate) fn placeholders(n: usize, first: usize) -> String {
    (first..first + n)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn to_params(values: &[String]) -> Vec<&dyn ToSql> {
    values.iter().map(|v| v as &dyn ToSql).collect()
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
