use anyhow::Result;
use chrono::NaiveDate;
use uuid::Uuid;

use habitat_core::{NewReminder, NotificationStore};
use habitat_types::models::{Notification, REMINDER_KIND};

use crate::Database;
use crate::models::{NotificationRow, format_date, format_timestamp};

/// Page size of the notification center.
pub const NOTIFICATION_PAGE: u32 = 50;

impl Database {
    /// Latest notifications for a user, newest first.
    pub fn list_notifications(&self, user_id: &str, limit: u32) -> Result<Vec<Notification>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, kind, payload, read, created_at
                 FROM notifications
                 WHERE user_id = ?1
                 ORDER BY created_at DESC
                 LIMIT ?2",
            )?;

            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], |row| {
                    Ok(NotificationRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        kind: row.get(2)?,
                        payload: row.get(3)?,
                        read: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(NotificationRow::into_notification).collect()
        })
    }

    pub fn mark_notification_read(&self, user_id: &str, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET read = 1 WHERE id = ?1 AND user_id = ?2",
                (id, user_id),
            )?;
            Ok(changed > 0)
        })
    }

    /// Returns how many notifications changed from unread to read.
    pub fn mark_all_read(&self, user_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0",
                [user_id],
            )?;
            Ok(changed)
        })
    }

    pub fn delete_notification(&self, user_id: &str, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM notifications WHERE id = ?1 AND user_id = ?2",
                (id, user_id),
            )?;
            Ok(changed > 0)
        })
    }

    pub fn unread_count(&self, user_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND read = 0",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(u64::try_from(count)?)
        })
    }
}

impl NotificationStore for Database {
    fn reminder_exists(&self, user_id: &str, habit_id: &str, day: NaiveDate) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(
                     SELECT 1 FROM notifications
                     WHERE user_id = ?1 AND habit_id = ?2 AND reminder_day = ?3 AND kind = ?4
                 )",
                (user_id, habit_id, format_date(day), REMINDER_KIND),
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    fn create_reminder(&self, reminder: &NewReminder) -> Result<()> {
        let payload = serde_json::to_string(&reminder.payload)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notifications (id, user_id, habit_id, kind, payload, reminder_day, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    Uuid::new_v4().to_string(),
                    reminder.user_id,
                    reminder.habit_id,
                    REMINDER_KIND,
                    payload,
                    format_date(reminder.day),
                    format_timestamp(reminder.created_at),
                ],
            )?;
            Ok(())
        })
    }
}
