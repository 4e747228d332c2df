use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use habitat_types::models::Reminder;

use crate::error::{CoreError, Result};
use crate::timezone::{self, DEFAULT_TIMEZONE};

/// Wall-clock time used for habits without a reminder.
pub const DEFAULT_REMINDER_TIME: &str = "08:00";

/// A configured reminder fires this many minutes before the habit's time.
pub const LEAD_MINUTES: i64 = 20;

/// How long after `notify_at` a late scheduler run may still fire.
pub const GRACE_HOURS: i64 = 2;

pub fn parse_at_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| CoreError::InvalidReminderTime(raw.to_string()))
}

/// The span of instants during which a reminder may be emitted today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderWindow {
    pub notify_at: DateTime<Utc>,
    /// Nominal habit time. `None` for the default 08:00 reminder.
    pub due_at: Option<DateTime<Utc>>,
    pub closes_at: DateTime<Utc>,
}

impl ReminderWindow {
    /// Window for the reminder's local calendar day at `now`.
    ///
    /// The wall-clock time is placed on the day `now` falls on in the
    /// reminder's zone, so the offset is the one in force at that time.
    pub fn compute(now: DateTime<Utc>, reminder: Option<&Reminder>) -> Result<Self> {
        match reminder {
            Some(reminder) => {
                let at = parse_at_time(&reminder.at_time)?;
                let tz = timezone::resolve(reminder.timezone.as_deref());
                let due_at = local_instant(now, tz, at)?;
                let notify_at = due_at - Duration::minutes(LEAD_MINUTES);
                let closes_at = due_at.min(notify_at + Duration::hours(GRACE_HOURS));
                Ok(Self {
                    notify_at,
                    due_at: Some(due_at),
                    closes_at,
                })
            }
            None => {
                let at = parse_at_time(DEFAULT_REMINDER_TIME)?;
                let notify_at = local_instant(now, DEFAULT_TIMEZONE, at)?;
                Ok(Self {
                    notify_at,
                    due_at: None,
                    closes_at: notify_at + Duration::hours(GRACE_HOURS),
                })
            }
        }
    }

    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.notify_at <= now && now <= self.closes_at
    }

    /// `contains(now)` and `now` falls on the same `day_zone` calendar day as `notify_at`.
    pub fn fires_at(&self, now: DateTime<Utc>, day_zone: Tz) -> bool {
        let same_day = self.notify_at.with_timezone(&day_zone).date_naive()
            == now.with_timezone(&day_zone).date_naive();
        same_day && self.contains(now)
    }
}

/// Whether a reminder should be emitted at `now`.
///
/// `day_zone` is the zone whose calendar day counts as "today" for the server.
pub fn should_fire_now(now: DateTime<Utc>, reminder: Option<&Reminder>, day_zone: Tz) -> Result<bool> {
    Ok(ReminderWindow::compute(now, reminder)?.fires_at(now, day_zone))
}

/// `at` on the day `now` falls on in `tz`, as a UTC instant.
///
/// A time skipped by a DST jump is placed with the offset in force at `now`.
fn local_instant(now: DateTime<Utc>, tz: Tz, at: NaiveTime) -> Result<DateTime<Utc>> {
    let day = now.with_timezone(&tz).date_naive();
    let local = day.and_time(at);
    if let Some(instant) = tz.from_local_datetime(&local).earliest() {
        return Ok(instant.with_timezone(&Utc));
    }
    local
        .and_utc()
        .checked_sub_signed(Duration::minutes(i64::from(timezone::offset_minutes(now, tz))))
        .ok_or(CoreError::DateOutOfRange(day))
}
