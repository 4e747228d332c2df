use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use habitat_types::models::{CompletionLog, Habit, Reminder, ReminderPayload};

use crate::activity;
use crate::error::Result;
use crate::reminder::ReminderWindow;

/// Record-store operations the scheduler needs.
///
/// Existence is keyed by `(user_id, habit_id, day)` where `day` is the
/// server-zone calendar day the reminder was emitted on.
pub trait NotificationStore {
    fn reminder_exists(&self, user_id: &str, habit_id: &str, day: NaiveDate) -> anyhow::Result<bool>;
    fn create_reminder(&self, reminder: &NewReminder) -> anyhow::Result<()>;
}

impl<S: NotificationStore + ?Sized> NotificationStore for &S {
    fn reminder_exists(&self, user_id: &str, habit_id: &str, day: NaiveDate) -> anyhow::Result<bool> {
        (**self).reminder_exists(user_id, habit_id, day)
    }

    fn create_reminder(&self, reminder: &NewReminder) -> anyhow::Result<()> {
        (**self).create_reminder(reminder)
    }
}

/// A reminder notification to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReminder {
    pub user_id: String,
    pub habit_id: String,
    pub day: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub payload: ReminderPayload,
}

/// A habit as loaded for one scheduler pass.
#[derive(Debug, Clone)]
pub struct HabitCandidate {
    pub habit: Habit,
    pub reminder: Option<Reminder>,
    /// Logs from at least the current ISO week up to today.
    pub logs: Vec<CompletionLog>,
}

impl HabitCandidate {
    fn completions(&self) -> BTreeSet<NaiveDate> {
        self.logs.iter().filter(|log| log.done).map(|log| log.date).collect()
    }

    fn completed_on(&self, day: NaiveDate) -> bool {
        self.logs.iter().any(|log| log.done && log.date == day)
    }
}

/// Where a habit stands for today's reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderDecision {
    NotDue,
    CompletedToday,
    AlreadyNotified,
    WindowNotOpen,
    WindowClosed,
    Fire,
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Zone whose calendar day counts as "today" for de-duplication and the
    /// same-day firing check.
    pub day_zone: Tz,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            day_zone: chrono_tz::UTC,
        }
    }
}

impl SchedulerConfig {
    /// The calendar day a pass at `now` works on. Due, completed and
    /// already-notified checks all use this one day.
    pub fn day_of(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.day_zone).date_naive()
    }
}

pub struct NotificationScheduler<S> {
    store: S,
    config: SchedulerConfig,
}

impl<S: NotificationStore> NotificationScheduler<S> {
    pub fn new(store: S, config: SchedulerConfig) -> Self {
        Self { store, config }
    }

    /// Run one pass over `candidates`, emitting at most one reminder per
    /// habit per day. Returns the ids of habits that fired.
    ///
    /// `user_id` overrides each habit's owner as the notification recipient.
    /// A habit that fails to evaluate is logged and skipped.
    pub fn tick(
        &self,
        user_id: Option<&str>,
        candidates: &[HabitCandidate],
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let mut fired = Vec::new();

        for candidate in candidates {
            let recipient = user_id.unwrap_or(&candidate.habit.user_id);
            let outcome = self
                .evaluate(recipient, candidate, now)
                .and_then(|decision| {
                    if decision == ReminderDecision::Fire {
                        self.fire(recipient, candidate, now)?;
                    }
                    Ok(decision)
                });

            match outcome {
                Ok(ReminderDecision::Fire) => {
                    info!(habit_id = %candidate.habit.id, user_id = %recipient, "Reminder created");
                    fired.push(candidate.habit.id.clone());
                }
                Ok(decision) => {
                    debug!(habit_id = %candidate.habit.id, ?decision, "No reminder");
                }
                Err(e) => {
                    warn!(habit_id = %candidate.habit.id, "Skipping habit: {}", e);
                }
            }
        }

        fired
    }

    /// Decide what to do for one habit at `now` without writing anything.
    pub fn evaluate(
        &self,
        user_id: &str,
        candidate: &HabitCandidate,
        now: DateTime<Utc>,
    ) -> Result<ReminderDecision> {
        let today = self.config.day_of(now);

        if !activity::is_active_on(&candidate.habit, today, &candidate.completions()) {
            return Ok(ReminderDecision::NotDue);
        }
        if candidate.completed_on(today) {
            return Ok(ReminderDecision::CompletedToday);
        }
        if self
            .store
            .reminder_exists(user_id, &candidate.habit.id, today)?
        {
            return Ok(ReminderDecision::AlreadyNotified);
        }

        let window = ReminderWindow::compute(now, candidate.reminder.as_ref())?;
        if window.fires_at(now, self.config.day_zone) {
            Ok(ReminderDecision::Fire)
        } else if now < window.notify_at {
            Ok(ReminderDecision::WindowNotOpen)
        } else {
            Ok(ReminderDecision::WindowClosed)
        }
    }

    fn fire(&self, user_id: &str, candidate: &HabitCandidate, now: DateTime<Utc>) -> Result<()> {
        let reminder = candidate.reminder.as_ref();
        let new = NewReminder {
            user_id: user_id.to_string(),
            habit_id: candidate.habit.id.clone(),
            day: self.config.day_of(now),
            created_at: now,
            payload: ReminderPayload {
                habit_id: candidate.habit.id.clone(),
                habit_name: candidate.habit.name.clone(),
                reminder_time: reminder.map(|r| r.at_time.clone()),
                timezone: reminder.and_then(|r| r.timezone.clone()),
            },
        };
        self.store.create_reminder(&new)?;
        Ok(())
    }
}
