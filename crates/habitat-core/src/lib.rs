//! Habit scheduling engine.
//!
//! Decides whether a habit is due on a given day, counts streaks, and decides
//! when a reminder notification should be emitted. Nothing in this crate reads
//! the wall clock: callers pass `today` or `now` explicitly.

pub mod activity;
pub mod calendar;
pub mod error;
pub mod reminder;
pub mod scheduler;
pub mod stats;
pub mod streak;
pub mod timezone;

pub use error::{CoreError, Result};
pub use scheduler::{
    HabitCandidate, NewReminder, NotificationScheduler, NotificationStore, ReminderDecision,
    SchedulerConfig,
};
pub use stats::HabitHistory;
