use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use habitat_core::activity::week_start;
use habitat_core::{HabitCandidate, NotificationScheduler, SchedulerConfig};
use habitat_db::Database;
use habitat_types::models::CompletionLog;

/// Load every notifiable habit (of `user_id`, or of all users) with its
/// reminder and this ISO week's logs, then run one scheduler pass.
///
/// Returns the ids of habits a reminder was created for.
pub fn run_schedule(
    db: &Database,
    config: SchedulerConfig,
    user_id: Option<&str>,
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<String>> {
    let today = config.day_of(now);
    let habits = db.list_notifiable_habits(user_id)?;
    if habits.is_empty() {
        return Ok(vec![]);
    }

    let ids: Vec<String> = habits.iter().map(|h| h.id.clone()).collect();
    let mut reminders = db.get_reminders(&ids)?;
    let mut logs: HashMap<String, Vec<CompletionLog>> = HashMap::new();
    for log in db.logs_between(&ids, week_start(today), today)? {
        logs.entry(log.habit_id.clone()).or_default().push(log);
    }

    let candidates: Vec<HabitCandidate> = habits
        .into_iter()
        .map(|habit| HabitCandidate {
            reminder: reminders.remove(&habit.id),
            logs: logs.remove(&habit.id).unwrap_or_default(),
            habit,
        })
        .collect();

    debug!(count = candidates.len(), "Evaluating reminder candidates");
    let scheduler = NotificationScheduler::new(db, config);
    Ok(scheduler.tick(user_id, &candidates, now))
}
