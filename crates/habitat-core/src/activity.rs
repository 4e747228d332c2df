use std::collections::BTreeSet;

use chrono::{Datelike, Days, NaiveDate};

use habitat_types::models::{Habit, Recurrence};

/// First day the habit can be due: `start_date`, else the UTC day it was created.
pub fn habit_start(habit: &Habit) -> NaiveDate {
    habit
        .start_date
        .unwrap_or_else(|| habit.created_at.date_naive())
}

/// Whether `habit` is due on `date`.
///
/// `completions` holds the days the habit was marked done. Only the weekly
/// branch looks at it, and only at days strictly before `date` in the same
/// Monday-start week, so the result does not depend on what "today" is.
pub fn is_active_on(habit: &Habit, date: NaiveDate, completions: &BTreeSet<NaiveDate>) -> bool {
    if date < habit_start(habit) {
        return false;
    }
    if let Some(end) = habit.end_date {
        if date > end {
            return false;
        }
    }

    match &habit.recurrence {
        Recurrence::Daily => true,
        Recurrence::Weekly => !completed_earlier_in_week(completions, week_start(date), date),
        Recurrence::Custom(days) => days.contains(date.weekday()),
        Recurrence::Other(_) => true,
    }
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let back = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(back)).unwrap_or(date)
}

/// Whether any completion falls in `[week_start, before)`.
pub fn completed_earlier_in_week(
    completions: &BTreeSet<NaiveDate>,
    week_start: NaiveDate,
    before: NaiveDate,
) -> bool {
    if week_start >= before {
        return false;
    }
    completions.range(week_start..before).next().is_some()
}
