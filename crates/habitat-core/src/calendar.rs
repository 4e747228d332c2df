use chrono::{Datelike, Days, NaiveDate};

use habitat_types::api::CalendarDay;

use crate::activity::week_start;
use crate::error::{CoreError, Result};
use crate::stats::HabitHistory;

/// Days shown for a month: Monday-first, padded with the neighbouring
/// months' days to whole weeks. The flag is true for days inside the month.
pub fn month_grid(year: i32, month: u32) -> Result<Vec<(NaiveDate, bool)>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or(CoreError::InvalidMonth { year, month })?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or(CoreError::DateOutOfRange(first))?;
    let last = next_first.pred_opt().ok_or(CoreError::DateOutOfRange(first))?;

    let grid_start = week_start(first);
    let tail = 6 - u64::from(last.weekday().num_days_from_monday());
    let grid_end = last
        .checked_add_days(Days::new(tail))
        .ok_or(CoreError::DateOutOfRange(last))?;

    Ok(grid_start
        .iter_days()
        .take_while(|d| *d <= grid_end)
        .map(|d| (d, d.month() == month && d.year() == year))
        .collect())
}

/// Month grid annotated with which habits were due and completed each day.
pub fn month_view(histories: &[HabitHistory], year: i32, month: u32) -> Result<Vec<CalendarDay>> {
    Ok(month_grid(year, month)?
        .into_iter()
        .map(|(date, in_month)| CalendarDay {
            date,
            in_month,
            due: histories
                .iter()
                .filter(|h| h.is_due(date))
                .map(|h| h.habit.id.clone())
                .collect(),
            completed: histories
                .iter()
                .filter(|h| h.completed_on(date))
                .map(|h| h.habit.id.clone())
                .collect(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::tests::{day, habit};
    use habitat_types::models::{Recurrence, WeekdaySet};

    #[test]
    fn grid_pads_to_whole_weeks() {
        // March 2024 starts on a Friday and ends on a Sunday.
        let grid = month_grid(2024, 3).unwrap();
        assert_eq!(grid.len(), 35);
        assert_eq!(grid[0], (day(2024, 2, 26), false));
        assert_eq!(grid[4], (day(2024, 3, 1), true));
        assert_eq!(grid.last().copied(), Some((day(2024, 3, 31), true)));
        assert_eq!(grid.iter().filter(|(_, in_month)| *in_month).count(), 31);
    }

    #[test]
    fn grid_for_month_starting_monday() {
        // January 2024 starts on a Monday and ends on a Wednesday.
        let grid = month_grid(2024, 1).unwrap();
        assert_eq!(grid[0], (day(2024, 1, 1), true));
        assert_eq!(grid.last().copied(), Some((day(2024, 2, 4), false)));
        assert_eq!(grid.len() % 7, 0);
    }

    #[test]
    fn december_rolls_into_next_year() {
        let grid = month_grid(2024, 12).unwrap();
        assert_eq!(grid.len() % 7, 0);
        assert!(grid.iter().any(|(d, _)| *d == day(2025, 1, 5)));
    }

    #[test]
    fn invalid_month_is_rejected() {
        assert!(matches!(month_grid(2024, 13), Err(CoreError::InvalidMonth { .. })));
    }

    #[test]
    fn view_marks_due_and_completed() {
        let mut h = habit(Recurrence::Custom(WeekdaySet::from_indices([2])));
        h.id = "wed".into();
        let history = HabitHistory {
            habit: h,
            completions: [day(2024, 1, 10)].into_iter().collect(),
        };
        let view = month_view(&[history], 2024, 1).unwrap();

        let wed = view.iter().find(|d| d.date == day(2024, 1, 10)).unwrap();
        assert_eq!(wed.due, vec!["wed".to_string()]);
        assert_eq!(wed.completed, vec!["wed".to_string()]);

        let thu = view.iter().find(|d| d.date == day(2024, 1, 11)).unwrap();
        assert!(thu.due.is_empty());
        assert!(thu.completed.is_empty());
    }
}
