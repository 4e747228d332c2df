use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};

use habitat_types::api::{ChartDay, TodaySummary, UserStats};
use habitat_types::models::Habit;

use crate::activity::is_active_on;
use crate::streak::{longest_streak, streak, DEFAULT_LOOKBACK};

/// A habit together with every day it was completed.
#[derive(Debug, Clone)]
pub struct HabitHistory {
    pub habit: Habit,
    pub completions: BTreeSet<NaiveDate>,
}

impl HabitHistory {
    pub fn is_due(&self, date: NaiveDate) -> bool {
        is_active_on(&self.habit, date, &self.completions)
    }

    pub fn completed_on(&self, date: NaiveDate) -> bool {
        self.completions.contains(&date)
    }

    pub fn streak(&self, today: NaiveDate) -> u32 {
        streak(&self.completions, today, DEFAULT_LOOKBACK)
    }
}

/// Completion ratio over the habits due `today`.
pub fn today_summary(histories: &[HabitHistory], today: NaiveDate) -> TodaySummary {
    let due: Vec<&HabitHistory> = histories.iter().filter(|h| h.is_due(today)).collect();
    let completed = due.iter().filter(|h| h.completed_on(today)).count();
    TodaySummary {
        completed,
        total: due.len(),
        percentage: percentage(completed, due.len()),
    }
}

pub fn user_stats(histories: &[HabitHistory], today: NaiveDate) -> UserStats {
    let summary = today_summary(histories, today);
    UserStats {
        total_habits: histories.len(),
        completed_today: summary.completed,
        current_streak: histories.iter().map(|h| h.streak(today)).max().unwrap_or(0),
        longest_streak: histories
            .iter()
            .map(|h| longest_streak(&h.completions))
            .max()
            .unwrap_or(0),
        completion_rate: summary.percentage,
        total_completed: histories.iter().map(|h| h.completions.len()).sum(),
    }
}

/// The seven days ending at `today`, oldest first.
pub fn weekly_chart(histories: &[HabitHistory], today: NaiveDate) -> Vec<ChartDay> {
    (0..7u64)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .map(|date| ChartDay {
            date,
            completed: histories.iter().filter(|h| h.completed_on(date)).count(),
            total: histories.iter().filter(|h| h.is_due(date)).count(),
        })
        .collect()
}

fn percentage(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as u32
}
