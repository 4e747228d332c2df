use std::collections::BTreeSet;

use chrono::NaiveDate;

/// How many days [`streak`] walks back by default.
pub const DEFAULT_LOOKBACK: u32 = 365;

/// Consecutive completed days ending at `reference`.
///
/// Counts calendar days for every recurrence, weekly habits included.
/// Returns 0 when `reference` itself is not completed.
pub fn streak(completions: &BTreeSet<NaiveDate>, reference: NaiveDate, max_lookback: u32) -> u32 {
    let mut count = 0;
    let mut day = reference;
    while count < max_lookback && completions.contains(&day) {
        count += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    count
}

/// Longest run of consecutive completed days anywhere in the history.
pub fn longest_streak(completions: &BTreeSet<NaiveDate>) -> u32 {
    let mut best = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;

    for &day in completions {
        run = match prev {
            Some(p) if p.succ_opt() == Some(day) => run + 1,
            _ => 1,
        };
        best = best.max(run);
        prev = Some(day);
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn counts_run_ending_today() {
        let today = day(2024, 5, 10);
        let done = BTreeSet::from([day(2024, 5, 10), day(2024, 5, 9), day(2024, 5, 8), day(2024, 5, 6)]);
        assert_eq!(streak(&done, today, DEFAULT_LOOKBACK), 3);
    }

    #[test]
    fn empty_history_is_zero() {
        assert_eq!(streak(&BTreeSet::new(), day(2024, 5, 10), DEFAULT_LOOKBACK), 0);
    }

    #[test]
    fn missing_reference_day_is_zero() {
        let done = BTreeSet::from([day(2024, 5, 9), day(2024, 5, 8)]);
        assert_eq!(streak(&done, day(2024, 5, 10), DEFAULT_LOOKBACK), 0);
    }

    #[test]
    fn lookback_caps_the_walk() {
        let today = day(2024, 5, 10);
        let done: BTreeSet<NaiveDate> = day(2024, 4, 1).iter_days().take_while(|d| *d <= today).collect();
        assert_eq!(streak(&done, today, 7), 7);
        assert_eq!(streak(&done, today, DEFAULT_LOOKBACK), done.len() as u32);
    }

    #[test]
    fn longest_run_across_gaps() {
        let done = BTreeSet::from([
            day(2024, 1, 1),
            day(2024, 1, 2),
            day(2024, 1, 5),
            day(2024, 1, 6),
            day(2024, 1, 7),
            day(2024, 1, 9),
        ]);
        assert_eq!(longest_streak(&done), 3);
        assert_eq!(longest_streak(&BTreeSet::new()), 0);
    }

    #[test]
    fn longest_run_crosses_month_boundary() {
        let done = BTreeSet::from([day(2024, 2, 28), day(2024, 2, 29), day(2024, 3, 1)]);
        assert_eq!(longest_streak(&done), 3);
    }
}
