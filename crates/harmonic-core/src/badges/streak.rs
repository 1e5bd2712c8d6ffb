//! Consecutive-day participation streaks.
//!
//! Days are calendar dates (UTC). Multiple actions on one day count once.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};

/// Length of the run of active days ending today.
///
/// A run that ended yesterday still counts, so a user who has not acted yet
/// today keeps their streak until the day is over. Dates after `today` are
/// ignored.
pub fn current_streak(activity_dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = activity_dates
        .iter()
        .copied()
        .filter(|d| *d <= today)
        .collect();

    let mut cursor = if days.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };

    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        cursor -= Duration::days(1);
    }
    streak
}

/// Longest run of consecutive active days anywhere in the history.
pub fn longest_streak(activity_dates: &[NaiveDate]) -> u32 {
    let days: BTreeSet<NaiveDate> = activity_dates.iter().copied().collect();

    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for day in days {
        run = match previous {
            Some(p) if day - p == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(day);
    }
    longest
}
