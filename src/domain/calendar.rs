//! Weekly date sequence of a run.

use chrono::{Duration, NaiveDate};

pub const DAYS_PER_WEEK: i64 = 7;

/// `start`, `start + 7d`, ... up to and including `end`.
pub fn weekly_dates(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(Some(start), |d| d.checked_add_signed(Duration::days(DAYS_PER_WEEK)))
        .take_while(move |d| *d <= end)
}
