use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Timelike, Utc};

use crate::contract::{CostWindow, Granularity, TimeRange};

pub const TRAILING_WEEK_DAYS: i64 = 7;

/// The full clock hour before `now`: `[hh-1:00, hh:00)`.
pub fn previous_hour(now: DateTime<Utc>) -> TimeRange {
    let to = now
        - TimeDelta::minutes(i64::from(now.minute()))
        - TimeDelta::seconds(i64::from(now.second()))
        - TimeDelta::nanoseconds(i64::from(now.nanosecond()));
    TimeRange {
        from: to - TimeDelta::hours(1),
        to,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostWindows {
    pub latest_day: CostWindow,
    pub trailing_week: CostWindow,
    pub month_to_date: CostWindow,
}

impl CostWindows {
    pub fn ending(today: NaiveDate) -> Self {
        Self {
            latest_day: CostWindow {
                start: today - TimeDelta::days(1),
                end: today,
                granularity: Granularity::Daily,
            },
            trailing_week: trailing_week(today),
            month_to_date: CostWindow {
                start: first_of_month(today),
                end: today,
                granularity: Granularity::Monthly,
            },
        }
    }
}

pub fn trailing_week(today: NaiveDate) -> CostWindow {
    CostWindow {
        start: today - TimeDelta::days(TRAILING_WEEK_DAYS),
        end: today,
        granularity: Granularity::Daily,
    }
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - TimeDelta::days(i64::from(date.day0()))
}

/// Stamps the i-th of `count` points at `now - (6 - i)` days, so a full week ends at `now`.
pub fn backfill_timestamps(now: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
    (0..count)
        .map(|index| now - TimeDelta::days(TRAILING_WEEK_DAYS - 1 - index as i64))
        .collect()
}
