#![allow(dead_code)]

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use ops_jobs_core::contract::{CostBucket, CostGroup};

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 20, 14, 7, 42)
        .single()
        .expect("valid timestamp")
}

/// Env-style lookup over fixed pairs, for the `from_lookup` constructors.
pub fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let values: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    move |name: &str| values.get(name).cloned()
}

pub fn day_bucket(start: NaiveDate, total: f64) -> CostBucket {
    CostBucket {
        start,
        total,
        groups: Vec::new(),
    }
}

pub fn service_bucket(start: NaiveDate, services: &[(&str, f64)]) -> CostBucket {
    CostBucket {
        start,
        total: services.iter().map(|(_, amount)| amount).sum(),
        groups: services
            .iter()
            .map(|(key, amount)| CostGroup {
                key: key.to_string(),
                amount: *amount,
            })
            .collect(),
    }
}

/// Seven daily buckets ending the day before `now`, costing 10, 11, ..., 16.
pub fn trailing_week_costs(now: DateTime<Utc>) -> Vec<CostBucket> {
    let today = now.date_naive();
    (0..7)
        .map(|offset| {
            day_bucket(
                today - TimeDelta::days(7 - offset),
                10.0 + offset as f64,
            )
        })
        .collect()
}
