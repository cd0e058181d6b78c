//! Transformation of Cost Explorer buckets into CloudWatch metric records.

use std::collections::HashMap;

use chrono::{DateTime, NaiveTime, Utc};

use crate::contract::{CostBucket, Dimension, MetricRecord, MetricUnit};
use crate::windows::{backfill_timestamps, CostWindows};

pub const TOTAL_COST_METRIC: &str = "TotalCost";
pub const MONTH_TO_DATE_COST_METRIC: &str = "MonthToDateCost";
pub const DAILY_COST_HISTORY_METRIC: &str = "DailyCostHistory";
pub const SERVICE_COST_METRIC: &str = "ServiceCost";

pub const PROJECT_DIMENSION: &str = "Project";
pub const ENVIRONMENT_DIMENSION: &str = "Environment";
pub const DATE_DIMENSION: &str = "Date";
pub const SERVICE_NAME_DIMENSION: &str = "ServiceName";

const SERVICE_FRIENDLY_NAMES: &[(&str, &str)] = &[
    ("Amazon Elastic Container Service", "ECS"),
    ("Amazon Relational Database Service", "RDS"),
    ("Amazon Elastic Compute Cloud - Compute", "EC2"),
    ("Amazon Simple Storage Service", "S3"),
    ("AWS Amplify", "Amplify"),
    ("Amazon Virtual Private Cloud", "VPC"),
    ("AmazonCloudWatch", "CloudWatch"),
    ("AWS Lambda", "Lambda"),
    ("Amazon CloudFront", "CloudFront"),
];

pub fn friendly_service_name(service: &str) -> &str {
    SERVICE_FRIENDLY_NAMES
        .iter()
        .find(|(raw, _)| *raw == service)
        .map(|(_, friendly)| *friendly)
        .unwrap_or(service)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCost {
    pub service: String,
    pub amount: f64,
}

/// Sums each service over every bucket, keeping first-seen order, then maps
/// names to their dashboard label and drops non-positive totals.
pub fn service_cost_totals(buckets: &[CostBucket]) -> Vec<ServiceCost> {
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<&str, f64> = HashMap::new();

    for group in buckets.iter().flat_map(|bucket| bucket.groups.iter()) {
        let entry = totals.entry(group.key.as_str()).or_insert_with(|| {
            order.push(group.key.clone());
            0.0
        });
        *entry += group.amount;
    }

    order
        .into_iter()
        .filter_map(|service| {
            let amount = totals.get(service.as_str()).copied().unwrap_or_default();
            (amount > 0.0).then(|| ServiceCost {
                service: friendly_service_name(&service).to_string(),
                amount,
            })
        })
        .collect()
}

/// Fixed dimensions and namespace shared by every published cost metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricContext {
    pub project_name: String,
    pub environment: String,
}

impl MetricContext {
    pub fn namespace(&self) -> String {
        format!("{}/Costs", self.project_name.to_uppercase())
    }

    pub fn record(
        &self,
        name: &str,
        value: f64,
        timestamp: DateTime<Utc>,
        extra_dimensions: Vec<Dimension>,
    ) -> MetricRecord {
        let mut dimensions = vec![
            Dimension::new(PROJECT_DIMENSION, self.project_name.clone()),
            Dimension::new(ENVIRONMENT_DIMENSION, self.environment.clone()),
        ];
        dimensions.extend(extra_dimensions);
        MetricRecord {
            name: name.to_string(),
            value,
            unit: MetricUnit::None,
            timestamp,
            dimensions,
        }
    }

    fn service_records(
        &self,
        services: &[CostBucket],
        now: DateTime<Utc>,
    ) -> impl Iterator<Item = MetricRecord> + '_ {
        service_cost_totals(services).into_iter().map(move |cost| {
            self.record(
                SERVICE_COST_METRIC,
                cost.amount,
                now,
                vec![Dimension::new(SERVICE_NAME_DIMENSION, cost.service)],
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledCostMetrics {
    pub records: Vec<MetricRecord>,
    pub latest_total: Option<f64>,
    pub month_to_date_total: f64,
}

/// Builds the scheduled exporter's metric set: the latest day's `TotalCost`,
/// `MonthToDateCost`, one `TotalCost` per day stamped at that day, and the
/// per-service breakdown.
pub fn scheduled_cost_records(
    context: &MetricContext,
    now: DateTime<Utc>,
    windows: &CostWindows,
    daily: &[CostBucket],
    services: &[CostBucket],
    month_to_date: &[CostBucket],
) -> ScheduledCostMetrics {
    let mut records = Vec::new();

    let latest = daily
        .iter()
        .find(|bucket| bucket.start == windows.latest_day.start)
        .or_else(|| daily.last());
    if let Some(bucket) = latest {
        records.push(context.record(TOTAL_COST_METRIC, bucket.total, now, Vec::new()));
    }

    let month_to_date_total: f64 = month_to_date.iter().map(|bucket| bucket.total).sum();
    records.push(context.record(
        MONTH_TO_DATE_COST_METRIC,
        month_to_date_total,
        now,
        Vec::new(),
    ));

    records.extend(daily.iter().map(|bucket| {
        context.record(
            TOTAL_COST_METRIC,
            bucket.total,
            start_of_day(bucket),
            Vec::new(),
        )
    }));

    records.extend(context.service_records(services, now));

    ScheduledCostMetrics {
        records,
        latest_total: latest.map(|bucket| bucket.total),
        month_to_date_total,
    }
}

/// Builds the backfill metric set: `DailyCostHistory` per day, re-stamped onto the
/// trailing week ending at `now`, plus the per-service breakdown.
pub fn backfill_cost_records(
    context: &MetricContext,
    now: DateTime<Utc>,
    daily: &[CostBucket],
    services: &[CostBucket],
) -> Vec<MetricRecord> {
    let mut records: Vec<MetricRecord> = daily
        .iter()
        .zip(backfill_timestamps(now, daily.len()))
        .map(|(bucket, timestamp)| {
            context.record(
                DAILY_COST_HISTORY_METRIC,
                bucket.total,
                timestamp,
                vec![Dimension::new(
                    DATE_DIMENSION,
                    bucket.start.format("%Y-%m-%d").to_string(),
                )],
            )
        })
        .collect();
    records.extend(context.service_records(services, now));
    records
}

fn start_of_day(bucket: &CostBucket) -> DateTime<Utc> {
    bucket.start.and_time(NaiveTime::MIN).and_utc()
}
