use ops_jobs_core::batching::compute_batch_plan;
use ops_jobs_core::contract::{
    CostBucket, CostQuery, CostWindow, GroupByDimension, JobResponse, MetricRecord,
    ValidationError,
};
use ops_jobs_core::cost::{backfill_cost_records, scheduled_cost_records, MetricContext};
use ops_jobs_core::windows::{trailing_week, CostWindows};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::adapters::clock::Clock;
use crate::adapters::cost_explorer::{CostApiError, CostQueryApi};
use crate::adapters::metrics::{MetricsApiError, MetricsPublisher};
use crate::config::CostMetricsConfig;

#[derive(Debug, Error)]
pub enum CostJobError {
    #[error("cost query for {window} failed: {source}")]
    Fetch {
        window: String,
        #[source]
        source: CostApiError,
    },
    #[error("publishing metric batch {batch_id} failed: {source}")]
    Publish {
        batch_id: usize,
        #[source]
        source: MetricsApiError,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Sends `records` in consecutive chunks of at most `batch_size`, stopping at the
/// first rejected chunk. Returns the number of publish calls made.
pub fn publish_in_batches(
    publisher: &impl MetricsPublisher,
    namespace: &str,
    records: &[MetricRecord],
    batch_size: usize,
) -> Result<usize, CostJobError> {
    let plan = compute_batch_plan(records.len(), batch_size)?;
    for batch in &plan {
        debug!(
            batch_id = batch.batch_id,
            records = batch.len(),
            namespace,
            "publishing metric batch"
        );
        publisher
            .put_metric_data(namespace, &records[batch.range()])
            .map_err(|source| {
                error!(batch_id = batch.batch_id, error = %source, "metric batch rejected");
                CostJobError::Publish {
                    batch_id: batch.batch_id,
                    source,
                }
            })?;
    }
    Ok(plan.len())
}

/// Scheduled run: queries the trailing week (daily and per service) and the
/// month to date, then publishes `TotalCost`, `MonthToDateCost` and
/// `ServiceCost`. Nothing is published unless every query succeeds.
pub fn run_scheduled_cost_export(
    config: &CostMetricsConfig,
    cost_api: &impl CostQueryApi,
    publisher: &impl MetricsPublisher,
    clock: &impl Clock,
) -> Result<JobResponse, CostJobError> {
    let now = clock.now();
    let windows = CostWindows::ending(now.date_naive());
    info!(
        latest_day = %windows.latest_day,
        trailing_week = %windows.trailing_week,
        month_to_date = %windows.month_to_date,
        "starting cost export"
    );

    let daily = fetch(cost_api, CostQuery::billable(windows.trailing_week))?;
    let services = fetch(
        cost_api,
        CostQuery::billable(windows.trailing_week).grouped_by(GroupByDimension::Service),
    )?;
    let month_to_date = if windows.month_to_date.is_empty() {
        debug!("month-to-date window is empty on the first of the month");
        Vec::new()
    } else {
        fetch(cost_api, CostQuery::billable(windows.month_to_date))?
    };

    let context = metric_context(config);
    let metrics = scheduled_cost_records(
        &context,
        now,
        &windows,
        &daily,
        &services,
        &month_to_date,
    );
    let batches = publish_in_batches(
        publisher,
        &context.namespace(),
        &metrics.records,
        config.batch_size,
    )?;

    let latest_total = metrics.latest_total.unwrap_or_default();
    info!(
        records = metrics.records.len(),
        batches,
        latest_total,
        month_to_date_total = metrics.month_to_date_total,
        "cost metrics published"
    );
    Ok(JobResponse::ok(format!(
        "Successfully published cost metrics. Total: ${latest_total:.2}"
    )))
}

/// One-off run: republishes the trailing week as `DailyCostHistory` with
/// timestamps ending now, plus the per-service breakdown.
pub fn run_cost_backfill(
    config: &CostMetricsConfig,
    cost_api: &impl CostQueryApi,
    publisher: &impl MetricsPublisher,
    clock: &impl Clock,
) -> Result<JobResponse, CostJobError> {
    let now = clock.now();
    let window = trailing_week(now.date_naive());
    info!(window = %window, "starting cost backfill");

    let daily = fetch(cost_api, CostQuery::billable(window))?;
    let services = fetch(
        cost_api,
        CostQuery::billable(window).grouped_by(GroupByDimension::Service),
    )?;

    let context = metric_context(config);
    let records = backfill_cost_records(&context, now, &daily, &services);
    let batches = publish_in_batches(
        publisher,
        &context.namespace(),
        &records,
        config.batch_size,
    )?;

    info!(
        days = daily.len(),
        records = records.len(),
        batches,
        "cost backfill published"
    );
    Ok(JobResponse::ok(format!(
        "Successfully backfilled {} days of cost data",
        daily.len()
    )))
}

fn metric_context(config: &CostMetricsConfig) -> MetricContext {
    MetricContext {
        project_name: config.project_name.clone(),
        environment: config.environment.clone(),
    }
}

fn fetch(
    cost_api: &impl CostQueryApi,
    query: CostQuery,
) -> Result<Vec<CostBucket>, CostJobError> {
    let window: CostWindow = query.window;
    let buckets = cost_api.get_cost_and_usage(&query).map_err(|source| {
        error!(window = %window, error = %source, "cost query failed");
        CostJobError::Fetch {
            window: window.to_string(),
            source,
        }
    })?;
    debug!(window = %window, buckets = buckets.len(), "cost query returned");
    Ok(buckets)
}
