mod support;

use chrono::TimeDelta;
use ops_jobs_core::contract::{CostBucket, Granularity, MetricRecord};
use ops_jobs_core::cost::{
    DAILY_COST_HISTORY_METRIC, DATE_DIMENSION, MONTH_TO_DATE_COST_METRIC, SERVICE_COST_METRIC,
    SERVICE_NAME_DIMENSION, TOTAL_COST_METRIC,
};
use ops_jobs_lambda::config::CostMetricsConfig;
use ops_jobs_lambda::handlers::cost_metrics::{
    run_cost_backfill, run_scheduled_cost_export, CostJobError,
};
use ops_jobs_lambda::test_helpers::{CapturingPublisher, FakeClock, FakeCostApi};

use support::{day_bucket, env, fixed_now, service_bucket, trailing_week_costs};

fn config(pairs: &[(&str, &str)]) -> CostMetricsConfig {
    CostMetricsConfig::from_lookup(env(pairs)).expect("config should parse")
}

/// ECS split over two days, a credit-heavy service, and `filler` small services.
fn service_costs(filler: usize) -> Vec<CostBucket> {
    let today = fixed_now().date_naive();
    let names: Vec<String> = (0..filler).map(|index| format!("Service {index:02}")).collect();
    let mut small: Vec<(&str, f64)> = names.iter().map(|name| (name.as_str(), 1.0)).collect();
    small.push(("Amazon Elastic Container Service", 5.0));
    vec![
        service_bucket(today - TimeDelta::days(2), &small),
        service_bucket(
            today - TimeDelta::days(1),
            &[
                ("Amazon Elastic Container Service", 7.5),
                ("AWS Support (Business)", -3.0),
            ],
        ),
    ]
}

fn find<'a>(records: &'a [MetricRecord], name: &str) -> Vec<&'a MetricRecord> {
    records.iter().filter(|record| record.name == name).collect()
}

#[test]
fn scheduled_export_publishes_every_family_in_batches_of_twenty() {
    let now = fixed_now();
    let cost_api = FakeCostApi::new()
        .with_daily(trailing_week_costs(now))
        .with_services(service_costs(35))
        .with_monthly(vec![day_bucket(
            now.date_naive() - TimeDelta::days(19),
            230.5,
        )]);
    let publisher = CapturingPublisher::new();

    let response = run_scheduled_cost_export(
        &config(&[("PROJECT_NAME", "sdt"), ("ENVIRONMENT", "prod")]),
        &cost_api,
        &publisher,
        &FakeClock::at(now),
    )
    .expect("export succeeds");

    assert_eq!(response.status_code, 200);
    assert_eq!(
        response.body,
        "Successfully published cost metrics. Total: $16.00"
    );
    assert_eq!(publisher.batch_sizes(), vec![20, 20, 5]);
    assert!(publisher
        .batches()
        .iter()
        .all(|(namespace, _)| namespace == "SDT/Costs"));

    let published = publisher.published();
    assert!(published.iter().all(|record| {
        record.dimensions[0].name == "Project"
            && record.dimensions[0].value == "sdt"
            && record.dimensions[1].name == "Environment"
            && record.dimensions[1].value == "prod"
    }));

    let totals = find(&published, TOTAL_COST_METRIC);
    assert_eq!(totals.len(), 8);
    assert_eq!(totals[0].value, 16.0);
    assert_eq!(totals[0].timestamp, now);
    let first_day = now.date_naive() - TimeDelta::days(7);
    assert_eq!(
        totals[1].timestamp,
        first_day.and_hms_opt(0, 0, 0).expect("midnight").and_utc()
    );

    let month_to_date = find(&published, MONTH_TO_DATE_COST_METRIC);
    assert_eq!(month_to_date.len(), 1);
    assert_eq!(month_to_date[0].value, 230.5);

    let services = find(&published, SERVICE_COST_METRIC);
    assert_eq!(services.len(), 36);
    let ecs = services
        .iter()
        .find(|record| record.dimension(SERVICE_NAME_DIMENSION) == Some("ECS"))
        .expect("ECS is mapped to its short name");
    assert_eq!(ecs.value, 12.5);
    assert!(!services
        .iter()
        .any(|record| record.dimension(SERVICE_NAME_DIMENSION) == Some("AWS Support (Business)")));
}

#[test]
fn every_query_excludes_credits_refunds_and_tax() {
    let now = fixed_now();
    let cost_api = FakeCostApi::new().with_daily(trailing_week_costs(now));

    run_scheduled_cost_export(
        &config(&[]),
        &cost_api,
        &CapturingPublisher::new(),
        &FakeClock::at(now),
    )
    .expect("export succeeds");

    let queries = cost_api.queries();
    assert_eq!(queries.len(), 3);
    for query in &queries {
        let excluded: Vec<&str> = query
            .excluded_record_types
            .iter()
            .map(|record_type| record_type.as_str())
            .collect();
        assert_eq!(excluded, vec!["Credit", "Refund", "Tax"]);
        assert_eq!(query.metric, "UnblendedCost");
    }
    assert_eq!(queries[2].window.granularity, Granularity::Monthly);
}

#[test]
fn cost_query_failure_publishes_nothing() {
    let cost_api = FakeCostApi::failing("ThrottlingException: Rate exceeded");
    let publisher = CapturingPublisher::new();

    let error = run_scheduled_cost_export(
        &config(&[]),
        &cost_api,
        &publisher,
        &FakeClock::at(fixed_now()),
    )
    .expect_err("export should fail");

    assert!(matches!(error, CostJobError::Fetch { .. }));
    assert!(publisher.batches().is_empty());
    assert_eq!(cost_api.queries().len(), 1);
}

#[test]
fn month_to_date_failure_after_earlier_fetches_publishes_nothing() {
    let now = fixed_now();
    let cost_api = FakeCostApi::new()
        .with_daily(trailing_week_costs(now))
        .with_services(service_costs(3))
        .failing_on_query(2, "AccessDeniedException: not authorized");
    let publisher = CapturingPublisher::new();

    let error = run_scheduled_cost_export(
        &config(&[]),
        &cost_api,
        &publisher,
        &FakeClock::at(now),
    )
    .expect_err("export should fail");

    assert!(matches!(error, CostJobError::Fetch { .. }));
    assert_eq!(cost_api.queries().len(), 3);
    assert_eq!(
        cost_api.queries()[2].window.granularity,
        Granularity::Monthly
    );
    assert!(publisher.batches().is_empty());
}

#[test]
fn configured_batch_size_controls_publish_calls() {
    let now = fixed_now();
    let cost_api = FakeCostApi::new()
        .with_daily(trailing_week_costs(now))
        .with_services(service_costs(35));
    let publisher = CapturingPublisher::new();

    run_scheduled_cost_export(
        &config(&[("METRICS_BATCH_SIZE", "10")]),
        &cost_api,
        &publisher,
        &FakeClock::at(now),
    )
    .expect("export succeeds");

    assert_eq!(publisher.batch_sizes(), vec![10, 10, 10, 10, 5]);
}

#[test]
fn backfill_restamps_the_week_to_end_now() {
    let now = fixed_now();
    let cost_api = FakeCostApi::new()
        .with_daily(trailing_week_costs(now))
        .with_services(service_costs(0));
    let publisher = CapturingPublisher::new();

    let response = run_cost_backfill(&config(&[]), &cost_api, &publisher, &FakeClock::at(now))
        .expect("backfill succeeds");

    assert_eq!(
        response.body,
        "Successfully backfilled 7 days of cost data"
    );
    assert_eq!(cost_api.queries().len(), 2);

    let published = publisher.published();
    assert_eq!(publisher.batch_sizes(), vec![8]);
    assert_eq!(published[0].name, DAILY_COST_HISTORY_METRIC);
    assert_eq!(published[0].timestamp, now - TimeDelta::days(6));
    assert_eq!(published[0].dimension(DATE_DIMENSION), Some("2026-05-13"));
    assert_eq!(published[6].timestamp, now);
    assert_eq!(published[6].dimension(DATE_DIMENSION), Some("2026-05-19"));
    assert_eq!(published[7].name, SERVICE_COST_METRIC);
    assert_eq!(published[7].dimension(SERVICE_NAME_DIMENSION), Some("ECS"));
}

#[test]
fn backfill_fails_when_a_batch_is_rejected() {
    let now = fixed_now();
    let cost_api = FakeCostApi::new().with_daily(trailing_week_costs(now));

    let error = run_cost_backfill(
        &config(&[]),
        &cost_api,
        &CapturingPublisher::failing_on_call(0),
        &FakeClock::at(now),
    )
    .expect_err("publish should fail");

    assert!(error.to_string().contains("batch 0"));
}
