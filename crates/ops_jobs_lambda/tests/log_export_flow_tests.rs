mod support;

use std::time::Duration;

use ops_jobs_core::contract::ExportTaskStatus;
use ops_jobs_lambda::adapters::logs::LogsApiError;
use ops_jobs_lambda::config::LogExportConfig;
use ops_jobs_lambda::handlers::log_export::handle_log_export_event;
use ops_jobs_lambda::test_helpers::{task_id_for, FakeClock, FakeLogsApi};
use serde_json::{json, Value};

use support::{env, fixed_now};

fn config(groups: &str) -> LogExportConfig {
    LogExportConfig::from_lookup(env(&[
        ("S3_BUCKET", "ops-log-archive"),
        ("LOG_GROUPS", groups),
    ]))
    .expect("config should parse")
}

fn rate_limited(times: usize) -> Vec<LogsApiError> {
    (0..times)
        .map(|_| LogsApiError::RateLimited("Rate exceeded".to_string()))
        .collect()
}

fn body_of(response_body: &str) -> Value {
    serde_json::from_str(response_body).expect("body should be json")
}

#[test]
fn hourly_run_isolates_missing_and_throttled_groups() {
    let logs = FakeLogsApi::new()
        .with_missing_group("/aws/lambda/retired")
        .with_create_errors("/aws/rds/instance/db/postgresql", rate_limited(3));
    let clock = FakeClock::at(fixed_now());
    let config = config(
        r#"["/aws/ecs/api", "/aws/lambda/retired", "/aws/rds/instance/db/postgresql"]"#,
    );

    let response =
        handle_log_export_event(&json!({}), &config, &logs, &clock).expect("handler succeeds");

    assert_eq!(response.status_code, 200);
    let body = body_of(&response.body);
    assert_eq!(body["message"], "Log export completed for 2026-05-20 13:00");
    assert_eq!(body["totalLogGroups"], 3);
    assert_eq!(body["successfulExports"], 1);
    assert_eq!(body["failedExports"], 1);
    assert_eq!(body["skippedLogGroups"], 1);
    assert_eq!(body["abandonedTasks"], json!([]));
    assert_eq!(body["taskOutcomes"][0]["taskId"], task_id_for("/aws/ecs/api"));
    assert_eq!(body["taskOutcomes"][0]["status"], "COMPLETED");

    assert_eq!(logs.create_attempts("/aws/rds/instance/db/postgresql"), 3);
    assert_eq!(logs.create_attempts("/aws/lambda/retired"), 0);
    assert_eq!(
        clock.sleeps(),
        vec![
            Duration::from_secs(5),
            Duration::from_secs(30),
            Duration::from_secs(60),
        ]
    );

    let created = logs.created_requests();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].destination, "ops-log-archive");
    assert_eq!(
        created[0].destination_prefix,
        "cloudwatch-logs/-aws-ecs-api/2026/05/20/13"
    );
    assert_eq!(created[0].to_millis - created[0].from_millis, 3_600_000);
}

#[test]
fn polling_tracks_each_task_until_it_settles() {
    let logs = FakeLogsApi::new()
        .with_status_sequence(
            "/aws/ecs/api",
            vec![
                Ok(Some(ExportTaskStatus::Pending)),
                Ok(Some(ExportTaskStatus::Running)),
                Ok(Some(ExportTaskStatus::Completed)),
            ],
        )
        .with_status_sequence(
            "/aws/ecs/worker",
            vec![Err(LogsApiError::Other("AccessDenied".to_string()))],
        );
    let clock = FakeClock::at(fixed_now());

    let response = handle_log_export_event(
        &json!({}),
        &config(r#"["/aws/ecs/api", "/aws/ecs/worker"]"#),
        &logs,
        &clock,
    )
    .expect("handler succeeds");

    let body = body_of(&response.body);
    assert_eq!(body["successfulExports"], 2);
    assert_eq!(body["failedExports"], 0);
    assert_eq!(body["taskOutcomes"][0]["logGroup"], "/aws/ecs/worker");
    assert_eq!(body["taskOutcomes"][0]["status"], Value::Null);
    assert_eq!(body["taskOutcomes"][1]["logGroup"], "/aws/ecs/api");
    assert_eq!(body["taskOutcomes"][1]["status"], "COMPLETED");

    assert_eq!(logs.describe_calls(), 4);
    assert_eq!(
        clock.sleeps(),
        vec![
            Duration::from_secs(5),
            Duration::from_secs(10),
            Duration::from_secs(10),
        ]
    );
}

#[test]
fn payload_supplied_as_json_string_overrides_configuration() {
    let logs = FakeLogsApi::new();
    let clock = FakeClock::at(fixed_now());

    let response = handle_log_export_event(
        &json!({ "log_groups": "[\"/aws/batch/job\"]" }),
        &config(r#"["/aws/ecs/api"]"#),
        &logs,
        &clock,
    )
    .expect("handler succeeds");

    assert_eq!(body_of(&response.body)["totalLogGroups"], 1);
    assert_eq!(logs.create_attempts("/aws/batch/job"), 1);
    assert_eq!(logs.create_attempts("/aws/ecs/api"), 0);
}

#[test]
fn stuck_tasks_are_abandoned_after_the_configured_ceiling() {
    let logs = FakeLogsApi::new().with_default_status(ExportTaskStatus::Running);
    let clock = FakeClock::at(fixed_now());
    let config = LogExportConfig::from_lookup(env(&[
        ("S3_BUCKET", "ops-log-archive"),
        ("LOG_GROUPS", r#"["/aws/ecs/api"]"#),
        ("EXPORT_MAX_WAIT_SECS", "60"),
        ("EXPORT_POLL_INTERVAL_SECS", "20"),
    ]))
    .expect("config should parse");

    let response =
        handle_log_export_event(&json!({}), &config, &logs, &clock).expect("handler succeeds");

    let body = body_of(&response.body);
    assert_eq!(body["abandonedTasks"], json!([task_id_for("/aws/ecs/api")]));
    assert_eq!(body["failedExports"], 0);
    assert_eq!(logs.describe_calls(), 3);
    assert_eq!(clock.total_slept(), Duration::from_secs(60));
}
