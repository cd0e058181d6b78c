use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use ops_jobs_core::contract::{
    ExportRequest, ExportTask, JobResponse, LogExportSummary, TaskOutcome,
};
use ops_jobs_core::retry::{retry_with_backoff, BackoffPolicy};
use ops_jobs_core::storage_keys::export_destination_prefix;
use ops_jobs_core::windows::previous_hour;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::adapters::clock::{elapsed_since, Clock};
use crate::adapters::logs::{LogExportApi, LogsApiError};
use crate::config::{parse_log_groups, LogExportConfig};

pub const DEFAULT_PACING: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(240);

/// What happens to export tasks still running when the polling ceiling is hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// Listed as abandoned in the summary, not counted as failed.
    #[default]
    Abandon,
    /// Listed as abandoned and added to the failed count.
    CountAsFailed,
}

impl FromStr for TimeoutPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "abandon" => Ok(Self::Abandon),
            "count_as_failed" | "fail" => Ok(Self::CountAsFailed),
            other => Err(format!(
                "unknown timeout policy '{other}' (expected abandon or count_as_failed)"
            )),
        }
    }
}

impl fmt::Display for TimeoutPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Abandon => "abandon",
            Self::CountAsFailed => "count_as_failed",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogExportSettings {
    pub backoff: BackoffPolicy,
    /// Wait after each successful request while more log groups remain.
    pub pacing: Duration,
    pub poll_interval: Duration,
    pub max_wait: Duration,
    pub timeout_policy: TimeoutPolicy,
}

impl Default for LogExportSettings {
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            pacing: DEFAULT_PACING,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
            timeout_policy: TimeoutPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogExportRequest {
    pub destination_bucket: String,
    pub export_prefix: String,
    pub log_groups: Vec<String>,
}

#[derive(Debug, Error)]
pub enum LogExportError {
    #[error("LOG_GROUPS must be configured or supplied as `log_groups` in the event")]
    NoLogGroups,
    #[error("invalid log export event: {0}")]
    InvalidEvent(String),
    #[error("failed to serialize export summary: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Lambda entry point: resolves the log groups (event `log_groups` overrides the
/// configured list), runs the export, and wraps the summary as the response body.
pub fn handle_log_export_event(
    event: &Value,
    config: &LogExportConfig,
    logs: &impl LogExportApi,
    clock: &impl Clock,
) -> Result<JobResponse, LogExportError> {
    let log_groups = match event_log_groups(event)? {
        Some(groups) => groups,
        None => config.log_groups.clone().ok_or(LogExportError::NoLogGroups)?,
    };

    let request = LogExportRequest {
        destination_bucket: config.destination_bucket.clone(),
        export_prefix: config.export_prefix.clone(),
        log_groups,
    };
    let summary = run_log_export(&request, &config.settings, logs, clock);
    Ok(JobResponse::ok(serde_json::to_string(&summary)?))
}

/// Requests one export per log group for the previous hour, then polls the
/// created tasks until they settle or `max_wait` elapses. Per-group failures
/// are counted in the summary and never abort the run.
pub fn run_log_export(
    request: &LogExportRequest,
    settings: &LogExportSettings,
    logs: &impl LogExportApi,
    clock: &impl Clock,
) -> LogExportSummary {
    let window = previous_hour(clock.now());
    info!(
        log_groups = request.log_groups.len(),
        from = %window.from,
        to = %window.to,
        "starting log export"
    );

    let mut outstanding = Vec::new();
    let mut successful_exports = 0;
    let mut failed_exports = 0;
    let mut skipped_log_groups = 0;

    for (index, log_group) in request.log_groups.iter().enumerate() {
        match logs.log_group_exists(log_group) {
            Ok(true) => {}
            Ok(false) => {
                warn!(log_group = %log_group, "log group not found, skipping");
                skipped_log_groups += 1;
                continue;
            }
            Err(error) => {
                error!(log_group = %log_group, error = %error, "failed to check log group");
                failed_exports += 1;
                continue;
            }
        }

        let export_request = ExportRequest {
            log_group: log_group.clone(),
            from_millis: window.from_millis(),
            to_millis: window.to_millis(),
            destination: request.destination_bucket.clone(),
            destination_prefix: export_destination_prefix(
                &request.export_prefix,
                log_group,
                window.from,
            ),
        };

        let outcome = retry_with_backoff(
            &settings.backoff,
            LogsApiError::is_rate_limited,
            |attempt, delay| {
                warn!(
                    log_group = %log_group,
                    attempt,
                    max_attempts = settings.backoff.max_attempts,
                    delay_secs = delay.as_secs(),
                    "rate limited creating export task, backing off"
                );
                clock.sleep(delay);
            },
            |attempt| {
                debug!(log_group = %log_group, attempt, "creating export task");
                logs.create_export_task(&export_request)
            },
        );

        match outcome.result {
            Ok(task_id) => {
                info!(
                    log_group = %log_group,
                    task_id = %task_id,
                    destination_prefix = %export_request.destination_prefix,
                    "created export task"
                );
                successful_exports += 1;
                outstanding.push(ExportTask::pending(task_id, log_group.clone()));
                if index + 1 < request.log_groups.len() {
                    clock.sleep(settings.pacing);
                }
            }
            Err(error) if error.is_rate_limited() => {
                error!(
                    log_group = %log_group,
                    attempts = outcome.attempts,
                    error = %error,
                    "giving up on export task after repeated rate limiting"
                );
                failed_exports += 1;
            }
            Err(error) => {
                error!(log_group = %log_group, error = %error, "failed to create export task");
                failed_exports += 1;
            }
        }
    }

    let settled = poll_until_settled(outstanding, settings, logs, clock);
    let abandoned_tasks: Vec<String> = settled
        .abandoned
        .iter()
        .map(|task| task.task_id.clone())
        .collect();
    if !abandoned_tasks.is_empty() {
        warn!(
            abandoned = abandoned_tasks.len(),
            policy = %settings.timeout_policy,
            "export tasks still running at the polling ceiling"
        );
        if settings.timeout_policy == TimeoutPolicy::CountAsFailed {
            failed_exports += abandoned_tasks.len();
        }
    }

    let summary = LogExportSummary {
        message: format!(
            "Log export completed for {}",
            window.from.format("%Y-%m-%d %H:00")
        ),
        total_log_groups: request.log_groups.len(),
        successful_exports,
        failed_exports,
        skipped_log_groups,
        abandoned_tasks,
        task_outcomes: settled.outcomes,
        time_range: window,
    };
    info!(
        successful = summary.successful_exports,
        failed = summary.failed_exports,
        skipped = summary.skipped_log_groups,
        "log export finished"
    );
    summary
}

#[derive(Debug)]
struct PollResult {
    outcomes: Vec<TaskOutcome>,
    abandoned: Vec<ExportTask>,
}

fn poll_until_settled(
    mut outstanding: Vec<ExportTask>,
    settings: &LogExportSettings,
    logs: &impl LogExportApi,
    clock: &impl Clock,
) -> PollResult {
    let started = clock.now();
    let mut outcomes = Vec::new();

    while !outstanding.is_empty() && elapsed_since(clock, started) < settings.max_wait {
        outstanding.retain_mut(|task| match logs.describe_export_task(&task.task_id) {
            Ok(Some(status)) => {
                task.status = status;
                if status.is_terminal() {
                    info!(
                        task_id = %task.task_id,
                        log_group = %task.log_group,
                        status = status.as_str(),
                        "export task settled"
                    );
                    outcomes.push(TaskOutcome {
                        task_id: task.task_id.clone(),
                        log_group: task.log_group.clone(),
                        status: Some(status),
                    });
                    false
                } else {
                    true
                }
            }
            Ok(None) => true,
            Err(error) => {
                warn!(task_id = %task.task_id, error = %error, "failed to check export task");
                outcomes.push(TaskOutcome {
                    task_id: task.task_id.clone(),
                    log_group: task.log_group.clone(),
                    status: None,
                });
                false
            }
        });

        if !outstanding.is_empty() {
            clock.sleep(settings.poll_interval);
        }
    }

    PollResult {
        outcomes,
        abandoned: outstanding,
    }
}

fn event_log_groups(event: &Value) -> Result<Option<Vec<String>>, LogExportError> {
    match event.get("log_groups") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) => parse_log_groups(raw)
            .map(Some)
            .map_err(|error| LogExportError::InvalidEvent(error.to_string())),
        Some(value) => serde_json::from_value::<Vec<String>>(value.clone())
            .map(Some)
            .map_err(|error| {
                LogExportError::InvalidEvent(format!("log_groups must be a string array: {error}"))
            }),
    }
}
