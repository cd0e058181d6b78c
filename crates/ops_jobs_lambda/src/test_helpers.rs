//! In-memory stand-ins for the AWS ports and the clock.
//!
//! Shared by the unit tests in this crate and the integration tests under
//! `tests/`. Fakes record every call so tests can assert on attempts, delays
//! and published batches without touching the network.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use ops_jobs_core::contract::{
    CostBucket, CostQuery, ExportRequest, ExportTaskStatus, Granularity, MetricRecord,
};

use crate::adapters::clock::Clock;
use crate::adapters::cost_explorer::{CostApiError, CostQueryApi};
use crate::adapters::logs::{LogExportApi, LogsApiError};
use crate::adapters::metrics::{MetricsApiError, MetricsPublisher};

/// Clock whose `sleep` advances time instantly and records the requested delay.
pub struct FakeClock {
    now: Mutex<DateTime<Utc>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl FakeClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().expect("poisoned mutex").clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps().into_iter().sum()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("poisoned mutex")
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().expect("poisoned mutex").push(duration);
        let step = TimeDelta::from_std(duration).expect("sleep should fit in a TimeDelta");
        let mut now = self.now.lock().expect("poisoned mutex");
        *now += step;
    }
}

type StatusScript = VecDeque<Result<Option<ExportTaskStatus>, LogsApiError>>;

pub fn task_id_for(log_group: &str) -> String {
    format!("export-{}", log_group.trim_start_matches('/'))
}

/// Scripted CloudWatch Logs. Unless configured otherwise every group exists,
/// every export request succeeds, and every task reports `COMPLETED`.
pub struct FakeLogsApi {
    missing_groups: HashSet<String>,
    existence_errors: HashSet<String>,
    create_errors: Mutex<HashMap<String, VecDeque<LogsApiError>>>,
    status_scripts: Mutex<HashMap<String, StatusScript>>,
    default_status: ExportTaskStatus,
    created: Mutex<Vec<ExportRequest>>,
    create_attempts: Mutex<Vec<String>>,
    describe_calls: Mutex<Vec<String>>,
}

impl Default for FakeLogsApi {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeLogsApi {
    pub fn new() -> Self {
        Self {
            missing_groups: HashSet::new(),
            existence_errors: HashSet::new(),
            create_errors: Mutex::new(HashMap::new()),
            status_scripts: Mutex::new(HashMap::new()),
            default_status: ExportTaskStatus::Completed,
            created: Mutex::new(Vec::new()),
            create_attempts: Mutex::new(Vec::new()),
            describe_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_missing_group(mut self, log_group: &str) -> Self {
        self.missing_groups.insert(log_group.to_string());
        self
    }

    pub fn with_existence_error(mut self, log_group: &str) -> Self {
        self.existence_errors.insert(log_group.to_string());
        self
    }

    /// Errors returned, in order, by the next export requests for `log_group`.
    pub fn with_create_errors(self, log_group: &str, errors: Vec<LogsApiError>) -> Self {
        self.create_errors
            .lock()
            .expect("poisoned mutex")
            .insert(log_group.to_string(), errors.into());
        self
    }

    /// Status answers, in order, for the task created for `log_group`; once
    /// exhausted the default status is returned.
    pub fn with_status_sequence(
        self,
        log_group: &str,
        statuses: Vec<Result<Option<ExportTaskStatus>, LogsApiError>>,
    ) -> Self {
        self.status_scripts
            .lock()
            .expect("poisoned mutex")
            .insert(task_id_for(log_group), statuses.into());
        self
    }

    pub fn with_default_status(mut self, status: ExportTaskStatus) -> Self {
        self.default_status = status;
        self
    }

    pub fn created_requests(&self) -> Vec<ExportRequest> {
        self.created.lock().expect("poisoned mutex").clone()
    }

    pub fn create_attempts(&self, log_group: &str) -> usize {
        self.create_attempts
            .lock()
            .expect("poisoned mutex")
            .iter()
            .filter(|attempted| attempted.as_str() == log_group)
            .count()
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.lock().expect("poisoned mutex").len()
    }
}

impl LogExportApi for FakeLogsApi {
    fn log_group_exists(&self, log_group: &str) -> Result<bool, LogsApiError> {
        if self.existence_errors.contains(log_group) {
            return Err(LogsApiError::Other(format!(
                "describe log groups failed for {log_group}"
            )));
        }
        Ok(!self.missing_groups.contains(log_group))
    }

    fn create_export_task(&self, request: &ExportRequest) -> Result<String, LogsApiError> {
        self.create_attempts
            .lock()
            .expect("poisoned mutex")
            .push(request.log_group.clone());

        let scripted = self
            .create_errors
            .lock()
            .expect("poisoned mutex")
            .get_mut(&request.log_group)
            .and_then(VecDeque::pop_front);
        if let Some(error) = scripted {
            return Err(error);
        }

        self.created
            .lock()
            .expect("poisoned mutex")
            .push(request.clone());
        Ok(task_id_for(&request.log_group))
    }

    fn describe_export_task(
        &self,
        task_id: &str,
    ) -> Result<Option<ExportTaskStatus>, LogsApiError> {
        self.describe_calls
            .lock()
            .expect("poisoned mutex")
            .push(task_id.to_string());

        self.status_scripts
            .lock()
            .expect("poisoned mutex")
            .get_mut(task_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(Some(self.default_status)))
    }
}

/// Cost Explorer answering by query shape: grouped queries get the service
/// buckets, monthly queries the month-to-date buckets, the rest the daily ones.
#[derive(Default)]
pub struct FakeCostApi {
    daily: Vec<CostBucket>,
    by_service: Vec<CostBucket>,
    monthly: Vec<CostBucket>,
    failure: Option<CostApiError>,
    fail_on_query: Option<usize>,
    queries: Mutex<Vec<CostQuery>>,
}

impl FakeCostApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_daily(mut self, buckets: Vec<CostBucket>) -> Self {
        self.daily = buckets;
        self
    }

    pub fn with_services(mut self, buckets: Vec<CostBucket>) -> Self {
        self.by_service = buckets;
        self
    }

    pub fn with_monthly(mut self, buckets: Vec<CostBucket>) -> Self {
        self.monthly = buckets;
        self
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(CostApiError(message.to_string())),
            ..Self::default()
        }
    }

    /// Answers normally except for the n-th query (0-based), which fails.
    pub fn failing_on_query(mut self, query: usize, message: &str) -> Self {
        self.failure = Some(CostApiError(message.to_string()));
        self.fail_on_query = Some(query);
        self
    }

    pub fn queries(&self) -> Vec<CostQuery> {
        self.queries.lock().expect("poisoned mutex").clone()
    }
}

impl CostQueryApi for FakeCostApi {
    fn get_cost_and_usage(&self, query: &CostQuery) -> Result<Vec<CostBucket>, CostApiError> {
        let index = {
            let mut queries = self.queries.lock().expect("poisoned mutex");
            queries.push(query.clone());
            queries.len() - 1
        };

        if let Some(error) = &self.failure {
            if self.fail_on_query.is_none() || self.fail_on_query == Some(index) {
                return Err(error.clone());
            }
        }
        Ok(match (query.group_by, query.window.granularity) {
            (Some(_), _) => self.by_service.clone(),
            (None, Granularity::Monthly) => self.monthly.clone(),
            (None, Granularity::Daily) => self.daily.clone(),
        })
    }
}

/// Metrics store that keeps every batch; optionally fails the n-th call (0-based).
#[derive(Default)]
pub struct CapturingPublisher {
    fail_on_call: Option<usize>,
    batches: Mutex<Vec<(String, Vec<MetricRecord>)>>,
    calls: Mutex<usize>,
}

impl CapturingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on_call(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::default()
        }
    }

    pub fn batches(&self) -> Vec<(String, Vec<MetricRecord>)> {
        self.batches.lock().expect("poisoned mutex").clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches()
            .iter()
            .map(|(_, records)| records.len())
            .collect()
    }

    pub fn published(&self) -> Vec<MetricRecord> {
        self.batches()
            .into_iter()
            .flat_map(|(_, records)| records)
            .collect()
    }
}

impl MetricsPublisher for CapturingPublisher {
    fn put_metric_data(
        &self,
        namespace: &str,
        records: &[MetricRecord],
    ) -> Result<(), MetricsApiError> {
        let mut calls = self.calls.lock().expect("poisoned mutex");
        let call = *calls;
        *calls += 1;

        if self.fail_on_call == Some(call) {
            return Err(MetricsApiError(format!("put_metric_data call {call} rejected")));
        }
        self.batches
            .lock()
            .expect("poisoned mutex")
            .push((namespace.to_string(), records.to_vec()));
        Ok(())
    }
}
