use ops_jobs_core::contract::{ExportRequest, ExportTaskStatus};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogsApiError {
    #[error("rate limit exceeded: {0}")]
    RateLimited(String),
    #[error("{0}")]
    Other(String),
}

impl LogsApiError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

/// The subset of CloudWatch Logs the export job needs.
pub trait LogExportApi {
    /// True when at least one log group starts with `log_group`.
    fn log_group_exists(&self, log_group: &str) -> Result<bool, LogsApiError>;

    /// Requests an export and returns the provider task id.
    fn create_export_task(&self, request: &ExportRequest) -> Result<String, LogsApiError>;

    /// `Ok(None)` when the provider returned no status for the task.
    fn describe_export_task(&self, task_id: &str)
        -> Result<Option<ExportTaskStatus>, LogsApiError>;
}
