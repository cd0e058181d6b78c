use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PROJECT_NAME: &str = "sdt";
pub const DEFAULT_ENVIRONMENT: &str = "dev";
pub const DEFAULT_EXPORT_PREFIX: &str = "cloudwatch-logs";
pub const MAX_METRICS_PER_REQUEST: usize = 20;
pub const COST_METRIC: &str = "UnblendedCost";
pub const RECORD_TYPE_DIMENSION: &str = "RECORD_TYPE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportTaskStatus {
    Pending,
    Running,
    PendingCancel,
    Completed,
    Failed,
    Cancelled,
}

impl ExportTaskStatus {
    /// Parses a provider status code; unknown codes yield `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "PENDING" => Some(Self::Pending),
            "RUNNING" => Some(Self::Running),
            "PENDING_CANCEL" => Some(Self::PendingCancel),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::PendingCancel => "PENDING_CANCEL",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTask {
    pub task_id: String,
    pub log_group: String,
    pub status: ExportTaskStatus,
}

impl ExportTask {
    pub fn pending(task_id: impl Into<String>, log_group: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            log_group: log_group.into(),
            status: ExportTaskStatus::Pending,
        }
    }
}

/// Half-open `[from, to)` interval of wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn from_millis(&self) -> i64 {
        self.from.timestamp_millis()
    }

    pub fn to_millis(&self) -> i64 {
        self.to.timestamp_millis()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub log_group: String,
    pub from_millis: i64,
    pub to_millis: i64,
    pub destination: String,
    pub destination_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutcome {
    pub task_id: String,
    pub log_group: String,
    /// `None` when the status check itself failed and the task was dropped.
    pub status: Option<ExportTaskStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogExportSummary {
    pub message: String,
    pub total_log_groups: usize,
    pub successful_exports: usize,
    pub failed_exports: usize,
    pub skipped_log_groups: usize,
    pub abandoned_tasks: Vec<String>,
    pub task_outcomes: Vec<TaskOutcome>,
    pub time_range: TimeRange,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl JobResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricUnit {
    None,
}

impl MetricUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub name: String,
    pub value: f64,
    pub unit: MetricUnit,
    pub timestamp: DateTime<Utc>,
    pub dimensions: Vec<Dimension>,
}

impl MetricRecord {
    pub fn dimension(&self, name: &str) -> Option<&str> {
        self.dimensions
            .iter()
            .find(|dimension| dimension.name == name)
            .map(|dimension| dimension.value.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Daily,
    Monthly,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Monthly => "MONTHLY",
        }
    }
}

/// Date range `[start, end)` queried at a fixed granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub granularity: Granularity,
}

impl CostWindow {
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Display for CostWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{} ({})",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d"),
            self.granularity.as_str()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Credit,
    Refund,
    Tax,
}

impl RecordType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "Credit",
            Self::Refund => "Refund",
            Self::Tax => "Tax",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupByDimension {
    Service,
}

impl GroupByDimension {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Service => "SERVICE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostQuery {
    pub window: CostWindow,
    pub metric: &'static str,
    pub group_by: Option<GroupByDimension>,
    pub excluded_record_types: Vec<RecordType>,
}

impl CostQuery {
    /// Query for billable usage only: credits, refunds and tax are filtered out.
    pub fn billable(window: CostWindow) -> Self {
        Self {
            window,
            metric: COST_METRIC,
            group_by: None,
            excluded_record_types: vec![RecordType::Credit, RecordType::Refund, RecordType::Tax],
        }
    }

    pub fn grouped_by(mut self, dimension: GroupByDimension) -> Self {
        self.group_by = Some(dimension);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostGroup {
    pub key: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostBucket {
    pub start: NaiveDate,
    pub total: f64,
    pub groups: Vec<CostGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}
