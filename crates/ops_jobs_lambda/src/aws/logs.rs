use aws_sdk_cloudwatchlogs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use ops_jobs_core::contract::{ExportRequest, ExportTaskStatus};

use super::block_on;
use crate::adapters::logs::{LogExportApi, LogsApiError};

const THROTTLING_CODES: &[&str] = &["LimitExceededException", "ThrottlingException"];

pub struct CloudWatchLogsExportApi {
    client: aws_sdk_cloudwatchlogs::Client,
}

impl CloudWatchLogsExportApi {
    pub fn new(client: aws_sdk_cloudwatchlogs::Client) -> Self {
        Self { client }
    }
}

impl LogExportApi for CloudWatchLogsExportApi {
    fn log_group_exists(&self, log_group: &str) -> Result<bool, LogsApiError> {
        let client = self.client.clone();
        let prefix = log_group.to_string();

        block_on(async move {
            client
                .describe_log_groups()
                .log_group_name_prefix(prefix)
                .limit(1)
                .send()
                .await
                .map(|output| !output.log_groups().is_empty())
                .map_err(|error| classify("describe log groups", error))
        })
    }

    fn create_export_task(&self, request: &ExportRequest) -> Result<String, LogsApiError> {
        let client = self.client.clone();
        let request = request.clone();

        block_on(async move {
            let output = client
                .create_export_task()
                .log_group_name(request.log_group)
                .from(request.from_millis)
                .to(request.to_millis)
                .destination(request.destination)
                .destination_prefix(request.destination_prefix)
                .send()
                .await
                .map_err(|error| classify("create export task", error))?;

            output.task_id().map(str::to_string).ok_or_else(|| {
                LogsApiError::Other("export task created without a task id".to_string())
            })
        })
    }

    fn describe_export_task(
        &self,
        task_id: &str,
    ) -> Result<Option<ExportTaskStatus>, LogsApiError> {
        let client = self.client.clone();
        let task_id = task_id.to_string();

        block_on(async move {
            let output = client
                .describe_export_tasks()
                .task_id(task_id)
                .send()
                .await
                .map_err(|error| classify("describe export tasks", error))?;

            let status = output
                .export_tasks()
                .first()
                .and_then(|task| task.status())
                .and_then(|status| status.code())
                .and_then(|code| ExportTaskStatus::from_code(code.as_str()));
            Ok::<_, LogsApiError>(status)
        })
    }
}

fn classify<E, R>(operation: &str, error: SdkError<E, R>) -> LogsApiError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let throttled = is_throttling_code(error.code());
    let message = format!("{operation} failed: {}", DisplayErrorContext(&error));
    if throttled {
        LogsApiError::RateLimited(message)
    } else {
        LogsApiError::Other(message)
    }
}

fn is_throttling_code(code: Option<&str>) -> bool {
    code.is_some_and(|code| THROTTLING_CODES.contains(&code))
}
