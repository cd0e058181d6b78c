use lambda_runtime::{service_fn, Error, LambdaEvent};
use ops_jobs_core::contract::JobResponse;
use ops_jobs_lambda::adapters::clock::SystemClock;
use ops_jobs_lambda::aws::CloudWatchLogsExportApi;
use ops_jobs_lambda::config::{CommonConfig, LogExportConfig};
use ops_jobs_lambda::handlers::log_export::handle_log_export_event;
use ops_jobs_lambda::logging::init_tracing;
use serde_json::Value;
use tracing::{error, info};

async fn handle_request(
    event: LambdaEvent<Value>,
    config: &LogExportConfig,
    logs: &CloudWatchLogsExportApi,
) -> Result<JobResponse, Error> {
    info!(request_id = %event.context.request_id, "log export invoked");
    handle_log_export_event(&event.payload, config, logs, &SystemClock).map_err(|err| {
        error!(error = %err, "log export rejected the invocation");
        Error::from(err)
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing(CommonConfig::from_env()?.log_format)?;
    let config = LogExportConfig::from_env()?;

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let logs = CloudWatchLogsExportApi::new(aws_sdk_cloudwatchlogs::Client::new(&aws_config));

    let config = &config;
    let logs = &logs;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, config, logs).await
    }))
    .await
}
