//! One-off: republishes the last seven days of cost history.

use lambda_runtime::{service_fn, Error, LambdaEvent};
use ops_jobs_core::contract::JobResponse;
use ops_jobs_lambda::adapters::clock::SystemClock;
use ops_jobs_lambda::aws::{CloudWatchPublisher, CostExplorerApi};
use ops_jobs_lambda::config::{CommonConfig, CostMetricsConfig};
use ops_jobs_lambda::handlers::cost_metrics::run_cost_backfill;
use ops_jobs_lambda::logging::init_tracing;
use serde_json::Value;
use tracing::{error, info};

struct CostClients {
    cost_api: CostExplorerApi,
    publisher: CloudWatchPublisher,
}

async fn handle_request(
    event: LambdaEvent<Value>,
    config: &CostMetricsConfig,
    clients: &CostClients,
) -> Result<JobResponse, Error> {
    info!(request_id = %event.context.request_id, "cost backfill invoked");
    run_cost_backfill(config, &clients.cost_api, &clients.publisher, &SystemClock).map_err(|err| {
        error!(error = %err, "cost backfill failed");
        Error::from(err)
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing(CommonConfig::from_env()?.log_format)?;
    let config = CostMetricsConfig::from_env()?;

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let clients = CostClients {
        cost_api: CostExplorerApi::for_region(&aws_config, &config.cost_explorer_region),
        publisher: CloudWatchPublisher::new(aws_sdk_cloudwatch::Client::new(&aws_config)),
    };

    let config = &config;
    let clients = &clients;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, config, clients).await
    }))
    .await
}
