use aws_sdk_cloudwatch::error::DisplayErrorContext;
use aws_sdk_cloudwatch::primitives::DateTime;
use aws_sdk_cloudwatch::types::{Dimension, MetricDatum, StandardUnit};
use ops_jobs_core::contract::{MetricRecord, MetricUnit};

use super::block_on;
use crate::adapters::metrics::{MetricsApiError, MetricsPublisher};

pub struct CloudWatchPublisher {
    client: aws_sdk_cloudwatch::Client,
}

impl CloudWatchPublisher {
    pub fn new(client: aws_sdk_cloudwatch::Client) -> Self {
        Self { client }
    }
}

impl MetricsPublisher for CloudWatchPublisher {
    fn put_metric_data(
        &self,
        namespace: &str,
        records: &[MetricRecord],
    ) -> Result<(), MetricsApiError> {
        let data: Vec<MetricDatum> = records.iter().map(metric_datum).collect();
        let client = self.client.clone();
        let namespace = namespace.to_string();

        block_on(async move {
            client
                .put_metric_data()
                .namespace(namespace)
                .set_metric_data(Some(data))
                .send()
                .await
                .map(|_| ())
                .map_err(|error| {
                    MetricsApiError(format!(
                        "put metric data failed: {}",
                        DisplayErrorContext(&error)
                    ))
                })
        })
    }
}

fn metric_datum(record: &MetricRecord) -> MetricDatum {
    let dimensions: Vec<Dimension> = record
        .dimensions
        .iter()
        .map(|dimension| {
            Dimension::builder()
                .name(&dimension.name)
                .value(&dimension.value)
                .build()
        })
        .collect();

    MetricDatum::builder()
        .metric_name(&record.name)
        .value(record.value)
        .unit(standard_unit(record.unit))
        .timestamp(DateTime::from_millis(record.timestamp.timestamp_millis()))
        .set_dimensions(Some(dimensions))
        .build()
}

fn standard_unit(unit: MetricUnit) -> StandardUnit {
    match unit {
        MetricUnit::None => StandardUnit::None,
    }
}
