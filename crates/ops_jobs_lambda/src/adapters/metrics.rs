use ops_jobs_core::contract::MetricRecord;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct MetricsApiError(pub String);

pub trait MetricsPublisher {
    fn put_metric_data(
        &self,
        namespace: &str,
        records: &[MetricRecord],
    ) -> Result<(), MetricsApiError>;
}
