use ops_jobs_core::contract::{CostBucket, CostQuery};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CostApiError(pub String);

pub trait CostQueryApi {
    /// Returns every time bucket for the query, following pagination to the end.
    fn get_cost_and_usage(&self, query: &CostQuery) -> Result<Vec<CostBucket>, CostApiError>;
}
