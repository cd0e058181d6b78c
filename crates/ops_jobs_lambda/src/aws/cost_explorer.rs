use std::collections::HashMap;

use aws_sdk_costexplorer::config::Region;
use aws_sdk_costexplorer::error::DisplayErrorContext;
use aws_sdk_costexplorer::types::{
    DateInterval, Dimension, DimensionValues, Expression, Granularity, GroupDefinition,
    GroupDefinitionType, MetricValue, ResultByTime,
};
use chrono::NaiveDate;
use ops_jobs_core::contract::{CostBucket, CostGroup, CostQuery, RECORD_TYPE_DIMENSION};

use super::block_on;
use crate::adapters::cost_explorer::{CostApiError, CostQueryApi};

pub struct CostExplorerApi {
    client: aws_sdk_costexplorer::Client,
}

impl CostExplorerApi {
    pub fn new(client: aws_sdk_costexplorer::Client) -> Self {
        Self { client }
    }

    /// Cost Explorer only answers from one region, independent of where the job runs.
    pub fn for_region(sdk_config: &aws_config::SdkConfig, region: &str) -> Self {
        let config = aws_sdk_costexplorer::config::Builder::from(sdk_config)
            .region(Region::new(region.to_string()))
            .build();
        Self::new(aws_sdk_costexplorer::Client::from_conf(config))
    }
}

impl CostQueryApi for CostExplorerApi {
    fn get_cost_and_usage(&self, query: &CostQuery) -> Result<Vec<CostBucket>, CostApiError> {
        let time_period = DateInterval::builder()
            .start(query.window.start.format("%Y-%m-%d").to_string())
            .end(query.window.end.format("%Y-%m-%d").to_string())
            .build()
            .map_err(|error| CostApiError(format!("invalid time period: {error}")))?;
        let filter = exclusion_filter(query);
        let group_by = query.group_by.map(|dimension| {
            GroupDefinition::builder()
                .r#type(GroupDefinitionType::Dimension)
                .key(dimension.as_str())
                .build()
        });
        let granularity = Granularity::from(query.window.granularity.as_str());
        let metric = query.metric;
        let client = self.client.clone();

        block_on(async move {
            let mut buckets = Vec::new();
            let mut next_page_token: Option<String> = None;
            loop {
                let output = client
                    .get_cost_and_usage()
                    .time_period(time_period.clone())
                    .granularity(granularity.clone())
                    .metrics(metric)
                    .set_filter(filter.clone())
                    .set_group_by(group_by.clone().map(|group| vec![group]))
                    .set_next_page_token(next_page_token.take())
                    .send()
                    .await
                    .map_err(|error| {
                        CostApiError(format!(
                            "get cost and usage failed: {}",
                            DisplayErrorContext(&error)
                        ))
                    })?;

                for result in output.results_by_time() {
                    buckets.push(cost_bucket(result, metric)?);
                }
                match output.next_page_token() {
                    Some(token) if !token.is_empty() => next_page_token = Some(token.to_string()),
                    _ => break,
                }
            }
            Ok::<_, CostApiError>(buckets)
        })
    }
}

fn exclusion_filter(query: &CostQuery) -> Option<Expression> {
    if query.excluded_record_types.is_empty() {
        return None;
    }
    let record_types = DimensionValues::builder()
        .key(Dimension::from(RECORD_TYPE_DIMENSION))
        .set_values(Some(
            query
                .excluded_record_types
                .iter()
                .map(|record_type| record_type.as_str().to_string())
                .collect(),
        ))
        .build();
    Some(
        Expression::builder()
            .not(Expression::builder().dimensions(record_types).build())
            .build(),
    )
}

fn cost_bucket(result: &ResultByTime, metric: &str) -> Result<CostBucket, CostApiError> {
    let start = result
        .time_period()
        .map(|period| parse_period_start(period.start()))
        .transpose()?
        .ok_or_else(|| CostApiError("cost result without a time period".to_string()))?;

    let groups = result
        .groups()
        .iter()
        .map(|group| {
            Ok(CostGroup {
                key: group.keys().join(","),
                amount: metric_amount(group.metrics(), metric)?,
            })
        })
        .collect::<Result<Vec<_>, CostApiError>>()?;

    let total = match result.total().and_then(|total| total.get(metric)) {
        Some(value) => parse_amount(value.amount())?,
        None => groups.iter().map(|group| group.amount).sum(),
    };

    Ok(CostBucket {
        start,
        total,
        groups,
    })
}

fn metric_amount(
    metrics: Option<&HashMap<String, MetricValue>>,
    metric: &str,
) -> Result<f64, CostApiError> {
    parse_amount(
        metrics
            .and_then(|metrics| metrics.get(metric))
            .and_then(MetricValue::amount),
    )
}

/// Amounts are decimal strings; a missing amount counts as zero.
fn parse_amount(raw: Option<&str>) -> Result<f64, CostApiError> {
    match raw {
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|error| CostApiError(format!("unparsable cost amount '{raw}': {error}"))),
        None => Ok(0.0),
    }
}

fn parse_period_start(raw: &str) -> Result<NaiveDate, CostApiError> {
    raw.parse::<NaiveDate>()
        .map_err(|error| CostApiError(format!("unparsable period start '{raw}': {error}")))
}
