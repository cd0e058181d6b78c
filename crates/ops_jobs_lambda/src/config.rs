//! Environment-driven configuration for the Lambda binaries.
//!
//! Every constructor takes a lookup closure so tests can supply values without
//! mutating the process environment; `from_env` wraps `std::env::var`.

use std::str::FromStr;
use std::time::Duration;

use ops_jobs_core::contract::{
    DEFAULT_ENVIRONMENT, DEFAULT_EXPORT_PREFIX, DEFAULT_PROJECT_NAME, MAX_METRICS_PER_REQUEST,
};
use ops_jobs_core::retry::BackoffPolicy;
use thiserror::Error;

use crate::handlers::log_export::LogExportSettings;
use crate::logging::LogFormat;

/// CloudWatch rejects larger `PutMetricData` payloads.
pub const MAX_PROVIDER_BATCH_SIZE: usize = 1_000;
pub const DEFAULT_COST_EXPLORER_REGION: &str = "us-east-1";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be configured")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonConfig {
    pub project_name: String,
    pub environment: String,
    pub log_format: LogFormat,
}

impl CommonConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            project_name: string_or(&lookup, "PROJECT_NAME", DEFAULT_PROJECT_NAME),
            environment: string_or(&lookup, "ENVIRONMENT", DEFAULT_ENVIRONMENT),
            log_format: parse_or(&lookup, "LOG_FORMAT", LogFormat::Json)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogExportConfig {
    pub destination_bucket: String,
    /// `None` when `LOG_GROUPS` is unset; the invocation payload must then supply them.
    pub log_groups: Option<Vec<String>>,
    pub export_prefix: String,
    pub settings: LogExportSettings,
}

impl LogExportConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let destination_bucket = required(&lookup, "S3_BUCKET")?;
        let log_groups = lookup("LOG_GROUPS")
            .map(|raw| parse_log_groups(&raw))
            .transpose()?;

        let defaults = LogExportSettings::default();
        let backoff = BackoffPolicy {
            max_attempts: parse_or(
                &lookup,
                "EXPORT_MAX_ATTEMPTS",
                defaults.backoff.max_attempts,
            )?,
            initial_delay: seconds_or(
                &lookup,
                "EXPORT_INITIAL_BACKOFF_SECS",
                defaults.backoff.initial_delay,
            )?,
            multiplier: defaults.backoff.multiplier,
        };
        backoff.validate().map_err(|error| ConfigError::Invalid {
            name: "EXPORT_MAX_ATTEMPTS",
            reason: error.to_string(),
        })?;

        let settings = LogExportSettings {
            backoff,
            pacing: seconds_or(&lookup, "EXPORT_PACING_SECS", defaults.pacing)?,
            poll_interval: seconds_or(
                &lookup,
                "EXPORT_POLL_INTERVAL_SECS",
                defaults.poll_interval,
            )?,
            max_wait: seconds_or(&lookup, "EXPORT_MAX_WAIT_SECS", defaults.max_wait)?,
            timeout_policy: parse_or(&lookup, "EXPORT_TIMEOUT_POLICY", defaults.timeout_policy)?,
        };
        if settings.poll_interval.is_zero() && !settings.max_wait.is_zero() {
            return Err(ConfigError::Invalid {
                name: "EXPORT_POLL_INTERVAL_SECS",
                reason: "must be positive while EXPORT_MAX_WAIT_SECS is positive".to_string(),
            });
        }

        Ok(Self {
            destination_bucket,
            log_groups,
            export_prefix: string_or(&lookup, "EXPORT_PREFIX", DEFAULT_EXPORT_PREFIX),
            settings,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostMetricsConfig {
    pub project_name: String,
    pub environment: String,
    pub batch_size: usize,
    pub cost_explorer_region: String,
}

impl CostMetricsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let common = CommonConfig::from_lookup(&lookup)?;
        let batch_size = parse_or(&lookup, "METRICS_BATCH_SIZE", MAX_METRICS_PER_REQUEST)?;
        if batch_size == 0 || batch_size > MAX_PROVIDER_BATCH_SIZE {
            return Err(ConfigError::Invalid {
                name: "METRICS_BATCH_SIZE",
                reason: format!("must be between 1 and {MAX_PROVIDER_BATCH_SIZE}"),
            });
        }

        Ok(Self {
            project_name: common.project_name,
            environment: common.environment,
            batch_size,
            cost_explorer_region: string_or(
                &lookup,
                "COST_EXPLORER_REGION",
                DEFAULT_COST_EXPLORER_REGION,
            ),
        })
    }
}

/// `LOG_GROUPS` holds a JSON array of log group names.
pub fn parse_log_groups(raw: &str) -> Result<Vec<String>, ConfigError> {
    serde_json::from_str::<Vec<String>>(raw).map_err(|error| ConfigError::Invalid {
        name: "LOG_GROUPS",
        reason: format!("expected a JSON array of strings: {error}"),
    })
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    non_empty(lookup, name).ok_or(ConfigError::Missing(name))
}

fn string_or(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    non_empty(lookup, name).unwrap_or_else(|| default.to_string())
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(lookup, name) {
        Some(raw) => raw.parse().map_err(|error: T::Err| ConfigError::Invalid {
            name,
            reason: error.to_string(),
        }),
        None => Ok(default),
    }
}

fn seconds_or(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    parse_or(lookup, name, default.as_secs()).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::handlers::log_export::TimeoutPolicy;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |name: &str| values.get(name).cloned()
    }

    #[test]
    fn log_export_config_applies_defaults() {
        let config = LogExportConfig::from_lookup(lookup_from(&[
            ("S3_BUCKET", "archive-bucket"),
            ("LOG_GROUPS", r#"["/aws/ecs/app", "/aws/lambda/fn"]"#),
        ]))
        .expect("config should parse");

        assert_eq!(config.destination_bucket, "archive-bucket");
        assert_eq!(
            config.log_groups,
            Some(vec!["/aws/ecs/app".to_string(), "/aws/lambda/fn".to_string()])
        );
        assert_eq!(config.export_prefix, "cloudwatch-logs");
        assert_eq!(config.settings, LogExportSettings::default());
    }

    #[test]
    fn log_export_config_requires_bucket() {
        let error = LogExportConfig::from_lookup(lookup_from(&[("LOG_GROUPS", "[]")]))
            .expect_err("missing bucket should fail");
        assert_eq!(error, ConfigError::Missing("S3_BUCKET"));
        assert_eq!(error.to_string(), "S3_BUCKET must be configured");
    }

    #[test]
    fn log_export_config_rejects_malformed_log_groups() {
        let error = LogExportConfig::from_lookup(lookup_from(&[
            ("S3_BUCKET", "archive-bucket"),
            ("LOG_GROUPS", "/aws/ecs/app"),
        ]))
        .expect_err("non-json log groups should fail");
        assert!(error.to_string().starts_with("LOG_GROUPS is invalid"));
    }

    #[test]
    fn log_export_config_reads_overrides() {
        let config = LogExportConfig::from_lookup(lookup_from(&[
            ("S3_BUCKET", "archive-bucket"),
            ("EXPORT_PREFIX", "archive"),
            ("EXPORT_MAX_WAIT_SECS", "60"),
            ("EXPORT_POLL_INTERVAL_SECS", "5"),
            ("EXPORT_MAX_ATTEMPTS", "5"),
            ("EXPORT_TIMEOUT_POLICY", "count_as_failed"),
        ]))
        .expect("config should parse");

        assert_eq!(config.log_groups, None);
        assert_eq!(config.export_prefix, "archive");
        assert_eq!(config.settings.max_wait, Duration::from_secs(60));
        assert_eq!(config.settings.poll_interval, Duration::from_secs(5));
        assert_eq!(config.settings.backoff.max_attempts, 5);
        assert_eq!(config.settings.timeout_policy, TimeoutPolicy::CountAsFailed);
    }

    #[test]
    fn log_export_config_names_the_bad_variable() {
        let error = LogExportConfig::from_lookup(lookup_from(&[
            ("S3_BUCKET", "archive-bucket"),
            ("EXPORT_MAX_WAIT_SECS", "soon"),
        ]))
        .expect_err("non-numeric wait should fail");
        assert!(matches!(
            error,
            ConfigError::Invalid {
                name: "EXPORT_MAX_WAIT_SECS",
                ..
            }
        ));
    }

    #[test]
    fn cost_config_defaults_to_sdt_dev_and_batches_of_twenty() {
        let config = CostMetricsConfig::from_lookup(lookup_from(&[])).expect("config");
        assert_eq!(config.project_name, "sdt");
        assert_eq!(config.environment, "dev");
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.cost_explorer_region, "us-east-1");
    }

    #[test]
    fn cost_config_rejects_out_of_range_batch_size() {
        for raw in ["0", "1001"] {
            let error =
                CostMetricsConfig::from_lookup(lookup_from(&[("METRICS_BATCH_SIZE", raw)]))
                    .expect_err("batch size should be rejected");
            assert!(error.to_string().contains("METRICS_BATCH_SIZE"));
        }
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let common = CommonConfig::from_lookup(lookup_from(&[
            ("PROJECT_NAME", "  "),
            ("ENVIRONMENT", "prod"),
            ("LOG_FORMAT", "pretty"),
        ]))
        .expect("config");
        assert_eq!(common.project_name, "sdt");
        assert_eq!(common.environment, "prod");
        assert_eq!(common.log_format, LogFormat::Pretty);
    }
}
