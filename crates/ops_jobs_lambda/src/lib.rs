//! AWS-oriented adapters and handlers for the scheduled observability jobs.
//!
//! This crate owns runtime integration details: the ports the jobs talk to,
//! the job handlers themselves, env configuration, logging setup, and the AWS
//! SDK implementations used by the Lambda binaries in `src/bin/`.

pub mod adapters;
pub mod aws;
pub mod config;
pub mod handlers;
pub mod logging;
#[cfg(feature = "test-helpers")]
pub mod test_helpers;
