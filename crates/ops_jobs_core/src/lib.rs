//! Shared domain primitives for the scheduled log-export and cost-metrics jobs.
//!
//! This crate owns the deterministic parts of both jobs: time windows, archive
//! keys, retry/backoff, publish batching, and cost-to-metric transformation.
//! It intentionally excludes AWS SDK and Lambda runtime concerns.

pub mod batching;
pub mod contract;
pub mod cost;
pub mod retry;
pub mod storage_keys;
pub mod windows;
