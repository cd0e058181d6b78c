pub mod cost_metrics;
pub mod log_export;
