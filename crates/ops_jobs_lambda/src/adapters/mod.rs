pub mod clock;
pub mod cost_explorer;
pub mod logs;
pub mod metrics;
