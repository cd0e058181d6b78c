//! AWS SDK implementations of the job ports.
//!
//! The jobs are synchronous; each adapter parks the current worker thread and
//! drives the SDK future on the surrounding multi-threaded Tokio runtime.

use std::future::Future;

pub mod cloudwatch;
pub mod cost_explorer;
pub mod logs;

pub use cloudwatch::CloudWatchPublisher;
pub use cost_explorer::CostExplorerApi;
pub use logs::CloudWatchLogsExportApi;

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
