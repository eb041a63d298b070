//! # Metrics
//!
//! The [`MetricTracer`] trait collects the metrics reported by the driver and
//! the training worker, and writes them out once per episode (epoch).
//!
//! [`LogTracer`] keeps per-epoch aggregates in memory and reports them
//! through `tracing`.

mod log_tracer;

use {
    crate::agents::DistributionStrategy,
    anyhow::Result,
    serde::{
        Deserialize,
        Serialize,
    },
    strum::{
        Display,
        EnumIter,
    },
};

pub use log_tracer::{
    EpochMetrics,
    LogTracer,
};

/// The metrics a run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum Metric {
    /// Mean of the train losses within an epoch.
    TrainLossMean,
    ExplorationRate,
    TotalScore,
}
impl Metric {
    /// Whether the epoch value is the mean of all updates, or just the last one.
    pub fn is_mean(&self) -> bool {
        matches!(self, Metric::TrainLossMean)
    }
}

/// Shared between the driver and the training worker, so every method takes
/// `&self`.
pub trait MetricTracer: Send + Sync {
    fn is_initialized(&self) -> bool;
    fn init(
        &self,
        strategy: DistributionStrategy,
    ) -> Result<()>;

    fn start_profiler(&self) -> Result<()>;
    fn stop_profiler(&self) -> Result<()>;

    fn update_metric(
        &self,
        metric: Metric,
        value: f64,
    ) -> Result<()>;

    /// Write out everything collected since the previous flush.
    fn flush_metrics(
        &self,
        epoch: usize,
    ) -> Result<()>;
}
