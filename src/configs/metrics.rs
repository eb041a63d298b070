use {
    crate::metrics::Metric,
    serde::{
        Deserialize,
        Serialize,
    },
    strum::IntoEnumIterator,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    // Metrics that are traced, updates of any other metric are dropped.
    pub enabled_metrics: Vec<Metric>,
    // Log the wall time of the whole run when the profiler stops.
    pub profiler_enabled: bool,
}
impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled_metrics: Metric::iter().collect(),
            profiler_enabled: true,
        }
    }
}
