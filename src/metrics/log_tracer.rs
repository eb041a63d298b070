use {
    super::{
        Metric,
        MetricTracer,
    },
    crate::{
        agents::DistributionStrategy,
        configs::MetricsConfig,
    },
    anyhow::Result,
    parking_lot::Mutex,
    std::{
        collections::BTreeMap,
        sync::atomic::{
            AtomicBool,
            Ordering,
        },
        time::Instant,
    },
    tracing::{
        debug,
        info,
        warn,
    },
};

/// The values of one flushed epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub values: BTreeMap<Metric, f64>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Aggregate {
    sum: f64,
    count: usize,
    last: f64,
}
impl Aggregate {
    fn push(
        &mut self,
        value: f64,
    ) {
        self.sum += value;
        self.count += 1;
        self.last = value;
    }

    fn value(
        &self,
        metric: Metric,
    ) -> f64 {
        if metric.is_mean() {
            self.sum / self.count as f64
        } else {
            self.last
        }
    }
}

/// A [`MetricTracer`] that reports through `tracing` and keeps the history of
/// all flushed epochs.
pub struct LogTracer {
    config: MetricsConfig,
    initialized: AtomicBool,
    profiler_start: Mutex<Option<Instant>>,
    aggregates: Mutex<BTreeMap<Metric, Aggregate>>,
    history: Mutex<Vec<EpochMetrics>>,
}
impl LogTracer {
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            config,
            initialized: AtomicBool::new(false),
            profiler_start: Mutex::new(None),
            aggregates: Mutex::new(BTreeMap::new()),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn history(&self) -> Vec<EpochMetrics> {
        self.history.lock().clone()
    }

    fn is_enabled(
        &self,
        metric: Metric,
    ) -> bool {
        self.config.enabled_metrics.contains(&metric)
    }
}
impl Default for LogTracer {
    fn default() -> Self {
        Self::new(MetricsConfig::default())
    }
}

impl MetricTracer for LogTracer {
    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    fn init(
        &self,
        strategy: DistributionStrategy,
    ) -> Result<()> {
        info!("metrics traced with the {strategy} strategy: {:?}", self.config.enabled_metrics);
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    fn start_profiler(&self) -> Result<()> {
        if self.config.profiler_enabled {
            *self.profiler_start.lock() = Some(Instant::now());
        }
        Ok(())
    }

    fn stop_profiler(&self) -> Result<()> {
        if let Some(start) = self.profiler_start.lock().take() {
            warn!("profiled run took {:.3}s", start.elapsed().as_secs_f64());
        }
        Ok(())
    }

    fn update_metric(
        &self,
        metric: Metric,
        value: f64,
    ) -> Result<()> {
        if self.is_enabled(metric) {
            self.aggregates.lock().entry(metric).or_default().push(value);
        } else {
            debug!("dropped update of disabled metric {metric}");
        }
        Ok(())
    }

    fn flush_metrics(
        &self,
        epoch: usize,
    ) -> Result<()> {
        let aggregates = std::mem::take(&mut *self.aggregates.lock());
        let values: BTreeMap<Metric, f64> = aggregates
            .into_iter()
            .map(|(metric, aggregate)| (metric, aggregate.value(metric)))
            .collect();
        for (metric, value) in values.iter() {
            info!("epoch {epoch}: {metric} = {value}");
        }
        self.history.lock().push(EpochMetrics { epoch, values });
        Ok(())
    }
}
