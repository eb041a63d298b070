use {
    crate::{
        agents::Agent,
        error::DriverError,
        metrics::{
            Metric,
            MetricTracer,
        },
    },
    anyhow::{
        anyhow,
        Result,
    },
    crossbeam_channel::{
        bounded,
        Receiver,
        RecvTimeoutError,
    },
    serde::Serialize,
    std::{
        sync::{
            atomic::{
                AtomicBool,
                Ordering,
            },
            Arc,
        },
        thread::{
            self,
            JoinHandle,
        },
        time::Duration,
    },
    tracing::{
        error,
        warn,
    },
};

pub const TRAINING_THREAD_NAME: &str = "training";

/// Counters of how training went during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrainStats {
    /// Train steps executed on the driver thread.
    pub inline_steps: usize,
    /// How often a training worker was started.
    pub worker_starts: usize,
    /// Training iterations run by the worker.
    pub worker_iterations: usize,
}

/// How the driver executes a train step.
pub trait TrainStrategy {
    /// Called once per driver step while training is enabled.
    fn train_step(
        &mut self,
        episode: usize,
        step: usize,
    ) -> Result<()>;

    /// Stop anything still running in the background. Calling it again is a
    /// no-op.
    fn stop(&mut self) -> Result<()>;

    fn stats(&self) -> TrainStats;
}

/// Tick and train the agent inline, once per step.
pub struct SyncTrainStep<A: Agent + ?Sized, M: MetricTracer + ?Sized> {
    agent: Arc<A>,
    metrics: Arc<M>,
    steps: usize,
}
impl<A: Agent + ?Sized, M: MetricTracer + ?Sized> SyncTrainStep<A, M> {
    pub fn new(
        agent: Arc<A>,
        metrics: Arc<M>,
    ) -> Self {
        Self {
            agent,
            metrics,
            steps: 0,
        }
    }
}

impl<A: Agent + ?Sized, M: MetricTracer + ?Sized> TrainStrategy for SyncTrainStep<A, M> {
    fn train_step(
        &mut self,
        episode: usize,
        step: usize,
    ) -> Result<()> {
        self.agent.tick(episode, step);
        let loss = self.agent.train()?;
        self.metrics.update_metric(Metric::TrainLossMean, loss)?;
        self.steps += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn stats(&self) -> TrainStats {
        TrainStats {
            inline_steps: self.steps,
            ..Default::default()
        }
    }
}

/// Train on a background [`TrainingWorker`].
///
/// The first train step starts the worker, every step after that only ticks
/// the agent. The worker is started at most once per run.
pub struct AsyncTrainStep<A: Agent + ?Sized, M: MetricTracer + ?Sized> {
    agent: Arc<A>,
    metrics: Arc<M>,
    join_timeout: Duration,
    worker: Option<TrainingWorker>,
    stats: TrainStats,
}
impl<A, M> AsyncTrainStep<A, M>
where
    A: Agent + ?Sized + 'static,
    M: MetricTracer + ?Sized + 'static,
{
    pub fn new(
        agent: Arc<A>,
        metrics: Arc<M>,
        join_timeout: Duration,
    ) -> Self {
        Self {
            agent,
            metrics,
            join_timeout,
            worker: None,
            stats: TrainStats::default(),
        }
    }

    /// Whether the worker is currently alive.
    pub fn is_worker_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|worker| !worker.is_finished())
    }

    fn stop_worker(&mut self) -> Result<()> {
        if let Some(worker) = self.worker.take() {
            let iterations = worker.stop(self.join_timeout)?;
            self.stats.worker_iterations += iterations;
            warn!("training worker stopped after {iterations} iterations");
        }
        Ok(())
    }
}

impl<A, M> TrainStrategy for AsyncTrainStep<A, M>
where
    A: Agent + ?Sized + 'static,
    M: MetricTracer + ?Sized + 'static,
{
    fn train_step(
        &mut self,
        episode: usize,
        step: usize,
    ) -> Result<()> {
        if self.worker.as_ref().is_some_and(TrainingWorker::is_finished) {
            // the worker only exits on its own when training failed
            self.stop_worker()?;
            Err(anyhow!("training worker exited while the driver was running"))?
        }

        self.agent.tick(episode, step);
        if self.stats.worker_starts == 0 {
            self.worker = Some(TrainingWorker::spawn(self.agent.clone(), self.metrics.clone())?);
            self.stats.worker_starts += 1;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.stop_worker()
    }

    fn stats(&self) -> TrainStats {
        self.stats
    }
}

/// The background thread of the asynchronous training mode.
///
/// The worker calls `agent.train()` and reports the loss until its running
/// flag is cleared, always at least once. A failing train call ends the
/// worker, the error is returned from [`TrainingWorker::stop`].
pub struct TrainingWorker {
    running: Arc<AtomicBool>,
    done: Receiver<()>,
    handle: Option<JoinHandle<Result<usize>>>,
}
impl TrainingWorker {
    pub fn spawn<A, M>(
        agent: Arc<A>,
        metrics: Arc<M>,
    ) -> Result<Self>
    where
        A: Agent + ?Sized + 'static,
        M: MetricTracer + ?Sized + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let (done_tx, done) = bounded(1);

        let flag = running.clone();
        let handle = thread::Builder::new()
            .name(TRAINING_THREAD_NAME.to_string())
            .spawn(move || {
                let result = train_loop(agent.as_ref(), metrics.as_ref(), &flag);
                if let Err(e) = &result {
                    error!("training failed: {e:#}");
                }
                let _ = done_tx.send(());
                result
            })?;
        warn!("training worker started");

        Ok(Self {
            running,
            done,
            handle: Some(handle),
        })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Clear the running flag and wait up to `timeout` for the worker to exit.
    ///
    /// Returns the number of training iterations, or the error that ended
    /// the worker.
    pub fn stop(
        mut self,
        timeout: Duration,
    ) -> Result<usize> {
        self.running.store(false, Ordering::Release);
        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
            Err(RecvTimeoutError::Timeout) => Err(DriverError::WorkerShutdown(timeout))?,
        }

        let handle = self
            .handle
            .take()
            .ok_or_else(|| anyhow!("training worker was already joined"))?;
        handle.join().map_err(|_| DriverError::WorkerPanicked)?
    }
}

impl Drop for TrainingWorker {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

fn train_loop<A, M>(
    agent: &A,
    metrics: &M,
    running: &AtomicBool,
) -> Result<usize>
where
    A: Agent + ?Sized,
    M: MetricTracer + ?Sized,
{
    // at least one iteration, the driver may clear the flag before the
    // thread is first scheduled
    let mut iterations = 0;
    loop {
        let loss = agent.train()?;
        metrics.update_metric(Metric::TrainLossMean, loss)?;
        iterations += 1;
        if !running.load(Ordering::Acquire) {
            return Ok(iterations);
        }
    }
}
