use {
    anyhow::{
        anyhow,
        Result,
    },
    candle_core::{
        DType,
        Device,
        Tensor,
    },
    episodic_rl::{
        agents::{
            Agent,
            DistributionStrategy,
            TrainLoss,
        },
        components::{
            TensorSpec,
            TransitionId,
        },
        configs::{
            DriverConfig,
            TrainMode,
        },
        engines::{
            DriverPhase,
            EpisodeDriver,
            EpisodeState,
            StateType,
            TRAINING_THREAD_NAME,
        },
        envs::{
            Action,
            Game,
            Observation,
        },
        error::DriverError,
        metrics::{
            Metric,
            MetricTracer,
        },
    },
    parking_lot::Mutex,
    std::{
        collections::BTreeMap,
        sync::{
            atomic::{
                AtomicBool,
                AtomicUsize,
                Ordering,
            },
            Arc,
        },
        thread,
        time::Duration,
    },
    uuid::Uuid,
};

const SCREEN: &str = "screen";

fn observation(value: f32) -> Observation {
    Observation::single(SCREEN, Tensor::full(value, 2, &Device::Cpu).unwrap())
}

fn marker(observation: &Observation) -> f32 {
    observation.get(SCREEN).unwrap().to_vec1::<f32>().unwrap()[0]
}

/// Ends every episode after `episode_length` actions, 0 for never. The
/// observation after the n-th action of an episode is marked `10 * n`, after
/// processing ticks it is marked `1000 + ticks`.
struct MockGame {
    episode_length: usize,
    initialized: bool,
    inits: usize,
    steps: usize,
    score: f64,
    ticks: usize,
    current: Option<Observation>,
}
impl MockGame {
    fn new(episode_length: usize) -> Self {
        Self {
            episode_length,
            initialized: false,
            inits: 0,
            steps: 0,
            score: 0.0,
            ticks: 0,
            current: None,
        }
    }
}
impl Game for MockGame {
    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn init(&mut self) -> Result<()> {
        self.initialized = true;
        self.inits += 1;
        Ok(())
    }

    fn reset(&mut self) -> Result<Observation> {
        self.steps = 0;
        self.score = 0.0;
        self.current = Some(observation(-1.0));
        Ok(observation(-1.0))
    }

    fn make_action(
        &mut self,
        _action: &Action,
    ) -> Result<(Observation, f64)> {
        self.steps += 1;
        self.score += 1.0;
        let next = observation(10.0 * self.steps as f32);
        self.current = Some(next.clone());
        Ok((next, 1.0))
    }

    fn is_episode_finished(&self) -> bool {
        self.episode_length > 0 && self.steps >= self.episode_length
    }

    fn process_ticks(
        &mut self,
        ticks: usize,
    ) -> Result<()> {
        self.ticks += ticks;
        self.current = Some(observation(1000.0 + self.ticks as f32));
        Ok(())
    }

    fn current_observation(&self) -> Result<Observation> {
        self.current.clone().ok_or_else(|| anyhow!("no observation"))
    }

    fn total_score(&self) -> f64 {
        self.score
    }

    fn observation_space(&self) -> Result<Vec<TensorSpec>> {
        Ok(vec![TensorSpec::new(SCREEN, DType::F32, &[2])])
    }

    fn action_space(&self) -> Result<TensorSpec> {
        Ok(TensorSpec::new("action_space", DType::U32, &[2]))
    }
}

#[derive(Default)]
struct MockAgent {
    initialized: AtomicBool,
    init_calls: AtomicUsize,
    ticks: AtomicUsize,
    train_calls: Arc<AtomicUsize>,
    persist_calls: AtomicUsize,
    // fail every train call from this call on
    fail_train_from: Option<usize>,
    train_delay: Duration,
    seen: Mutex<Vec<(usize, StateType, f32)>>,
    stored: Mutex<Vec<(f64, bool)>>,
    train_threads: Mutex<Vec<Option<String>>>,
}
impl MockAgent {
    fn train_calls(&self) -> usize {
        self.train_calls.load(Ordering::SeqCst)
    }
}
impl Agent for MockAgent {
    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    fn init(
        &self,
        observation_space: &[TensorSpec],
        action_space: &TensorSpec,
    ) -> Result<()> {
        assert_eq!(observation_space[0].name(), SCREEN);
        assert_eq!(action_space.shape(), &[2]);
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn tick(
        &self,
        _episode: usize,
        _step: usize,
    ) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
    }

    fn take_action(
        &self,
        state: &EpisodeState,
    ) -> Result<Action> {
        self.seen.lock().push((
            state.state_id(),
            state.state_type(),
            marker(state.observation()),
        ));
        Ok(Action::Discrete(1))
    }

    fn train(&self) -> Result<TrainLoss> {
        let call = self.train_calls.fetch_add(1, Ordering::SeqCst);
        self.train_threads
            .lock()
            .push(thread::current().name().map(str::to_string));
        if !self.train_delay.is_zero() {
            thread::sleep(self.train_delay);
        }
        match self.fail_train_from {
            Some(from) if call >= from => Err(anyhow!("boom")),
            _ => Ok(0.5),
        }
    }

    fn store_transition(
        &self,
        state: &EpisodeState,
    ) -> Result<TransitionId> {
        assert_eq!(state.transition(), Some(&Action::Discrete(1)));
        assert!(state.transitioned_observation().is_some());
        self.stored.lock().push((state.reward(), state.is_end_state()));
        Ok(Uuid::new_v4())
    }

    fn exploration_rate(&self) -> f64 {
        0.25
    }

    fn distribution_strategy(&self) -> DistributionStrategy {
        DistributionStrategy::SingleDevice
    }

    fn persist_model(&self) -> Result<()> {
        self.persist_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct MockTracer {
    initialized: AtomicBool,
    profiler_starts: AtomicUsize,
    profiler_stops: AtomicUsize,
    updates: Mutex<BTreeMap<Metric, Vec<f64>>>,
    flushes: Mutex<Vec<usize>>,
}
impl MetricTracer for MockTracer {
    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    fn init(
        &self,
        _strategy: DistributionStrategy,
    ) -> Result<()> {
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn start_profiler(&self) -> Result<()> {
        self.profiler_starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop_profiler(&self) -> Result<()> {
        self.profiler_stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn update_metric(
        &self,
        metric: Metric,
        value: f64,
    ) -> Result<()> {
        self.updates.lock().entry(metric).or_default().push(value);
        Ok(())
    }

    fn flush_metrics(
        &self,
        epoch: usize,
    ) -> Result<()> {
        self.flushes.lock().push(epoch);
        Ok(())
    }
}

fn config(
    max_episodes: usize,
    train_mode: TrainMode,
) -> DriverConfig {
    DriverConfig {
        max_episodes,
        max_steps: 100,
        sleep_time: 0.0,
        action_frequency: 0,
        training_enabled: true,
        train_mode,
        worker_join_timeout: 5.0,
    }
}

fn driver(
    game: MockGame,
    agent: &Arc<MockAgent>,
    tracer: &Arc<MockTracer>,
    config: DriverConfig,
) -> EpisodeDriver<MockGame, MockAgent, MockTracer> {
    EpisodeDriver::new(game, agent.clone(), tracer.clone(), config).unwrap()
}

#[test]
fn sync_run_trains_every_step() {
    let agent = Arc::new(MockAgent::default());
    let tracer = Arc::new(MockTracer::default());
    let mut driver = driver(MockGame::new(3), &agent, &tracer, config(2, TrainMode::Sync));

    let summary = driver.run().unwrap();
    assert_eq!(summary.episodes, 2);
    assert_eq!(summary.global_steps, 6);
    assert_eq!(summary.scores, vec![3.0, 3.0]);
    assert_eq!(summary.train.inline_steps, 6);
    assert_eq!(summary.train.worker_starts, 0);

    assert_eq!(agent.train_calls(), 6);
    assert_eq!(agent.ticks.load(Ordering::SeqCst), 6);
    assert!(agent
        .train_threads
        .lock()
        .iter()
        .all(|name| name.as_deref() != Some(TRAINING_THREAD_NAME)));

    let stored = agent.stored.lock().clone();
    let terminals: Vec<bool> = stored.iter().map(|(_, terminal)| *terminal).collect();
    assert_eq!(terminals, vec![false, false, true, false, false, true]);
    assert!(stored.iter().all(|(reward, _)| *reward == 1.0));

    let updates = tracer.updates.lock();
    assert_eq!(updates[&Metric::TrainLossMean].len(), 6);
    assert_eq!(updates[&Metric::ExplorationRate], vec![0.25, 0.25]);
    assert_eq!(updates[&Metric::TotalScore], vec![3.0, 3.0]);
    assert_eq!(*tracer.flushes.lock(), vec![1, 2]);
}

#[test]
fn initializes_and_terminates_once() {
    let agent = Arc::new(MockAgent::default());
    let tracer = Arc::new(MockTracer::default());
    let mut driver = driver(MockGame::new(2), &agent, &tracer, config(1, TrainMode::Sync));
    assert_eq!(driver.phase(), DriverPhase::Uninitialized);

    driver.run().unwrap();
    assert_eq!(driver.phase(), DriverPhase::Terminated);
    assert_eq!(driver.game().inits, 1);
    assert_eq!(agent.init_calls.load(Ordering::SeqCst), 1);
    assert!(tracer.is_initialized());
    assert_eq!(tracer.profiler_starts.load(Ordering::SeqCst), 1);
    assert_eq!(tracer.profiler_stops.load(Ordering::SeqCst), 1);
    assert_eq!(agent.persist_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn a_driver_runs_only_once() {
    let agent = Arc::new(MockAgent::default());
    let tracer = Arc::new(MockTracer::default());
    let mut driver = driver(MockGame::new(2), &agent, &tracer, config(1, TrainMode::Sync));
    driver.run().unwrap();

    let error = driver.run().unwrap_err();
    assert!(matches!(
        error.downcast_ref::<DriverError>(),
        Some(DriverError::AlreadyRan)
    ));
    assert_eq!(agent.persist_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn states_carry_the_episode_number() {
    let agent = Arc::new(MockAgent::default());
    let tracer = Arc::new(MockTracer::default());
    let mut driver = driver(MockGame::new(2), &agent, &tracer, config(2, TrainMode::Sync));
    driver.run().unwrap();

    let seen: Vec<(usize, StateType)> = agent
        .seen
        .lock()
        .iter()
        .map(|(id, state_type, _)| (*id, *state_type))
        .collect();
    assert_eq!(
        seen,
        vec![
            (1, StateType::Initial),
            (1, StateType::Active),
            (2, StateType::Initial),
            (2, StateType::Active),
        ]
    );
}

#[test]
fn without_frame_skip_the_next_state_starts_from_the_transitioned_observation() {
    let agent = Arc::new(MockAgent::default());
    let tracer = Arc::new(MockTracer::default());
    let mut driver = driver(MockGame::new(3), &agent, &tracer, config(1, TrainMode::Sync));
    driver.run().unwrap();

    let markers: Vec<f32> = agent.seen.lock().iter().map(|(_, _, marker)| *marker).collect();
    assert_eq!(markers, vec![-1.0, 10.0, 20.0]);
    assert_eq!(driver.game().ticks, 0);
}

#[test]
fn with_frame_skip_the_next_state_starts_from_the_current_observation() {
    let agent = Arc::new(MockAgent::default());
    let tracer = Arc::new(MockTracer::default());
    let config = DriverConfig {
        action_frequency: 2,
        ..config(1, TrainMode::Sync)
    };
    let mut driver = driver(MockGame::new(3), &agent, &tracer, config);
    driver.run().unwrap();

    let markers: Vec<f32> = agent.seen.lock().iter().map(|(_, _, marker)| *marker).collect();
    assert_eq!(markers, vec![-1.0, 1002.0, 1004.0]);
    assert_eq!(driver.game().ticks, 6);
}

#[test]
fn episodes_are_cut_off_after_max_steps() {
    let agent = Arc::new(MockAgent::default());
    let tracer = Arc::new(MockTracer::default());
    let config = DriverConfig {
        max_steps: 3,
        ..config(1, TrainMode::Sync)
    };
    // the game itself never ends an episode
    let mut driver = driver(MockGame::new(0), &agent, &tracer, config);
    let summary = driver.run().unwrap();

    // the step counter is checked before it is incremented
    assert_eq!(summary.global_steps, 4);
    let terminals: Vec<bool> = agent.stored.lock().iter().map(|(_, terminal)| *terminal).collect();
    assert_eq!(terminals, vec![false, false, false, true]);
}

#[test]
fn disabled_training_never_ticks() {
    let agent = Arc::new(MockAgent::default());
    let tracer = Arc::new(MockTracer::default());
    let config = DriverConfig {
        training_enabled: false,
        ..config(2, TrainMode::Async)
    };
    let mut driver = driver(MockGame::new(3), &agent, &tracer, config);
    let summary = driver.run().unwrap();

    assert_eq!(summary.global_steps, 6);
    assert_eq!(summary.train.worker_starts, 0);
    assert_eq!(agent.ticks.load(Ordering::SeqCst), 0);
    assert_eq!(agent.train_calls(), 0);
    assert!(!tracer.updates.lock().contains_key(&Metric::TrainLossMean));
}

#[test]
fn sync_train_errors_end_the_run() {
    let agent = Arc::new(MockAgent {
        fail_train_from: Some(2),
        ..Default::default()
    });
    let tracer = Arc::new(MockTracer::default());
    let mut driver = driver(MockGame::new(5), &agent, &tracer, config(2, TrainMode::Sync));

    let error = driver.run().unwrap_err();
    assert_eq!(error.to_string(), "boom");
    assert_eq!(agent.train_calls(), 3);
    assert_eq!(agent.stored.lock().len(), 3);
    assert_eq!(agent.persist_calls.load(Ordering::SeqCst), 0);
    assert_eq!(driver.phase(), DriverPhase::Terminated);
}

#[test]
fn async_run_trains_on_a_single_worker() {
    let agent = Arc::new(MockAgent {
        train_delay: Duration::from_millis(1),
        ..Default::default()
    });
    let tracer = Arc::new(MockTracer::default());
    let config = DriverConfig {
        sleep_time: 0.002,
        ..config(3, TrainMode::Async)
    };
    let mut driver = driver(MockGame::new(5), &agent, &tracer, config);

    let summary = driver.run().unwrap();
    assert_eq!(summary.episodes, 3);
    assert_eq!(summary.global_steps, 15);
    assert_eq!(summary.train.worker_starts, 1);
    assert_eq!(summary.train.inline_steps, 0);
    assert_eq!(agent.ticks.load(Ordering::SeqCst), 15);

    let calls = agent.train_calls();
    assert_eq!(summary.train.worker_iterations, calls);
    assert!(agent
        .train_threads
        .lock()
        .iter()
        .all(|name| name.as_deref() == Some(TRAINING_THREAD_NAME)));

    // the worker is gone once run() returns
    thread::sleep(Duration::from_millis(50));
    assert_eq!(agent.train_calls(), calls);
    assert_eq!(
        tracer.updates.lock().get(&Metric::TrainLossMean).map_or(0, Vec::len),
        calls,
    );
    assert_eq!(agent.persist_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn async_train_errors_end_the_run() {
    let agent = Arc::new(MockAgent {
        fail_train_from: Some(0),
        ..Default::default()
    });
    let tracer = Arc::new(MockTracer::default());
    let mut driver = driver(MockGame::new(5), &agent, &tracer, config(3, TrainMode::Async));

    let error = driver.run().unwrap_err();
    assert!(format!("{error:#}").contains("boom"));
    assert_eq!(agent.train_calls(), 1);
    assert_eq!(agent.persist_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn a_stuck_worker_fails_the_shutdown() {
    let agent = Arc::new(MockAgent {
        train_delay: Duration::from_millis(500),
        ..Default::default()
    });
    let tracer = Arc::new(MockTracer::default());
    let config = DriverConfig {
        worker_join_timeout: 0.05,
        ..config(1, TrainMode::Async)
    };
    let mut driver = driver(MockGame::new(2), &agent, &tracer, config);

    let error = driver.run().unwrap_err();
    assert!(matches!(
        error.downcast_ref::<DriverError>(),
        Some(DriverError::WorkerShutdown(_))
    ));
}

#[test]
fn async_worker_trains_even_on_a_one_step_run() {
    let agent = Arc::new(MockAgent::default());
    let tracer = Arc::new(MockTracer::default());
    let mut driver = driver(MockGame::new(1), &agent, &tracer, config(1, TrainMode::Async));

    let summary = driver.run().unwrap();
    assert_eq!(summary.global_steps, 1);
    assert_eq!(summary.train.worker_starts, 1);
    assert!(summary.train.worker_iterations >= 1);
    assert_eq!(summary.train.worker_iterations, agent.train_calls());
}
