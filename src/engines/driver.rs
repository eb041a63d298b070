use {
    super::{
        state::{
            EpisodeState,
            StateType,
        },
        train_step::{
            AsyncTrainStep,
            SyncTrainStep,
            TrainStats,
            TrainStrategy,
        },
    },
    crate::{
        agents::Agent,
        configs::{
            DriverConfig,
            TrainMode,
        },
        envs::Game,
        error::DriverError,
        metrics::{
            Metric,
            MetricTracer,
        },
    },
    anyhow::Result,
    serde::Serialize,
    std::{
        sync::Arc,
        thread,
    },
    tracing::{
        error,
        info,
        warn,
    },
};

/// The lifecycle of an [`EpisodeDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverPhase {
    Uninitialized,
    Running,
    Terminated,
}

/// What a finished run looked like.
///
/// # Fields
/// * `episodes` - The number of completed episodes.
/// * `global_steps` - The number of steps over all episodes.
/// * `scores` - The total score of every episode.
/// * `train` - How often training ran, inline and on the worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub episodes: usize,
    pub global_steps: usize,
    pub scores: Vec<f64>,
    pub train: TrainStats,
}

/// Runs a [`Game`] and an [`Agent`] through a number of episodes.
///
/// Every step the agent picks an action for the current state, the game
/// applies it, and the resulting transition is handed back to the agent for
/// storage. With training enabled the agent is trained either inline
/// ([`TrainMode::Sync`]) or on a background thread ([`TrainMode::Async`]).
/// At the end of every episode the exploration rate and the score are
/// reported and the metrics are flushed.
///
/// A driver runs once, errors of any collaborator end the run.
pub struct EpisodeDriver<G, A, M>
where
    G: Game,
    A: Agent + ?Sized,
    M: MetricTracer + ?Sized,
{
    game: G,
    agent: Arc<A>,
    metrics: Arc<M>,
    config: DriverConfig,
    phase: DriverPhase,
}

impl<G, A, M> EpisodeDriver<G, A, M>
where
    G: Game,
    A: Agent + ?Sized + 'static,
    M: MetricTracer + ?Sized + 'static,
{
    pub fn new(
        game: G,
        agent: Arc<A>,
        metrics: Arc<M>,
        config: DriverConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            game,
            agent,
            metrics,
            config,
            phase: DriverPhase::Uninitialized,
        })
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn phase(&self) -> DriverPhase {
        self.phase
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn agent(&self) -> &Arc<A> {
        &self.agent
    }

    pub fn metrics(&self) -> &Arc<M> {
        &self.metrics
    }

    /// Initialize the collaborators, run all episodes and shut down.
    pub fn run(&mut self) -> Result<RunSummary> {
        if self.phase != DriverPhase::Uninitialized {
            Err(DriverError::AlreadyRan)?
        }
        self.phase = DriverPhase::Running;
        let result = self.execute();
        self.phase = DriverPhase::Terminated;
        result
    }

    fn execute(&mut self) -> Result<RunSummary> {
        self.initialize()?;

        let mut strategy = self.train_strategy();
        let (scores, global_steps) = match self.run_loop(strategy.as_mut()) {
            Ok(progress) => progress,
            Err(e) => {
                if let Err(stop_error) = strategy.stop() {
                    error!("failed to stop training after an error: {stop_error:#}");
                }
                return Err(e);
            }
        };
        self.terminate(strategy.as_mut())?;

        let summary = RunSummary {
            episodes: scores.len(),
            global_steps,
            scores,
            train: strategy.stats(),
        };
        warn!(
            "run finished: {} episodes, {} steps, {:?}",
            summary.episodes, summary.global_steps, summary.train,
        );
        Ok(summary)
    }

    fn train_strategy(&self) -> Box<dyn TrainStrategy> {
        match self.config.train_mode {
            TrainMode::Sync => Box::new(SyncTrainStep::new(
                self.agent.clone(),
                self.metrics.clone(),
            )),
            TrainMode::Async => Box::new(AsyncTrainStep::new(
                self.agent.clone(),
                self.metrics.clone(),
                self.config.join_timeout(),
            )),
        }
    }

    fn initialize(&mut self) -> Result<()> {
        if !self.game.is_initialized() {
            self.game.init()?;
        }
        if !self.agent.is_initialized() {
            let observation_space = self.game.observation_space()?;
            let action_space = self.game.action_space()?;
            info!("observation space: {observation_space:?}");
            info!("action space: {action_space}");
            self.agent.init(&observation_space, &action_space)?;
        }
        if !self.metrics.is_initialized() {
            self.metrics.init(self.agent.distribution_strategy())?;
        }
        self.metrics.start_profiler()?;

        warn!(
            "starting {} episodes, training: {} ({})",
            self.config.max_episodes, self.config.training_enabled, self.config.train_mode,
        );
        Ok(())
    }

    /// Returns the score of every episode and the number of global steps.
    fn run_loop(
        &mut self,
        strategy: &mut dyn TrainStrategy,
    ) -> Result<(Vec<f64>, usize)> {
        let mut global_step = 0;
        let mut scores = Vec::with_capacity(self.config.max_episodes);

        for episode in 0..self.config.max_episodes {
            let state_id = episode + 1;
            let mut step_counter = 0;
            let mut state = EpisodeState::new(state_id, self.game.reset()?, StateType::Initial);

            loop {
                let action = self.agent.take_action(&state)?;
                state.set_transition(action.clone());
                let (next_observation, reward) = self.game.make_action(&action)?;
                state.set_transitioned_observation(next_observation.clone());
                state.set_reward(reward);

                let finished = self.game.is_episode_finished() || self.config.max_steps <= step_counter;
                if finished {
                    state.set_state_type(StateType::End);
                }
                self.agent.store_transition(&state)?;

                // frame skip
                let next_observation = if self.config.action_frequency > 0 {
                    self.game.process_ticks(self.config.action_frequency)?;
                    self.game.current_observation()?
                } else {
                    next_observation
                };
                state = EpisodeState::new(state_id, next_observation, StateType::Active);

                if let Some(pause) = self.config.sleep_duration() {
                    thread::sleep(pause);
                }
                if self.config.training_enabled {
                    strategy.train_step(episode, global_step)?;
                }
                step_counter += 1;
                global_step += 1;

                if finished {
                    break;
                }
            }

            let score = self.game.total_score();
            self.metrics.update_metric(Metric::ExplorationRate, self.agent.exploration_rate())?;
            self.metrics.update_metric(Metric::TotalScore, score)?;
            self.metrics.flush_metrics(state_id)?;
            warn!("episode {state_id} finished after {step_counter} steps with a total score of {score}");
            scores.push(score);
        }
        Ok((scores, global_step))
    }

    fn terminate(
        &mut self,
        strategy: &mut dyn TrainStrategy,
    ) -> Result<()> {
        strategy.stop()?;
        self.metrics.stop_profiler()?;
        self.agent.persist_model()
    }
}
