use {
    super::{
        Agent,
        DistributionStrategy,
        Network,
        TrainLoss,
    },
    crate::{
        components::{
            ExplorationSchedule,
            FrameStack,
            MemoryReader,
            ReplayBuffer,
            SharedReplayBuffer,
            TensorSpec,
            TransitionId,
            A_BUFFER_NAME,
            R_BUFFER_NAME,
            S1_BUFFER_NAME,
            S2_BUFFER_NAME,
            T_BUFFER_NAME,
        },
        configs::AgentConfig,
        engines::EpisodeState,
        envs::{
            build_action_space,
            Action,
            Observation,
        },
    },
    anyhow::{
        anyhow,
        Result,
    },
    candle_core::{
        DType,
        Device,
        Tensor,
    },
    parking_lot::Mutex,
    rand::{
        rngs::StdRng,
        Rng,
        SeedableRng,
    },
    std::sync::{
        atomic::{
            AtomicUsize,
            Ordering,
        },
        OnceLock,
    },
    tracing::{
        debug,
        info,
    },
};

type NetworkBuilder<N> = Box<dyn Fn() -> N + Send + Sync>;

/// Everything the agent builds from the game's descriptors in `init`.
struct Runtime<N> {
    observation_space: Vec<TensorSpec>,
    action_space: Vec<Action>,
    memory: SharedReplayBuffer,
    network: Mutex<N>,
    target_network: Option<Mutex<N>>,
    frames: Option<Mutex<FrameStack>>,
}

/// A deep Q-learning agent over a discrete action space.
///
/// The agent acts epsilon-greedy on the predictions of its network, with the
/// exploration rate given by an [`ExplorationSchedule`]. Transitions go into a
/// [`ReplayBuffer`] the network samples its training batches from.
///
/// With a positive `network_synchronization_frequency` the agent keeps a
/// second, target network, which gets the weights of the online network
/// every that many steps (double Q-learning). Image observations (`[h, w, c]`)
/// can be stacked over the last few frames.
///
/// During the first `max_observe_episodes` episodes the agent only collects
/// experience, training reports a loss of zero.
pub struct QAgent<N: Network> {
    config: AgentConfig,
    schedule: ExplorationSchedule,
    build_network: NetworkBuilder<N>,
    runtime: OnceLock<Runtime<N>>,
    current_episode: AtomicUsize,
    current_step: AtomicUsize,
    epsilon: Mutex<f64>,
    rng: Mutex<StdRng>,
}

impl<N: Network> QAgent<N> {
    pub fn new(
        config: AgentConfig,
        max_episodes: usize,
        build_network: impl Fn() -> N + Send + Sync + 'static,
    ) -> Result<Self> {
        config.validate()?;
        let schedule = config.exploration_schedule(max_episodes)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            epsilon: Mutex::new(schedule.initial_epsilon()),
            config,
            schedule,
            build_network: Box::new(build_network),
            runtime: OnceLock::new(),
            current_episode: AtomicUsize::new(0),
            current_step: AtomicUsize::new(0),
            rng: Mutex::new(rng),
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn schedule(&self) -> &ExplorationSchedule {
        &self.schedule
    }

    /// The replay memory, once the agent is initialized.
    pub fn memory(&self) -> Option<SharedReplayBuffer> {
        self.runtime.get().map(|runtime| runtime.memory.clone())
    }

    pub fn action_space(&self) -> Option<&[Action]> {
        self.runtime.get().map(|runtime| runtime.action_space.as_slice())
    }

    pub fn has_target_network(&self) -> bool {
        self.runtime
            .get()
            .is_some_and(|runtime| runtime.target_network.is_some())
    }

    fn runtime(&self) -> Result<&Runtime<N>> {
        self.runtime
            .get()
            .ok_or_else(|| anyhow!("Agent is not initialized."))
    }

    /// Pick the input buffer out of `observation` as a float tensor, screens
    /// are rescaled and converted as configured.
    fn preprocess(
        &self,
        observation: &Observation,
    ) -> Result<Tensor> {
        let name = &self.config.input_observation_name;
        let tensor = observation
            .get(name)
            .ok_or_else(|| anyhow!("observation has no `{name}` buffer"))?;
        Ok(self.config.screen_transform().apply(tensor)?)
    }

    fn build_network(
        &self,
        memory: &SharedReplayBuffer,
        input_spec: &TensorSpec,
        output_spec: &TensorSpec,
    ) -> Result<N> {
        let mut network = (self.build_network)();
        network.init(MemoryReader::new(memory.clone()), input_spec, output_spec)?;
        Ok(network)
    }

    fn greedy_action(
        &self,
        runtime: &Runtime<N>,
        input: &Tensor,
    ) -> Result<usize> {
        let q_values = runtime.network.lock().predict(&input.unsqueeze(0)?)?;
        let index = q_values.flatten_all()?.argmax(0)?.to_scalar::<u32>()? as usize;
        if index >= runtime.action_space.len() {
            Err(anyhow!(
                "network picked action {index} out of {}",
                runtime.action_space.len(),
            ))?
        }
        Ok(index)
    }

    fn synchronize_networks(
        &self,
        runtime: &Runtime<N>,
    ) -> Result<()> {
        if let Some(target) = &runtime.target_network {
            let weights = runtime.network.lock().weights()?;
            target.lock().set_weights(&weights)?;
            debug!("synchronized the target network");
        }
        Ok(())
    }
}

impl<N: Network> Agent for QAgent<N> {
    fn is_initialized(&self) -> bool {
        self.runtime.get().is_some()
    }

    fn init(
        &self,
        observation_space: &[TensorSpec],
        action_space: &TensorSpec,
    ) -> Result<()> {
        if self.is_initialized() {
            Err(anyhow!("Agent is already initialized."))?
        }

        let name = &self.config.input_observation_name;
        let input_spec = observation_space
            .iter()
            .find(|spec| spec.name() == name.as_str())
            .ok_or_else(|| anyhow!("observation space has no `{name}` buffer"))?;
        let actions = build_action_space(action_space, self.config.one_hot_encoded_action_space)?;

        let is_screen = input_spec.shape().len() == 3;
        let screen = self.config.screen_transform();
        if !is_screen && !screen.is_identity() {
            info!("screen preprocessing skipped for the non image input {input_spec}");
        }
        let frame_shape = screen.output_shape(input_spec.shape());

        let frames = if self.config.frame_stacking_enabled && is_screen {
            Some(FrameStack::new(
                self.config.number_of_stacked_frames,
                &frame_shape,
                &Device::Cpu,
            )?)
        } else {
            if self.config.frame_stacking_enabled {
                info!("frame stacking skipped for the non image input {input_spec}");
            }
            None
        };
        let state_shape = match &frames {
            Some(frames) => frames.output_shape(),
            None => frame_shape,
        };

        let capacity = self.config.memory_max_size;
        let mut memory_shape = vec![capacity];
        memory_shape.extend_from_slice(&state_shape);
        let memory = ReplayBuffer::new(&[
            TensorSpec::new(S1_BUFFER_NAME, DType::F32, &memory_shape),
            TensorSpec::new(A_BUFFER_NAME, action_space.dtype(), &[capacity]),
            TensorSpec::new(S2_BUFFER_NAME, DType::F32, &memory_shape),
            TensorSpec::new(R_BUFFER_NAME, DType::F64, &[capacity]),
            TensorSpec::new(T_BUFFER_NAME, DType::U8, &[capacity]),
        ])?
        .into_shared();

        let network_input = TensorSpec::new("network_input", DType::F32, &state_shape);
        let network_output = TensorSpec::new("q_values", DType::F32, &[actions.len()]);
        let network = self.build_network(&memory, &network_input, &network_output)?;
        let target_network = match self.config.network_synchronization_frequency {
            0 => None,
            _ => Some(Mutex::new(self.build_network(&memory, &network_input, &network_output)?)),
        };

        info!(
            "agent initialized with {} actions, input {network_input}, memory of {capacity}, target network: {}",
            actions.len(),
            target_network.is_some(),
        );

        self.runtime
            .set(Runtime {
                observation_space: observation_space.to_vec(),
                action_space: actions,
                memory,
                network: Mutex::new(network),
                target_network,
                frames: frames.map(Mutex::new),
            })
            .map_err(|_| anyhow!("Agent is already initialized."))
    }

    fn tick(
        &self,
        episode: usize,
        step: usize,
    ) {
        self.current_episode.store(episode, Ordering::Release);
        self.current_step.store(step, Ordering::Release);
    }

    fn take_action(
        &self,
        state: &EpisodeState,
    ) -> Result<Action> {
        let runtime = self.runtime()?;
        state.observation().check_structure(&runtime.observation_space)?;

        let frame = self.preprocess(state.observation())?;
        let input = match &runtime.frames {
            Some(frames) => frames.lock().push(frame)?,
            None => frame,
        };

        let epsilon = self.schedule.epsilon(state.state_id());
        *self.epsilon.lock() = epsilon;

        let explore = {
            let mut rng = self.rng.lock();
            rng.gen::<f64>() < epsilon
        };
        let index = if explore {
            self.rng.lock().gen_range(0..runtime.action_space.len())
        } else {
            self.greedy_action(runtime, &input)?
        };
        Ok(runtime.action_space[index].clone())
    }

    fn train(&self) -> Result<TrainLoss> {
        let episode = self.current_episode.load(Ordering::Acquire);
        if episode <= self.config.max_observe_episodes {
            return Ok(0.0);
        }
        let step = self.current_step.load(Ordering::Acquire);
        let runtime = self.runtime()?;

        match &runtime.target_network {
            Some(target) => {
                if step % self.config.network_synchronization_frequency == 0 {
                    self.synchronize_networks(runtime)?;
                }
                let target = target.lock();
                runtime.network.lock().train_batch(episode, step, Some(&*target))
            }
            None => runtime.network.lock().train_batch(episode, step, None),
        }
    }

    fn store_transition(
        &self,
        state: &EpisodeState,
    ) -> Result<TransitionId> {
        let runtime = self.runtime()?;
        let action = state
            .transition()
            .ok_or_else(|| anyhow!("state {} has no transition", state.state_id()))?;
        let next_observation = state
            .transitioned_observation()
            .ok_or_else(|| anyhow!("state {} has no transitioned observation", state.state_id()))?;
        let action_index = runtime
            .action_space
            .iter()
            .position(|candidate| candidate == action)
            .ok_or_else(|| anyhow!("{action} is not in the action space"))?;

        let next_frame = self.preprocess(next_observation)?;
        let (s1, s2) = match &runtime.frames {
            // the window already ends with the frame of `state`
            Some(frames) => {
                let frames = frames.lock();
                (frames.stacked()?, frames.peek_with(&next_frame)?)
            }
            None => (self.preprocess(state.observation())?, next_frame),
        };

        let id = runtime.memory.write().add(
            &s1,
            action_index,
            &s2,
            state.reward(),
            state.is_end_state(),
        )?;
        Ok(id)
    }

    fn exploration_rate(&self) -> f64 {
        *self.epsilon.lock()
    }

    fn distribution_strategy(&self) -> DistributionStrategy {
        match self.runtime.get() {
            Some(runtime) => runtime.network.lock().distribution_strategy(),
            None => DistributionStrategy::default(),
        }
    }

    fn persist_model(&self) -> Result<()> {
        match self.runtime.get() {
            Some(runtime) => runtime.network.lock().persist_model(),
            None => Ok(()),
        }
    }
}
