use {
    super::{
        Action,
        Game,
        Observation,
    },
    crate::{
        components::TensorSpec,
        error::ConfigError,
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
    rand::{
        rngs::StdRng,
        Rng,
        SeedableRng,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    tracing::debug,
};

pub const SCREEN_BUFFER: &str = "screen_buffer";

/// The configuration struct for the [`DummyGame`].
///
/// # Fields
/// * `screen_height` - The height of the generated screen buffer.
/// * `screen_width` - The width of the generated screen buffer.
/// * `screen_channels` - The number of color channels of the screen buffer.
/// * `min_reward` - The lower bound of the uniformly drawn rewards.
/// * `max_reward` - The upper bound of the uniformly drawn rewards.
/// * `action_space_dimension` - The number of available actions (or buttons).
/// * `finish_probability` - The chance that any step ends the episode.
/// * `seed` - The seed for the random number generator, random when absent.
///
/// # Example
/// ```
/// use episodic_rl::envs::DummyGameConfig;
///
/// let config = DummyGameConfig::default();
/// assert_eq!(config.screen_height, 84);
/// assert_eq!(config.action_space_dimension, 4);
/// assert_eq!(config.finish_probability, 0.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DummyGameConfig {
    pub screen_height: usize,
    pub screen_width: usize,
    pub screen_channels: usize,
    pub min_reward: f64,
    pub max_reward: f64,
    pub action_space_dimension: usize,
    pub finish_probability: f64,
    pub seed: Option<u64>,
}
impl Default for DummyGameConfig {
    fn default() -> Self {
        Self {
            screen_height: 84,
            screen_width: 84,
            screen_channels: 1,
            min_reward: 0.0,
            max_reward: 100.0,
            action_space_dimension: 4,
            finish_probability: 0.5,
            seed: None,
        }
    }
}
impl DummyGameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.screen_height == 0 || self.screen_width == 0 || self.screen_channels == 0 {
            return Err(ConfigError::new("screen_height", "screen dimensions must be positive"));
        }
        if self.min_reward > self.max_reward {
            return Err(ConfigError::new("min_reward", "must not exceed max_reward"));
        }
        if self.action_space_dimension == 0 {
            return Err(ConfigError::new("action_space_dimension", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.finish_probability) {
            return Err(ConfigError::new("finish_probability", "must be within [0, 1]"));
        }
        Ok(())
    }

    fn screen_shape(&self) -> [usize; 3] {
        [self.screen_height, self.screen_width, self.screen_channels]
    }
}

/// A game of pure noise, mainly for testing.
pub struct DummyGame {
    config: DummyGameConfig,
    rng: StdRng,
    initialized: bool,
    done: bool,
    total_reward: f64,
    current_observation: Option<Observation>,
}
impl DummyGame {
    pub fn new(config: DummyGameConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            config,
            rng,
            initialized: false,
            done: false,
            total_reward: 0.0,
            current_observation: None,
        })
    }

    pub fn config(&self) -> &DummyGameConfig {
        &self.config
    }

    fn init_check(&self) -> Result<()> {
        if !self.initialized {
            Err(anyhow!("Game is not initialized."))?
        }
        Ok(())
    }

    fn random_screen(&mut self) -> Result<Observation> {
        let shape = self.config.screen_shape();
        let data: Vec<f32> = (0..shape.iter().product::<usize>())
            .map(|_| self.rng.gen::<f32>())
            .collect();
        Ok(Observation::single(
            SCREEN_BUFFER,
            Tensor::from_vec(data, &shape[..], &Device::Cpu)?,
        ))
    }
}

impl Game for DummyGame {
    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn init(&mut self) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn reset(&mut self) -> Result<Observation> {
        self.init_check()?;
        self.total_reward = 0.0;
        self.done = false;
        let observation = self.random_screen()?;
        self.current_observation = Some(observation.clone());
        Ok(observation)
    }

    fn make_action(
        &mut self,
        action: &Action,
    ) -> Result<(Observation, f64)> {
        self.init_check()?;
        let observation = self.random_screen()?;
        let reward = self.rng.gen_range(self.config.min_reward..=self.config.max_reward);
        self.done = self.rng.gen_bool(self.config.finish_probability);
        self.total_reward += reward;
        self.current_observation = Some(observation.clone());
        debug!("Dummy game took {action} for a reward of {reward}");
        Ok((observation, reward))
    }

    fn is_episode_finished(&self) -> bool {
        self.done
    }

    fn process_ticks(
        &mut self,
        _ticks: usize,
    ) -> Result<()> {
        self.init_check()
    }

    fn current_observation(&self) -> Result<Observation> {
        self.current_observation
            .clone()
            .ok_or_else(|| anyhow!("no observation before the first reset"))
    }

    fn total_score(&self) -> f64 {
        self.total_reward
    }

    fn observation_space(&self) -> Result<Vec<TensorSpec>> {
        self.init_check()?;
        Ok(vec![TensorSpec::new(
            SCREEN_BUFFER,
            DType::F32,
            &self.config.screen_shape(),
        )])
    }

    fn action_space(&self) -> Result<TensorSpec> {
        self.init_check()?;
        Ok(TensorSpec::new(
            "action_space",
            DType::U32,
            &[self.config.action_space_dimension],
        ))
    }
}
