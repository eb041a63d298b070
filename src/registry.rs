use {
    crate::{
        agents::{
            Agent,
            QAgent,
            RandomNetwork,
        },
        configs::{
            AgentConfig,
            AppConfig,
        },
        engines::EpisodeDriver,
        envs::{
            DummyGame,
            Game,
        },
        error::ConfigError,
        metrics::LogTracer,
    },
    anyhow::{
        anyhow,
        Result,
    },
    std::{
        collections::BTreeMap,
        sync::Arc,
    },
    tracing::info,
};

pub type GameBuilder = fn(&AppConfig) -> Result<Box<dyn Game>>;
pub type AgentBuilder = fn(&AppConfig) -> Result<Arc<dyn Agent>>;

/// The driver a [`Registry`] builds from an [`AppConfig`].
pub type AppDriver = EpisodeDriver<Box<dyn Game>, dyn Agent, LogTracer>;

/// Maps the game and agent names of a config to their constructors.
///
/// # Example
/// ```
/// use episodic_rl::registry::Registry;
///
/// let registry = Registry::default();
/// assert!(registry.game_names().any(|name| name == "dummy"));
/// assert!(registry.agent_names().any(|name| name == "double_q"));
/// ```
pub struct Registry {
    games: BTreeMap<String, GameBuilder>,
    agents: BTreeMap<String, AgentBuilder>,
}
impl Registry {
    pub fn empty() -> Self {
        Self {
            games: BTreeMap::new(),
            agents: BTreeMap::new(),
        }
    }

    pub fn register_game(
        &mut self,
        name: &str,
        builder: GameBuilder,
    ) -> &mut Self {
        self.games.insert(name.to_string(), builder);
        self
    }

    pub fn register_agent(
        &mut self,
        name: &str,
        builder: AgentBuilder,
    ) -> &mut Self {
        self.agents.insert(name.to_string(), builder);
        self
    }

    pub fn game_names(&self) -> impl Iterator<Item = &str> {
        self.games.keys().map(String::as_str)
    }

    pub fn agent_names(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }

    pub fn build_game(
        &self,
        config: &AppConfig,
    ) -> Result<Box<dyn Game>> {
        let builder = self.games.get(&config.game).ok_or_else(|| {
            anyhow!(
                "unknown game `{}`, known games: {:?}",
                config.game,
                self.game_names().collect::<Vec<_>>(),
            )
        })?;
        builder(config)
    }

    pub fn build_agent(
        &self,
        config: &AppConfig,
    ) -> Result<Arc<dyn Agent>> {
        let builder = self.agents.get(&config.agent).ok_or_else(|| {
            anyhow!(
                "unknown agent `{}`, known agents: {:?}",
                config.agent,
                self.agent_names().collect::<Vec<_>>(),
            )
        })?;
        builder(config)
    }

    /// Validate `config` and wire up a driver with its game, agent and a
    /// [`LogTracer`].
    pub fn build_driver(
        &self,
        config: &AppConfig,
    ) -> Result<AppDriver> {
        config.validate()?;
        let game = self.build_game(config)?;
        let agent = self.build_agent(config)?;
        let metrics = Arc::new(LogTracer::new(config.metrics.clone()));
        info!("built game `{}` and agent `{}`", config.game, config.agent);
        EpisodeDriver::new(game, agent, metrics, config.driver.clone())
    }
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register_game("dummy", build_dummy_game)
            .register_agent("random", build_random_agent)
            .register_agent("q", build_q_agent)
            .register_agent("double_q", build_double_q_agent);
        registry
    }
}

fn build_dummy_game(config: &AppConfig) -> Result<Box<dyn Game>> {
    Ok(Box::new(DummyGame::new(config.dummy_game.clone())?))
}

fn q_agent(
    agent_config: AgentConfig,
    max_episodes: usize,
) -> Result<Arc<dyn Agent>> {
    let batch_size = agent_config.train_batch_size;
    let seed = agent_config.seed;
    Ok(Arc::new(QAgent::new(agent_config, max_episodes, move || {
        RandomNetwork::new(batch_size, seed)
    })?))
}

/// Always picks a random action. The network is still trained on the
/// collected experience.
fn build_random_agent(config: &AppConfig) -> Result<Arc<dyn Agent>> {
    let agent_config = AgentConfig {
        initial_exploration_rate: 1.0,
        final_exploration_rate: 1.0,
        constant_exploration_fraction: 1.0,
        decaying_exploration_fraction: 1.0,
        network_synchronization_frequency: 0,
        ..config.agent_config.clone()
    };
    q_agent(agent_config, config.driver.max_episodes)
}

fn build_q_agent(config: &AppConfig) -> Result<Arc<dyn Agent>> {
    let agent_config = AgentConfig {
        network_synchronization_frequency: 0,
        ..config.agent_config.clone()
    };
    q_agent(agent_config, config.driver.max_episodes)
}

fn build_double_q_agent(config: &AppConfig) -> Result<Arc<dyn Agent>> {
    if config.agent_config.network_synchronization_frequency == 0 {
        Err(ConfigError::new(
            "network_synchronization_frequency",
            "a double Q agent needs a positive synchronization frequency",
        ))?
    }
    q_agent(config.agent_config.clone(), config.driver.max_episodes)
}
