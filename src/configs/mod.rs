mod agent;
mod driver;
mod metrics;

pub use agent::AgentConfig;
pub use driver::{
    DriverConfig,
    TrainMode,
};
pub use metrics::MetricsConfig;

use {
    crate::envs::DummyGameConfig,
    anyhow::Result,
    serde::{
        Deserialize,
        Serialize,
    },
};


/// Everything needed to set up a run, as read from a RON file.
///
/// Missing fields take their default values.
///
/// # Example
/// ```
/// use episodic_rl::configs::{AppConfig, TrainMode};
///
/// let config: AppConfig = ron::from_str("(game: \"dummy\", driver: (max_episodes: 3, train_mode: Async))").unwrap();
/// assert_eq!(config.driver.max_episodes, 3);
/// assert_eq!(config.driver.train_mode, TrainMode::Async);
/// assert_eq!(config.agent, "double_q");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    // Prefix of the files written by a run.
    pub run_tag: String,
    // Registry names of the game and the agent.
    pub game: String,
    pub agent: String,
    pub driver: DriverConfig,
    pub agent_config: AgentConfig,
    pub dummy_game: DummyGameConfig,
    pub metrics: MetricsConfig,
}
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            run_tag: "run".to_string(),
            game: "dummy".to_string(),
            agent: "double_q".to_string(),
            driver: DriverConfig::default(),
            agent_config: AgentConfig::default(),
            dummy_game: DummyGameConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}
impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        self.driver.validate()?;
        self.agent_config.validate()?;
        self.agent_config.exploration_schedule(self.driver.max_episodes)?;
        self.dummy_game.validate()?;
        Ok(())
    }
}
