use {
    crate::{
        components::{
            ExplorationSchedule,
            ScreenTransform,
        },
        error::ConfigError,
    },
    serde::{
        Deserialize,
        Serialize,
    },
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    // Exploration schedule: epsilon at the start and at the end of the run.
    pub initial_exploration_rate: f64,
    pub final_exploration_rate: f64,
    // Fractions of the run that end the constant and the decaying phase.
    pub constant_exploration_fraction: f64,
    pub decaying_exploration_fraction: f64,
    // The capacity of the replay buffer used for sampling training data.
    pub memory_max_size: usize,
    // The training batch size for each training iteration.
    pub train_batch_size: usize,
    // The observation buffer the agent learns from.
    pub input_observation_name: String,
    // Steps between two target network synchronizations, 0 for no target network.
    pub network_synchronization_frequency: usize,
    // Rescale screen inputs to [height, width], None keeps the game's size.
    pub screen_size: Option<[usize; 2]>,
    // Reduce screen inputs to a single channel.
    pub convert_to_monochrome: bool,
    // Stack the last few frames into one network input.
    pub frame_stacking_enabled: bool,
    pub number_of_stacked_frames: usize,
    // Episodes to only collect experience before training starts.
    pub max_observe_episodes: usize,
    // Treat the action space as independent buttons.
    pub one_hot_encoded_action_space: bool,
    pub seed: Option<u64>,
}
impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            initial_exploration_rate: 1.0,
            final_exploration_rate: 0.01,
            constant_exploration_fraction: 0.1,
            decaying_exploration_fraction: 0.6,
            memory_max_size: 200,
            train_batch_size: 32,
            input_observation_name: "screen_buffer".to_string(),
            network_synchronization_frequency: 100,
            screen_size: None,
            convert_to_monochrome: false,
            frame_stacking_enabled: true,
            number_of_stacked_frames: 4,
            max_observe_episodes: 10,
            one_hot_encoded_action_space: false,
            seed: None,
        }
    }
}
impl AgentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory_max_size == 0 {
            return Err(ConfigError::new("memory_max_size", "must be positive"));
        }
        if self.train_batch_size == 0 || self.train_batch_size > self.memory_max_size {
            return Err(ConfigError::new(
                "train_batch_size",
                format!("must be within [1, {}]", self.memory_max_size),
            ));
        }
        if self.frame_stacking_enabled && self.number_of_stacked_frames == 0 {
            return Err(ConfigError::new("number_of_stacked_frames", "must be positive"));
        }
        if self
            .screen_size
            .is_some_and(|size| size.contains(&0))
        {
            return Err(ConfigError::new("screen_size", "must be positive"));
        }
        if self.input_observation_name.is_empty() {
            return Err(ConfigError::new("input_observation_name", "must not be empty"));
        }
        Ok(())
    }

    /// The preprocessing of screen (`[h, w, c]`) inputs.
    pub fn screen_transform(&self) -> ScreenTransform {
        ScreenTransform {
            size: self.screen_size,
            monochrome: self.convert_to_monochrome,
        }
    }

    /// The exploration schedule over a run of `max_episodes`.
    pub fn exploration_schedule(
        &self,
        max_episodes: usize,
    ) -> Result<ExplorationSchedule, ConfigError> {
        ExplorationSchedule::new(
            self.initial_exploration_rate,
            self.final_exploration_rate,
            self.constant_exploration_fraction,
            self.decaying_exploration_fraction,
            max_episodes,
        )
    }
}
