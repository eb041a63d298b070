use {
    crate::error::ConfigError,
    clap::ValueEnum,
    serde::{
        Deserialize,
        Serialize,
    },
    std::time::Duration,
    strum::{
        Display,
        EnumIter,
    },
};

/// How train steps are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumIter, ValueEnum)]
pub enum TrainMode {
    /// Train inline on the driver thread, once per step.
    #[default]
    Sync,
    /// Train continuously on a background worker thread.
    Async,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    // The total number of episodes.
    pub max_episodes: usize,
    // The maximum number of steps before an episode is cut off.
    pub max_steps: usize,
    // Seconds to pause after every step, zero or less disables the pause.
    pub sleep_time: f64,
    // Ticks the game advances with the last action held (frame skip), 0 disables.
    pub action_frequency: usize,
    // Whether the agent is trained at all.
    pub training_enabled: bool,
    pub train_mode: TrainMode,
    // Seconds to wait for the training worker to stop before giving up.
    pub worker_join_timeout: f64,
}
impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_episodes: 1,
            max_steps: 100,
            sleep_time: 0.0,
            action_frequency: 2,
            training_enabled: true,
            train_mode: TrainMode::Sync,
            worker_join_timeout: 30.0,
        }
    }
}
impl DriverConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sleep_time.is_finite() {
            return Err(ConfigError::new("sleep_time", "must be a finite number of seconds"));
        }
        if self.sleep_time > 0.0 && Duration::try_from_secs_f64(self.sleep_time).is_err() {
            return Err(ConfigError::new("sleep_time", "is too large for a duration"));
        }
        if !(self.worker_join_timeout.is_finite() && self.worker_join_timeout > 0.0) {
            return Err(ConfigError::new(
                "worker_join_timeout",
                "must be a positive number of seconds",
            ));
        }
        if Duration::try_from_secs_f64(self.worker_join_timeout).is_err() {
            return Err(ConfigError::new("worker_join_timeout", "is too large for a duration"));
        }
        Ok(())
    }

    /// The pause between steps, if any.
    pub fn sleep_duration(&self) -> Option<Duration> {
        if self.sleep_time > 0.0 {
            Duration::try_from_secs_f64(self.sleep_time).ok()
        } else {
            None
        }
    }

    /// Saturates for values [`DriverConfig::validate`] rejects.
    pub fn join_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.worker_join_timeout).unwrap_or(Duration::MAX)
    }
}
