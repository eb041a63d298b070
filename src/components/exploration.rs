use {
    crate::error::ConfigError,
    serde::{
        Deserialize,
        Serialize,
    },
};

/// A three phase exploration rate (epsilon) schedule over episodes.
///
/// 1. Constant: `initial_epsilon` for the first `constant_fraction` of the
///    episodes.
/// 2. Decay: decreasing until `decaying_fraction` of the episodes.
/// 3. Release: `final_epsilon` for the rest of the run.
///
/// The decay phase computes
/// `initial - (episode - C) / ((D - C) * (initial - final))`
/// with `C = constant_fraction * max_episodes` and
/// `D = decaying_fraction * max_episodes`. Note that the epsilon delta sits in
/// the denominator, so this is not a plain linear interpolation and it can
/// undershoot `final_epsilon` right before the release phase.
///
/// # Example
/// ```
/// use episodic_rl::components::ExplorationSchedule;
///
/// let schedule = ExplorationSchedule::new(1.0, 0.01, 0.1, 0.6, 100).unwrap();
/// assert_eq!(schedule.epsilon(5), 1.0);
/// assert!(schedule.epsilon(30) < 1.0);
/// assert_eq!(schedule.epsilon(99), 0.01);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExplorationSchedule {
    initial_epsilon: f64,
    final_epsilon: f64,
    constant_fraction: f64,
    decaying_fraction: f64,
    max_episodes: usize,
}
impl ExplorationSchedule {
    pub fn new(
        initial_epsilon: f64,
        final_epsilon: f64,
        constant_fraction: f64,
        decaying_fraction: f64,
        max_episodes: usize,
    ) -> Result<Self, ConfigError> {
        let schedule = Self {
            initial_epsilon,
            final_epsilon,
            constant_fraction,
            decaying_fraction,
            max_episodes,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("initial_epsilon", self.initial_epsilon),
            ("final_epsilon", self.final_epsilon),
            ("constant_fraction", self.constant_fraction),
            ("decaying_fraction", self.decaying_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::new(field, format!("{value} is not within [0, 1]")));
            }
        }
        if self.constant_fraction > self.decaying_fraction {
            return Err(ConfigError::new(
                "constant_fraction",
                "the constant phase cannot end after the decay phase",
            ));
        }
        let decay_episodes = self.decaying_episodes() - self.constant_episodes();
        if decay_episodes > 0.0 && self.initial_epsilon == self.final_epsilon {
            return Err(ConfigError::new(
                "final_epsilon",
                "a decay phase needs distinct initial and final epsilons",
            ));
        }
        Ok(())
    }

    pub fn initial_epsilon(&self) -> f64 {
        self.initial_epsilon
    }

    pub fn final_epsilon(&self) -> f64 {
        self.final_epsilon
    }

    pub fn max_episodes(&self) -> usize {
        self.max_episodes
    }

    fn constant_episodes(&self) -> f64 {
        self.constant_fraction * self.max_episodes as f64
    }

    fn decaying_episodes(&self) -> f64 {
        self.decaying_fraction * self.max_episodes as f64
    }

    /// The exploration rate for `current_episode`.
    pub fn epsilon(
        &self,
        current_episode: usize,
    ) -> f64 {
        let episode = current_episode as f64;
        let constant = self.constant_episodes();
        let decaying = self.decaying_episodes();

        if episode < constant {
            self.initial_epsilon
        } else if episode < decaying {
            let delimiter = (decaying - constant) * (self.initial_epsilon - self.final_epsilon);
            self.initial_epsilon - (episode - constant) / delimiter
        } else {
            self.final_epsilon
        }
    }
}

impl Default for ExplorationSchedule {
    fn default() -> Self {
        Self {
            initial_epsilon: 1.0,
            final_epsilon: 0.01,
            constant_fraction: 0.1,
            decaying_fraction: 0.6,
            max_episodes: 1,
        }
    }
}
