mod network;
mod q_agent;

pub use network::{
    Network,
    RandomNetwork,
};
pub use q_agent::QAgent;


use {
    crate::{
        components::{
            TensorSpec,
            TransitionId,
        },
        engines::EpisodeState,
        envs::Action,
    },
    anyhow::Result,
    std::fmt::Display,
};


/// The loss of a single training iteration.
pub type TrainLoss = f64;

/// How a network spreads its computation over devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistributionStrategy {
    #[default]
    SingleDevice,
    Mirrored { replicas: usize },
}

impl Display for DistributionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistributionStrategy::SingleDevice => write!(f, "SingleDevice"),
            DistributionStrategy::Mirrored { replicas } => write!(f, "Mirrored({replicas})"),
        }
    }
}

/// A learning agent.
///
/// An agent is shared between the driver thread and (in async mode) the
/// training worker, so every method takes `&self` and implementations keep
/// their mutable state behind locks or atomics.
pub trait Agent: Send + Sync {
    fn is_initialized(&self) -> bool;

    /// Build the action space, the replay memory and the networks.
    fn init(
        &self,
        observation_space: &[TensorSpec],
        action_space: &TensorSpec,
    ) -> Result<()>;

    /// Called once per driver step with the current episode and global step.
    fn tick(
        &self,
        episode: usize,
        step: usize,
    );

    fn take_action(
        &self,
        state: &EpisodeState,
    ) -> Result<Action>;

    fn train(&self) -> Result<TrainLoss>;

    /// Store the transition described by `state` and return its id.
    fn store_transition(
        &self,
        state: &EpisodeState,
    ) -> Result<TransitionId>;

    fn exploration_rate(&self) -> f64;
    fn distribution_strategy(&self) -> DistributionStrategy;
    fn persist_model(&self) -> Result<()>;
}
