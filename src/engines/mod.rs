//! # Engines
//!
//! The [`EpisodeDriver`] runs the episodic interaction between a
//! [`Game`](crate::envs::Game), an [`Agent`](crate::agents::Agent) and a
//! [`MetricTracer`](crate::metrics::MetricTracer).
//!
//! Training either happens inline on the driver thread ([`SyncTrainStep`]) or
//! on a single background [`TrainingWorker`] ([`AsyncTrainStep`]). In the
//! latter case the replay memory is the only mutable state the two threads
//! share, see [`SharedReplayBuffer`](crate::components::SharedReplayBuffer).

mod driver;
mod state;
mod train_step;

pub use driver::{
    DriverPhase,
    EpisodeDriver,
    RunSummary,
};
pub use state::{
    EpisodeState,
    StateType,
    DEFAULT_DISCOUNT,
    DEFAULT_REWARD,
};
pub use train_step::{
    AsyncTrainStep,
    SyncTrainStep,
    TrainStats,
    TrainStrategy,
    TrainingWorker,
    TRAINING_THREAD_NAME,
};
