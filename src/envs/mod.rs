//! # Environments
//!
//! The [`Game`] trait is the contract between the
//! [`EpisodeDriver`](crate::engines::EpisodeDriver) and an environment. Games
//! are assumed to be episodic, with a reward for every action taken.
//!
//! The [`DummyGame`] produces random observations and rewards and ends its
//! episodes at random. It is meant for smoke testing the harness.

mod action;
mod dummy;
mod observation;

use {
    crate::components::TensorSpec,
    anyhow::Result,
};

pub use crate::envs::{
    action::{
        build_action_space,
        Action,
    },
    dummy::{
        DummyGame,
        DummyGameConfig,
    },
    observation::Observation,
};

pub trait Game {
    fn is_initialized(&self) -> bool;
    fn init(&mut self) -> Result<()>;

    /// Start a new episode and return its first observation.
    fn reset(&mut self) -> Result<Observation>;

    /// Apply `action` and return the next observation with its reward.
    fn make_action(
        &mut self,
        action: &Action,
    ) -> Result<(Observation, f64)>;

    fn is_episode_finished(&self) -> bool;

    /// Advance the game by `ticks` while holding the last action.
    fn process_ticks(
        &mut self,
        ticks: usize,
    ) -> Result<()>;

    fn current_observation(&self) -> Result<Observation>;

    /// The accumulated score of the current episode.
    fn total_score(&self) -> f64;

    fn observation_space(&self) -> Result<Vec<TensorSpec>>;
    fn action_space(&self) -> Result<TensorSpec>;
}

impl<G: Game + ?Sized> Game for Box<G> {
    fn is_initialized(&self) -> bool {
        (**self).is_initialized()
    }
    fn init(&mut self) -> Result<()> {
        (**self).init()
    }
    fn reset(&mut self) -> Result<Observation> {
        (**self).reset()
    }
    fn make_action(
        &mut self,
        action: &Action,
    ) -> Result<(Observation, f64)> {
        (**self).make_action(action)
    }
    fn is_episode_finished(&self) -> bool {
        (**self).is_episode_finished()
    }
    fn process_ticks(
        &mut self,
        ticks: usize,
    ) -> Result<()> {
        (**self).process_ticks(ticks)
    }
    fn current_observation(&self) -> Result<Observation> {
        (**self).current_observation()
    }
    fn total_score(&self) -> f64 {
        (**self).total_score()
    }
    fn observation_space(&self) -> Result<Vec<TensorSpec>> {
        (**self).observation_space()
    }
    fn action_space(&self) -> Result<TensorSpec> {
        (**self).action_space()
    }
}
